//! Plugin contract between the gateway host and its middleware plugins.
//!
//! A plugin contributes one middleware to the host's request pipeline. The
//! host holds plugins as trait objects, orders them by
//! [`RouterPlugin::priority`], and asks each one to wrap the downstream
//! handler via [`RouterPlugin::process`] on every request, so configuration
//! swaps inside a plugin take effect immediately.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use tower::util::BoxCloneService;
use tower::{Layer, Service, ServiceExt};

/// A boxed, cloneable, infallible HTTP handler.
///
/// This is the currency plugins trade in: `process` receives the downstream
/// handler in this form and returns the wrapped one.
pub type BoxHandler = BoxCloneService<Request<Body>, Response, Infallible>;

/// Boxes any compatible service into a [`BoxHandler`].
pub fn box_handler<S>(service: S) -> BoxHandler
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    BoxCloneService::new(service)
}

/// Error surfaced by [`RouterPlugin::update`].
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// The supplied configuration value does not match the plugin's schema.
    #[error("invalid plugin configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

/// A middleware plugin managed by the gateway host.
#[async_trait]
pub trait RouterPlugin: Send + Sync {
    /// Rebuild internal state from the currently stored configuration.
    async fn initialize(&self);

    /// Atomically replace the stored configuration and re-initialize.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidConfig`] if `config` does not
    /// deserialize into the plugin's configuration schema; the previous
    /// configuration stays in effect.
    async fn update(&self, config: serde_json::Value) -> Result<(), PluginError>;

    /// Chain position. Lower values run closer to the edge of the pipeline.
    fn priority(&self) -> i32;

    /// Wrap `next` with the plugin's currently active middleware.
    fn process(&self, next: BoxHandler) -> BoxHandler;
}

/// Tower layer mounting a plugin chain onto a router.
///
/// Plugins are sorted by ascending priority; the first plugin becomes the
/// outermost wrapper and therefore sees the request first.
#[derive(Clone)]
pub struct PluginLayer {
    plugins: Arc<[Arc<dyn RouterPlugin>]>,
}

impl PluginLayer {
    #[must_use]
    pub fn new(mut plugins: Vec<Arc<dyn RouterPlugin>>) -> Self {
        plugins.sort_by_key(|plugin| plugin.priority());
        Self {
            plugins: plugins.into(),
        }
    }
}

impl<S> Layer<S> for PluginLayer
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Service = PluginService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PluginService {
            inner,
            plugins: Arc::clone(&self.plugins),
        }
    }
}

/// Service produced by [`PluginLayer`].
#[derive(Clone)]
pub struct PluginService<S> {
    inner: S,
    plugins: Arc<[Arc<dyn RouterPlugin>]>,
}

impl<S> Service<Request<Body>> for PluginService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // Take the service that was polled ready; leave a fresh clone behind.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        let mut handler = BoxCloneService::new(inner);
        for plugin in self.plugins.iter().rev() {
            handler = plugin.process(handler);
        }
        Box::pin(handler.oneshot(req))
    }
}
