//! The plugin façade: middleware composition, state machine, hot reload.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use cas_client::{CasClient, HttpCasClient};
use parking_lot::RwLock;
use plugin_api::{BoxHandler, PluginError, RouterPlugin};
use tower::service_fn;
use tower::util::BoxCloneService;
use tracing::{error, info, warn};
use url::Url;

use crate::config::SsoConfig;
use crate::enforcer::PolicyGate;
use crate::middleware::{AuthnMiddleware, AuthzMiddleware, SubjectSelector};

/// Scheduling priority reported to the host.
pub const PRIORITY: i32 = -1;

/// Builds a CAS client from a validated base URL.
pub type CasClientFactory = Arc<dyn Fn(&Url) -> Arc<dyn CasClient> + Send + Sync>;

/// The CAS SSO plugin: authentication via CAS, authorization via casbin.
///
/// The `(config, pipeline)` pair behind the lock is the only shared state.
/// `process` takes the read path; `initialize`/`update` build the new
/// pipeline without the lock and swap both fields together, so concurrent
/// readers observe either the fully-old or the fully-new middleware.
pub struct CasSsoPlugin {
    state: RwLock<PluginState>,
    client_factory: CasClientFactory,
}

struct PluginState {
    config: SsoConfig,
    pipeline: Pipeline,
}

/// The currently active composed middleware.
#[derive(Clone)]
enum Pipeline {
    /// Configuration failed; every request gets a fixed 500.
    Failed,
    /// CAS authentication only.
    AuthOnly { authn: AuthnMiddleware },
    /// CAS authentication followed by the policy check, in that order.
    Full {
        authn: AuthnMiddleware,
        authz: AuthzMiddleware,
    },
}

impl Pipeline {
    fn apply(&self, next: BoxHandler) -> BoxHandler {
        match self {
            Self::Failed => internal_error_handler(),
            Self::AuthOnly { authn } => authn.wrap(next),
            Self::Full { authn, authz } => authn.wrap(authz.wrap(next)),
        }
    }
}

fn internal_error_handler() -> BoxHandler {
    BoxCloneService::new(service_fn(|_req: Request<Body>| async {
        Ok((StatusCode::INTERNAL_SERVER_ERROR, "plugin configuration error").into_response())
    }))
}

impl CasSsoPlugin {
    /// Builds the plugin and runs the initial state transition.
    pub async fn new(config: SsoConfig) -> Self {
        Self::with_client_factory(config, default_client_factory()).await
    }

    /// Same as [`CasSsoPlugin::new`] with a custom CAS client constructor.
    /// Used by tests and by hosts bridging other session sources.
    pub async fn with_client_factory(config: SsoConfig, client_factory: CasClientFactory) -> Self {
        let plugin = Self {
            state: RwLock::new(PluginState {
                config,
                pipeline: Pipeline::Failed,
            }),
            client_factory,
        };
        plugin.initialize().await;
        plugin
    }

    /// The configuration currently in effect.
    #[must_use]
    pub fn config(&self) -> SsoConfig {
        self.state.read().config.clone()
    }
}

fn default_client_factory() -> CasClientFactory {
    Arc::new(|url: &Url| -> Arc<dyn CasClient> { Arc::new(HttpCasClient::from_url(url.clone())) })
}

async fn build_pipeline(config: &SsoConfig, client_factory: &CasClientFactory) -> Pipeline {
    let url = match Url::parse(&config.url) {
        Ok(url) => url,
        Err(err) => {
            error!(url = %config.url, error = %err, "invalid CAS server URL, plugin disabled");
            return Pipeline::Failed;
        }
    };

    let authn = AuthnMiddleware::new(client_factory(&url));

    match config.casbin.enforcer().await {
        Ok(enforcer) => {
            info!(model = %config.casbin.model, "authorization enabled");
            let selector = SubjectSelector::from_attr(&config.casbin.subject_attr);
            let authz = AuthzMiddleware::new(Some(Arc::new(PolicyGate::new(enforcer))), selector);
            Pipeline::Full { authn, authz }
        }
        Err(err) => {
            warn!(error = %err, "authorization unavailable, running authentication-only");
            Pipeline::AuthOnly { authn }
        }
    }
}

#[async_trait]
impl RouterPlugin for CasSsoPlugin {
    async fn initialize(&self) {
        let config = self.config();
        let pipeline = build_pipeline(&config, &self.client_factory).await;
        self.state.write().pipeline = pipeline;
    }

    async fn update(&self, config: serde_json::Value) -> Result<(), PluginError> {
        let config: SsoConfig = serde_json::from_value(config)?;
        // Built outside the lock, then swapped together with the config so
        // no reader observes a mismatch.
        let pipeline = build_pipeline(&config, &self.client_factory).await;
        let mut state = self.state.write();
        state.config = config;
        state.pipeline = pipeline;
        Ok(())
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn process(&self, next: BoxHandler) -> BoxHandler {
        // The read lock is held only long enough to clone the handle.
        let pipeline = self.state.read().pipeline.clone();
        pipeline.apply(next)
    }
}
