//! CAS authentication middleware.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use cas_client::{CasClient, Handled};
use plugin_api::BoxHandler;
use tower::util::BoxCloneService;
use tower::{ServiceExt, service_fn};
use tracing::debug;

use super::{CAS_ATTR_HEADER_PREFIX, CAS_USER_HEADER, CasAttributes, CasUsername};

/// Runs the CAS client's two request steps (ticket/session validation, then
/// login enforcement) and publishes the established session to downstream
/// handlers.
#[derive(Clone)]
pub(crate) struct AuthnMiddleware {
    client: Arc<dyn CasClient>,
}

impl AuthnMiddleware {
    pub fn new(client: Arc<dyn CasClient>) -> Self {
        Self { client }
    }

    pub fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let client = Arc::clone(&self.client);
        BoxCloneService::new(service_fn(move |req: Request<Body>| {
            let client = Arc::clone(&client);
            let next = next.clone();
            async move {
                let req = match client.handle(req).await {
                    Handled::Continue(req) => req,
                    Handled::Respond(response) => return Ok(response),
                };
                let mut req = match client.enforce_login(req).await {
                    Handled::Continue(req) => req,
                    Handled::Respond(response) => return Ok(response),
                };
                publish_session(&mut req);
                next.oneshot(req).await
            }
        }))
    }
}

/// Copies the established session into request extensions and mirrors it into
/// headers for downstream components that only see raw headers.
fn publish_session(req: &mut Request<Body>) {
    let Some(session) = cas_client::session(req).cloned() else {
        return;
    };

    if let Ok(value) = HeaderValue::from_str(&session.username) {
        req.headers_mut()
            .insert(HeaderName::from_static(CAS_USER_HEADER), value);
    }
    for (name, values) in session.attributes.iter() {
        let Ok(header) = HeaderName::try_from(format!("{CAS_ATTR_HEADER_PREFIX}{name}")) else {
            debug!(attribute = name, "attribute name is not a legal header name");
            continue;
        };
        let Ok(value) = HeaderValue::from_str(&values.join(" ")) else {
            debug!(attribute = name, "attribute value is not a legal header value");
            continue;
        };
        req.headers_mut().insert(header, value);
    }

    req.extensions_mut().insert(CasUsername(session.username));
    req.extensions_mut().insert(CasAttributes(session.attributes));
}
