//! Policy-check middleware.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use plugin_api::BoxHandler;
use tower::util::BoxCloneService;
use tower::{ServiceExt, service_fn};

use crate::enforcer::PolicyGate;

/// How the policy subject is derived from an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SubjectSelector {
    /// Use the authenticated username.
    Username,
    /// Use the first value of the named session attribute.
    Attribute(String),
}

impl SubjectSelector {
    pub fn from_attr(attr: &str) -> Self {
        if attr.is_empty() {
            Self::Username
        } else {
            Self::Attribute(attr.to_owned())
        }
    }

    /// Derived subject; empty when the request carries no usable identity.
    pub fn subject(&self, req: &Request<Body>) -> String {
        match self {
            Self::Username => cas_client::username(req).unwrap_or_default().to_owned(),
            Self::Attribute(name) => cas_client::attributes(req)
                .and_then(|attributes| attributes.first(name))
                .unwrap_or_default()
                .to_owned(),
        }
    }
}

/// Derives the subject and asks the policy gate before letting the request
/// through. Runs strictly after authentication.
#[derive(Clone)]
pub(crate) struct AuthzMiddleware {
    gate: Option<Arc<PolicyGate>>,
    selector: SubjectSelector,
}

impl AuthzMiddleware {
    pub fn new(gate: Option<Arc<PolicyGate>>, selector: SubjectSelector) -> Self {
        Self { gate, selector }
    }

    pub fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let gate = self.gate.clone();
        let selector = self.selector.clone();
        BoxCloneService::new(service_fn(move |req: Request<Body>| {
            let gate = gate.clone();
            let selector = selector.clone();
            let next = next.clone();
            async move {
                let Some(gate) = gate else {
                    return Ok((StatusCode::FORBIDDEN, "forbidden").into_response());
                };
                let subject = selector.subject(&req);
                if subject.is_empty() {
                    return Ok((StatusCode::UNAUTHORIZED, "unauthorized").into_response());
                }
                if gate.check(&subject) {
                    next.oneshot(req).await
                } else {
                    Ok((StatusCode::FORBIDDEN, "forbidden").into_response())
                }
            }
        }))
    }
}
