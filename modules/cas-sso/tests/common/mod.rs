#![allow(dead_code)]

//! Shared helpers for the plugin integration tests.

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use cas_client::{Attributes, CasClient, CasSession, Handled};
use cas_sso::{CAS_USER_HEADER, CasClientFactory, CasSsoPlugin, CasbinConfig, SsoConfig};
use plugin_api::{BoxHandler, RouterPlugin, box_handler};
use tower::{ServiceExt, service_fn};

pub const MODEL: &str = "tests/fixtures/model.conf";
pub const POLICY: &str = "tests/fixtures/policy.csv";
pub const POLICY_V2: &str = "tests/fixtures/policy_v2.csv";
pub const CAS_URL: &str = "https://sso.example.com/cas";

/// CAS client double: attaches a fixed session in `handle`, turns
/// sessionless requests away with 401 in `enforce_login`.
pub struct StaticClient {
    session: Option<CasSession>,
}

#[async_trait]
impl CasClient for StaticClient {
    async fn handle(&self, mut req: Request<Body>) -> Handled {
        if let Some(session) = &self.session {
            req.extensions_mut().insert(session.clone());
        }
        Handled::Continue(req)
    }

    async fn enforce_login(&self, req: Request<Body>) -> Handled {
        if req.extensions().get::<CasSession>().is_some() {
            Handled::Continue(req)
        } else {
            Handled::Respond((StatusCode::UNAUTHORIZED, "login required").into_response())
        }
    }
}

/// Factory handing every pipeline build a client with the given session.
pub fn static_factory(session: Option<CasSession>) -> CasClientFactory {
    Arc::new(move |_url: &url::Url| -> Arc<dyn CasClient> {
        Arc::new(StaticClient {
            session: session.clone(),
        })
    })
}

pub fn session(username: &str, attrs: &[(&str, &[&str])]) -> CasSession {
    let mut attributes = Attributes::new();
    for (name, values) in attrs {
        for value in *values {
            attributes.insert(*name, *value);
        }
    }
    CasSession {
        username: username.to_owned(),
        attributes,
    }
}

pub fn config(url: &str, model: &str, policy: &str, subject_attr: &str) -> SsoConfig {
    SsoConfig {
        url: url.to_owned(),
        casbin: CasbinConfig {
            model: model.to_owned(),
            policy: policy.to_owned(),
            subject_attr: subject_attr.to_owned(),
        },
    }
}

/// Downstream handler that proves it was reached.
pub fn downstream() -> BoxHandler {
    box_handler(service_fn(|_req: Request<Body>| async {
        Ok::<Response, Infallible>((StatusCode::OK, "downstream").into_response())
    }))
}

/// Downstream handler echoing the propagated identity headers.
pub fn echo_downstream() -> BoxHandler {
    box_handler(service_fn(|req: Request<Body>| async move {
        let user = req
            .headers()
            .get(CAS_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let dept = req
            .headers()
            .get("x-cas-attr-dept")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Ok::<Response, Infallible>(Body::from(format!("{user}|{dept}")).into_response())
    }))
}

pub async fn run(plugin: &CasSsoPlugin, next: BoxHandler) -> Response {
    run_request(plugin, next, Request::new(Body::empty())).await
}

pub async fn run_request(
    plugin: &CasSsoPlugin,
    next: BoxHandler,
    req: Request<Body>,
) -> Response {
    plugin.process(next).oneshot(req).await.unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
