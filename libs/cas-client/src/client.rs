//! CAS 3.0 protocol client backed by `reqwest` and an in-memory session
//! store.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Uri, header};
use axum::response::{IntoResponse, Redirect};
use cookie::{Cookie, SameSite};
use tracing::debug;
use url::Url;

use crate::protocol::CasServiceResponse;
use crate::session::{CasSession, SessionStore};
use crate::{CasClient, CasError, Handled};

/// Name of the session cookie issued after a successful ticket validation.
pub const SESSION_COOKIE: &str = "casgate_session";

const TICKET_PARAM: &str = "ticket";

/// CAS 3.0 client: login redirects, `/p3/serviceValidate` ticket validation,
/// cookie-backed sessions.
pub struct HttpCasClient {
    base: Url,
    http: reqwest::Client,
    sessions: SessionStore,
}

impl HttpCasClient {
    /// Builds a client for the CAS server at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`CasError::InvalidUrl`] when `url` does not parse and
    /// [`CasError::UnsupportedScheme`] for non-http(s) URLs.
    pub fn new(url: &str) -> Result<Self, CasError> {
        let base = Url::parse(url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(CasError::UnsupportedScheme(base.scheme().to_owned()));
        }
        Ok(Self::from_url(base))
    }

    /// Builds a client from an already validated base URL.
    #[must_use]
    pub fn from_url(base: Url) -> Self {
        Self {
            base,
            http: reqwest::Client::new(),
            sessions: SessionStore::default(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn login_url(&self, service: &str) -> Url {
        let mut url = self.endpoint(&["login"]);
        url.query_pairs_mut().append_pair("service", service);
        url
    }

    fn validate_url(&self, ticket: &str, service: &str) -> Url {
        let mut url = self.endpoint(&["p3", "serviceValidate"]);
        url.query_pairs_mut()
            .append_pair("ticket", ticket)
            .append_pair("service", service)
            .append_pair("format", "JSON");
        url
    }

    async fn validate_ticket(&self, ticket: &str, service: &str) -> Result<CasSession, CasError> {
        let url = self.validate_url(ticket, service);
        let response: CasServiceResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let body = response.service_response;
        if let Some(success) = body.success {
            return Ok(success.into_session());
        }
        let failure = body.failure.ok_or(CasError::MalformedResponse)?;
        Err(CasError::Rejected {
            code: failure.code,
            description: failure.description,
        })
    }

    fn cookie_session(&self, req: &Request<Body>) -> Option<CasSession> {
        for value in req.headers().get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            for cookie in Cookie::split_parse(raw).flatten() {
                if cookie.name() == SESSION_COOKIE {
                    if let Some(session) = self.sessions.get(cookie.value()) {
                        return Some(session);
                    }
                }
            }
        }
        None
    }
}

#[async_trait]
impl CasClient for HttpCasClient {
    async fn handle(&self, mut req: Request<Body>) -> Handled {
        if let Some(ticket) = ticket_param(req.uri()) {
            let service = service_url(&req);
            match self.validate_ticket(&ticket, &service).await {
                Ok(session) => {
                    let id = self.sessions.insert(session);
                    let cookie = Cookie::build((SESSION_COOKIE, id))
                        .path("/")
                        .http_only(true)
                        .same_site(SameSite::Lax)
                        .build();
                    let headers = [(header::SET_COOKIE, cookie.to_string())];
                    return Handled::Respond((headers, Redirect::to(&service)).into_response());
                }
                Err(err) => {
                    // Invalid or replayed ticket: fall through unauthenticated
                    // so the login-enforcement step restarts the flow.
                    debug!(error = %err, "ticket validation failed");
                }
            }
        }

        if let Some(session) = self.cookie_session(&req) {
            req.extensions_mut().insert(session);
        }
        Handled::Continue(req)
    }

    async fn enforce_login(&self, req: Request<Body>) -> Handled {
        if req.extensions().get::<CasSession>().is_some() {
            return Handled::Continue(req);
        }
        let login = self.login_url(&service_url(&req));
        Handled::Respond(Redirect::to(login.as_str()).into_response())
    }
}

/// Absolute URL this request targeted, with any `ticket` parameter removed.
/// CAS requires the exact service URL that was presented at login time.
fn service_url(req: &Request<Body>) -> String {
    let scheme = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let path = req.uri().path();
    match query_without_ticket(req.uri()) {
        Some(query) => format!("{scheme}://{host}{path}?{query}"),
        None => format!("{scheme}://{host}{path}"),
    }
}

fn ticket_param(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name.as_ref() == TICKET_PARAM)
        .map(|(_, value)| value.into_owned())
}

fn query_without_ticket(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    let remaining: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(name, _)| name.as_ref() != TICKET_PARAM)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if remaining.is_empty() {
        return None;
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer.extend_pairs(remaining);
    Some(serializer.finish())
}
