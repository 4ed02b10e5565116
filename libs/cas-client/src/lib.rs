//! CAS (Central Authentication Service) session client.
//!
//! The protocol flow is split into the two request-wrapping steps a CAS
//! middleware needs, exposed through the [`CasClient`] trait:
//!
//! 1. [`CasClient::handle`]: ticket/session validation. A request carrying a
//!    `ticket` query parameter is validated against the CAS server; on
//!    success the client stores a session and redirects to the ticket-free
//!    URL with a session cookie. Requests without a ticket resolve their
//!    session from the cookie.
//! 2. [`CasClient::enforce_login`]: login enforcement. Requests without an
//!    established session are redirected to the CAS login page.
//!
//! An established session rides on the request as a [`CasSession`] extension;
//! [`session`], [`username`] and [`attributes`] read it back without the
//! caller knowing the extension key.

mod client;
mod error;
mod protocol;
mod session;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

pub use client::{HttpCasClient, SESSION_COOKIE};
pub use error::CasError;
pub use protocol::{
    AttributeValue, AuthenticationFailure, AuthenticationSuccess, CasServiceResponse,
};
pub use session::{Attributes, CasSession};

/// Outcome of a CAS request-processing step.
pub enum Handled {
    /// The request may proceed to the next step.
    Continue(Request<Body>),
    /// The protocol short-circuits with this response (redirects, errors).
    Respond(Response),
}

/// A source of authenticated CAS sessions.
///
/// Production code uses [`HttpCasClient`]; tests substitute handler-backed
/// mocks.
#[async_trait]
pub trait CasClient: Send + Sync {
    /// Ticket/session validation step.
    async fn handle(&self, req: Request<Body>) -> Handled;

    /// Login-required enforcement step. Runs after [`CasClient::handle`].
    async fn enforce_login(&self, req: Request<Body>) -> Handled;
}

/// The session established on this request, if any.
#[must_use]
pub fn session(req: &Request<Body>) -> Option<&CasSession> {
    req.extensions().get()
}

/// The authenticated username, if any.
#[must_use]
pub fn username(req: &Request<Body>) -> Option<&str> {
    session(req).map(|s| s.username.as_str())
}

/// The session attributes, if any.
#[must_use]
pub fn attributes(req: &Request<Body>) -> Option<&Attributes> {
    session(req).map(|s| &s.attributes)
}
