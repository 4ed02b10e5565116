//! CAS single-sign-on gateway plugin.
//!
//! Bridges a CAS login flow with a casbin policy check as one host
//! middleware: requests authenticate against the CAS server, the session is
//! propagated through request extensions and `X-CAS-*` headers, and the
//! derived subject is checked against the loaded policy before the request
//! reaches downstream handlers.
//!
//! The plugin degrades rather than breaks: an unparsable CAS URL turns every
//! request into a fixed 500 until the next successful
//! [`RouterPlugin::update`](plugin_api::RouterPlugin::update); unloadable
//! policy files disable the authorization stage but leave authentication in
//! place.

mod config;
mod enforcer;
mod error;
mod middleware;
mod plugin;

pub use config::{CasbinConfig, SsoConfig};
pub use enforcer::{ANY_RESOURCE, PolicyGate};
pub use error::GateError;
pub use middleware::{CAS_ATTR_HEADER_PREFIX, CAS_USER_HEADER, CasAttributes, CasUsername};
pub use plugin::{CasClientFactory, CasSsoPlugin, PRIORITY};
