//! The authentication and authorization middlewares composed by the plugin.

mod authn;
mod authz;

pub(crate) use authn::AuthnMiddleware;
pub(crate) use authz::{AuthzMiddleware, SubjectSelector};

use cas_client::Attributes;

/// Request extension carrying the authenticated username.
#[derive(Debug, Clone)]
pub struct CasUsername(pub String);

/// Request extension carrying the session attributes.
#[derive(Debug, Clone)]
pub struct CasAttributes(pub Attributes);

/// Header mirroring the authenticated username.
pub const CAS_USER_HEADER: &str = "x-cas-user";

/// Prefix for headers mirroring session attributes, one per attribute name,
/// values space-joined.
pub const CAS_ATTR_HEADER_PREFIX: &str = "x-cas-attr-";
