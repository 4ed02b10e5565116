//! CAS 3.0 JSON service response model (`/p3/serviceValidate?format=JSON`).

use std::collections::HashMap;

use serde::Deserialize;

use crate::session::{Attributes, CasSession};

#[derive(Debug, Deserialize)]
pub struct CasServiceResponse {
    #[serde(rename = "serviceResponse")]
    pub service_response: ServiceResponseBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceResponseBody {
    #[serde(rename = "authenticationSuccess")]
    pub success: Option<AuthenticationSuccess>,
    #[serde(rename = "authenticationFailure")]
    pub failure: Option<AuthenticationFailure>,
}

#[derive(Debug, Deserialize)]
pub struct AuthenticationSuccess {
    pub user: String,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeValue>,
}

/// CAS servers emit scalar attributes as plain strings and multi-valued
/// ones as arrays.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
pub struct AuthenticationFailure {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

impl AuthenticationSuccess {
    pub(crate) fn into_session(self) -> CasSession {
        let mut attributes = Attributes::new();
        for (name, value) in self.attributes {
            match value {
                AttributeValue::One(value) => attributes.insert(name, value),
                AttributeValue::Many(values) => {
                    for value in values {
                        attributes.insert(name.clone(), value);
                    }
                }
            }
        }
        CasSession {
            username: self.user,
            attributes,
        }
    }
}
