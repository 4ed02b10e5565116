//! Plugin configuration.

use serde::{Deserialize, Serialize};

/// Plugin configuration, replaced wholesale on every reload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SsoConfig {
    /// Base URL of the CAS server.
    pub url: String,

    /// Authorization settings.
    pub casbin: CasbinConfig,
}

/// Casbin authorization settings.
///
/// Validated lazily: an empty model path is rejected when the enforcer is
/// built, which drops the plugin into authentication-only mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CasbinConfig {
    /// Path to the casbin model file.
    pub model: String,

    /// Path to the casbin policy file. Empty loads the model with no rules.
    pub policy: String,

    /// Session attribute whose first value becomes the policy subject.
    /// Empty selects the authenticated username instead.
    pub subject_attr: String,
}
