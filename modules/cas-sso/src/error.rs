use thiserror::Error;

/// Errors raised while building the plugin's pipeline.
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration rejected before touching the policy engine.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The policy engine could not load the model or policy files.
    #[error("policy load failed: {0}")]
    PolicyLoad(#[from] casbin::Error),
}
