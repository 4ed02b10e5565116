//! Casbin-backed policy evaluation.

use casbin::{CoreApi, DefaultModel, Enforcer, FileAdapter, MemoryAdapter};
use tracing::debug;

use crate::config::CasbinConfig;
use crate::error::GateError;

/// The fixed resource identifier checked for every subject. The policy model
/// only distinguishes subjects, not resources or actions.
pub const ANY_RESOURCE: &str = "*";

impl CasbinConfig {
    /// Builds the policy enforcer described by this configuration.
    ///
    /// # Errors
    ///
    /// [`GateError::Configuration`] when the model path is empty;
    /// [`GateError::PolicyLoad`] when casbin cannot load the model or policy
    /// files.
    pub async fn enforcer(&self) -> Result<Enforcer, GateError> {
        if self.model.is_empty() {
            return Err(GateError::Configuration(
                "casbin model path is empty".to_owned(),
            ));
        }
        let model = DefaultModel::from_file(&self.model).await?;
        let enforcer = if self.policy.is_empty() {
            Enforcer::new(model, MemoryAdapter::default()).await?
        } else {
            Enforcer::new(model, FileAdapter::new(self.policy.clone())).await?
        };
        Ok(enforcer)
    }
}

/// Pass/fail gate over a loaded enforcer.
pub struct PolicyGate {
    enforcer: Enforcer,
}

impl PolicyGate {
    #[must_use]
    pub fn new(enforcer: Enforcer) -> Self {
        Self { enforcer }
    }

    /// Whether `subject` is allowed. Evaluation errors deny.
    #[must_use]
    pub fn check(&self, subject: &str) -> bool {
        match self.enforcer.enforce((subject, ANY_RESOURCE)) {
            Ok(allowed) => allowed,
            Err(err) => {
                debug!(subject, error = %err, "policy evaluation failed, denying");
                false
            }
        }
    }
}
