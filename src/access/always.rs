use tracing::debug;

use super::{AccessAssertion, AssertionRecord, AssertionRegistry, ValidationContext};
use crate::error::{AccessResult, ConfigResult, ValidationError};
use crate::identity::SecurityContext;

/// Grants every caller, anonymous ones included. Used when a configuration
/// document or template does not configure a policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlwaysAllowAssertion;

impl AlwaysAllowAssertion {
    pub const KIND: &'static str = "always";
}

impl AccessAssertion for AlwaysAllowAssertion {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn assert_access(&self, ctx: &SecurityContext, action: &str, resource: &str) -> AccessResult<()> {
        debug!(target: "printguard::access", "request={} open policy granted {} on '{}'", ctx.request_id(), action, resource);
        Ok(())
    }

    fn validate(&self, _errors: &mut Vec<ValidationError>, _vctx: &ValidationContext) {}

    fn marshal(&self) -> ConfigResult<AssertionRecord> {
        Ok(AssertionRecord::new())
    }

    fn unmarshal(&mut self, _record: &AssertionRecord, _registry: &AssertionRegistry) -> ConfigResult<()> {
        Ok(())
    }
}
