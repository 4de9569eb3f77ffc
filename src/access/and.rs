//! Conjunction of policies: every child must grant.

use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use super::{AccessAssertion, AssertionRecord, AssertionRegistry, ValidationContext};
use crate::error::{AccessError, AccessResult, ConfigError, ConfigResult, ValidationError};
use crate::identity::SecurityContext;

/// Grants only when every child policy grants; the first refusal is returned.
/// Templates use it to narrow the document-wide policy.
#[derive(Debug, Clone, Default)]
pub struct AndAccessAssertion {
    predicates: Option<Vec<Arc<dyn AccessAssertion>>>,
}

impl AndAccessAssertion {
    pub const KIND: &'static str = "and";
    pub const PREDICATES_KEY: &'static str = "predicates";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_predicates(predicates: Vec<Arc<dyn AccessAssertion>>) -> Self {
        Self { predicates: Some(predicates) }
    }

    /// Set-once, like [`RoleAccessAssertion::set_required_roles`](super::RoleAccessAssertion::set_required_roles).
    pub fn set_predicates(&mut self, predicates: Vec<Arc<dyn AccessAssertion>>) -> ConfigResult<()> {
        if self.predicates.is_some() {
            return Err(ConfigError::PredicatesAlreadySet);
        }
        self.predicates = Some(predicates);
        Ok(())
    }

    pub fn predicates(&self) -> Option<&[Arc<dyn AccessAssertion>]> {
        self.predicates.as_deref()
    }
}

impl AccessAssertion for AndAccessAssertion {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn assert_access(&self, ctx: &SecurityContext, action: &str, resource: &str) -> AccessResult<()> {
        let Some(predicates) = self.predicates.as_ref() else {
            error!(target: "printguard::access", "request={} and-policy used before configuration: {} on '{}'", ctx.request_id(), action, resource);
            return Err(AccessError::misconfigured(Self::KIND, action, resource));
        };
        for p in predicates {
            p.assert_access(ctx, action, resource)?;
        }
        Ok(())
    }

    fn validate(&self, errors: &mut Vec<ValidationError>, vctx: &ValidationContext) {
        let Some(predicates) = self.predicates.as_ref() else {
            errors.push(vctx.error("predicates are not configured"));
            return;
        };
        for (i, p) in predicates.iter().enumerate() {
            p.validate(errors, &vctx.child(&format!("predicates[{i}]")));
        }
    }

    fn marshal(&self) -> ConfigResult<AssertionRecord> {
        let predicates = self.predicates.as_ref().ok_or(ConfigError::NotConfigured(Self::KIND))?;
        let children = predicates
            .iter()
            .map(|p| AssertionRegistry::marshal(p.as_ref()).map(Value::Object))
            .collect::<ConfigResult<Vec<_>>>()?;
        let mut record = AssertionRecord::new();
        record.insert(Self::PREDICATES_KEY.to_string(), Value::Array(children));
        Ok(record)
    }

    fn unmarshal(&mut self, record: &AssertionRecord, registry: &AssertionRegistry) -> ConfigResult<()> {
        let items = match record.get(Self::PREDICATES_KEY) {
            None | Some(Value::Null) => return Ok(()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ConfigError::invalid_value(Self::PREDICATES_KEY, format!("expected an array, found {other}")))
            }
        };
        let mut predicates: Vec<Arc<dyn AccessAssertion>> = Vec::with_capacity(items.len());
        for item in items {
            let child = item.as_object().ok_or_else(|| {
                ConfigError::invalid_value(Self::PREDICATES_KEY, format!("expected an object, found {item}"))
            })?;
            predicates.push(Arc::from(registry.unmarshal(child)?));
        }
        self.set_predicates(predicates)
    }
}
