//! Named factories for policy kinds, so records can name the kind they hold.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde_json::Value;

use super::{AccessAssertion, AlwaysAllowAssertion, AndAccessAssertion, AssertionRecord, RoleAccessAssertion};
use crate::error::{ConfigError, ConfigResult};

/// Record key holding the policy kind.
pub const TYPE_KEY: &str = "type";

/// Builds a fresh, unconfigured policy of one kind.
pub type AssertionFactory = fn() -> Box<dyn AccessAssertion>;

static BUILTIN: Lazy<AssertionRegistry> = Lazy::new(AssertionRegistry::with_builtins);

#[derive(Clone)]
pub struct AssertionRegistry {
    factories: HashMap<String, AssertionFactory>,
}

impl AssertionRegistry {
    /// Registry without any kinds.
    pub fn empty() -> Self {
        Self { factories: HashMap::new() }
    }

    /// Registry knowing `role`, `and` and `always`.
    pub fn with_builtins() -> Self {
        let mut r = Self::empty();
        r.register(RoleAccessAssertion::KIND, || Box::new(RoleAccessAssertion::new()));
        r.register(AndAccessAssertion::KIND, || Box::new(AndAccessAssertion::new()));
        r.register(AlwaysAllowAssertion::KIND, || Box::new(AlwaysAllowAssertion));
        r
    }

    /// Shared process-wide registry with the built-in kinds.
    pub fn builtin() -> &'static AssertionRegistry {
        &BUILTIN
    }

    /// Register (or replace) the factory for `kind`.
    pub fn register<S: Into<String>>(&mut self, kind: S, factory: AssertionFactory) {
        self.factories.insert(kind.into(), factory);
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn create(&self, kind: &str) -> ConfigResult<Box<dyn AccessAssertion>> {
        let factory = self.factories.get(kind).ok_or_else(|| ConfigError::UnknownKind(kind.to_string()))?;
        Ok(factory())
    }

    /// Build the policy a tagged record describes.
    pub fn unmarshal(&self, record: &AssertionRecord) -> ConfigResult<Box<dyn AccessAssertion>> {
        let kind = match record.get(TYPE_KEY) {
            Some(Value::String(kind)) => kind.as_str(),
            Some(other) => return Err(ConfigError::invalid_value(TYPE_KEY, format!("expected a string, found {other}"))),
            None => return Err(ConfigError::MissingKey(TYPE_KEY.to_string())),
        };
        let mut assertion = self.create(kind)?;
        assertion.unmarshal(record, self)?;
        Ok(assertion)
    }

    /// Marshal `assertion` and tag the record with its kind.
    pub fn marshal(assertion: &dyn AccessAssertion) -> ConfigResult<AssertionRecord> {
        let mut record = assertion.marshal()?;
        record.insert(TYPE_KEY.to_string(), Value::String(assertion.kind().to_string()));
        Ok(record)
    }
}

impl Default for AssertionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for AssertionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionRegistry").field("kinds", &self.kinds()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AccessError, ValidationError};
    use crate::identity::{Principal, SecurityContext};
    use crate::access::ValidationContext;
    use serde_json::json;

    fn record(v: Value) -> AssertionRecord {
        v.as_object().cloned().unwrap()
    }

    /// Refuses everyone; stands in for a policy kind registered by the host.
    #[derive(Debug, Default)]
    struct ClosedAssertion;

    impl AccessAssertion for ClosedAssertion {
        fn kind(&self) -> &'static str { "closed" }
        fn assert_access(&self, ctx: &SecurityContext, action: &str, resource: &str) -> crate::error::AccessResult<()> {
            let user = ctx.principal().map(|p| p.user_id.as_str()).unwrap_or("-");
            Err(AccessError::access_denied(user, action, resource))
        }
        fn validate(&self, _errors: &mut Vec<ValidationError>, _vctx: &ValidationContext) {}
        fn marshal(&self) -> ConfigResult<AssertionRecord> { Ok(AssertionRecord::new()) }
        fn unmarshal(&mut self, _record: &AssertionRecord, _registry: &AssertionRegistry) -> ConfigResult<()> { Ok(()) }
    }

    #[test]
    fn builtin_kinds() {
        assert_eq!(AssertionRegistry::builtin().kinds(), vec!["always", "and", "role"]);
        assert!(AssertionRegistry::empty().kinds().is_empty());
    }

    #[test]
    fn unknown_and_missing_type() {
        let r = AssertionRegistry::default();
        assert!(matches!(r.unmarshal(&record(json!({"type": "time"}))), Err(ConfigError::UnknownKind(k)) if k == "time"));
        assert!(matches!(r.unmarshal(&record(json!({"roles": []}))), Err(ConfigError::MissingKey(_))));
        assert!(matches!(r.unmarshal(&record(json!({"type": 3}))), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn unmarshal_builds_nested_policies() {
        let r = AssertionRegistry::default();
        let policy = r
            .unmarshal(&record(json!({
                "type": "and",
                "predicates": [
                    {"type": "role", "roles": ["ROLE_USER"]},
                    {"type": "role", "roles": ["ROLE_PRINT"]}
                ]
            })))
            .unwrap();
        assert_eq!(policy.kind(), "and");
        let ok = SecurityContext::authenticated(Principal::new("u", ["ROLE_USER", "ROLE_PRINT"]));
        let partial = SecurityContext::authenticated(Principal::new("u", ["ROLE_USER"]));
        assert!(policy.assert_access(&ok, "print", "a4").is_ok());
        assert!(policy.assert_access(&partial, "print", "a4").is_err());
    }

    #[test]
    fn custom_kinds_can_be_registered() {
        let mut r = AssertionRegistry::default();
        r.register("closed", || Box::new(ClosedAssertion));
        let policy = r.unmarshal(&record(json!({"type": "closed"}))).unwrap();
        let ctx = SecurityContext::authenticated(Principal::new("u", ["ROLE_ADMIN"]));
        assert!(matches!(policy.assert_access(&ctx, "print", "a4"), Err(AccessError::AccessDenied { .. })));
        assert_eq!(AssertionRegistry::marshal(policy.as_ref()).unwrap(), record(json!({"type": "closed"})));
    }

    #[test]
    fn marshal_unconfigured_is_an_error() {
        let policy = RoleAccessAssertion::new();
        assert!(matches!(AssertionRegistry::marshal(&policy), Err(ConfigError::NotConfigured(_))));
    }
}
