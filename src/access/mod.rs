//! Access assertions — the policies that decide whether a caller may perform a
//! protected print action.
//!
//! Every policy kind implements [`AccessAssertion`]. Instances are built and
//! configured while a configuration document loads (through `&mut self`), then
//! frozen behind an `Arc` and shared read-only across request threads. Keep each
//! policy kind in its own small sub-module.

mod always;
mod and;
mod registry;
mod role;

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{AccessResult, ConfigError, ConfigResult, ValidationError};
use crate::identity::SecurityContext;

pub use always::AlwaysAllowAssertion;
pub use and::AndAccessAssertion;
pub use registry::{AssertionFactory, AssertionRegistry, TYPE_KEY};
pub use role::RoleAccessAssertion;

/// Structured configuration record a policy marshals to and unmarshals from.
pub type AssertionRecord = Map<String, Value>;

/// Policy deciding who may perform an action.
///
/// Implementations must be immutable once configured so a single instance can
/// be evaluated concurrently from many request threads.
pub trait AccessAssertion: fmt::Debug + Send + Sync {
    /// Registry name of this policy kind, written as the record's `type`.
    fn kind(&self) -> &'static str;

    /// Ok when the caller in `ctx` may perform `action` on `resource`.
    /// `action` and `resource` are only used for messages and logs.
    fn assert_access(&self, ctx: &SecurityContext, action: &str, resource: &str) -> AccessResult<()>;

    /// Append one error per structural problem in this policy's configuration.
    fn validate(&self, errors: &mut Vec<ValidationError>, vctx: &ValidationContext);

    /// Configuration record sufficient to rebuild an equivalent policy.
    fn marshal(&self) -> ConfigResult<AssertionRecord>;

    /// Configure a fresh instance from a record produced by [`marshal`](Self::marshal).
    /// Nested policies are resolved through `registry`.
    fn unmarshal(&mut self, record: &AssertionRecord, registry: &AssertionRegistry) -> ConfigResult<()>;
}

/// Where in the configuration document the policy being validated lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationContext {
    path: String,
}

impl ValidationContext {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn child(&self, segment: &str) -> Self {
        if self.path.is_empty() {
            Self::new(segment)
        } else {
            Self::new(format!("{}.{}", self.path, segment))
        }
    }

    pub fn error<M: Into<String>>(&self, message: M) -> ValidationError {
        let path = if self.path.is_empty() { "<root>" } else { self.path.as_str() };
        ValidationError::new(path, message)
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::new("")
    }
}

/// Read an optional array-of-strings value. `None` for an absent or `null` key.
pub(crate) fn string_list(record: &AssertionRecord, key: &str) -> ConfigResult<Option<Vec<String>>> {
    let Some(value) = record.get(key) else { return Ok(None) };
    match value {
        Value::Null => Ok(None),
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ConfigError::invalid_value(key, format!("expected a string, found {v}")))
            })
            .collect::<ConfigResult<Vec<_>>>()
            .map(Some),
        other => Err(ConfigError::invalid_value(key, format!("expected an array, found {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> AssertionRecord {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn string_list_distinguishes_absent_null_and_empty() {
        let r = record(json!({"roles": [], "other": null}));
        assert_eq!(string_list(&r, "roles").unwrap(), Some(vec![]));
        assert_eq!(string_list(&r, "other").unwrap(), None);
        assert_eq!(string_list(&r, "missing").unwrap(), None);
    }

    #[test]
    fn string_list_rejects_non_strings() {
        let r = record(json!({"roles": ["ROLE_USER", 7]}));
        assert!(matches!(string_list(&r, "roles"), Err(ConfigError::InvalidValue { .. })));
        let r = record(json!({"roles": "ROLE_USER"}));
        assert!(matches!(string_list(&r, "roles"), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn validation_context_builds_dotted_paths() {
        let root = ValidationContext::default();
        assert_eq!(root.error("x").path, "<root>");
        let t = root.child("templates").child("A4 portrait").child("access");
        assert_eq!(t.path(), "templates.A4 portrait.access");
        assert_eq!(t.error("bad").to_string(), "templates.A4 portrait.access: bad");
    }
}
