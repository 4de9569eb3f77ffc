//! Role based policy: the caller must hold at least one of the required roles.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, error, warn};

use super::{string_list, AccessAssertion, AssertionRecord, AssertionRegistry, ValidationContext};
use crate::error::{AccessError, AccessResult, ConfigError, ConfigResult, ValidationError};
use crate::identity::SecurityContext;

/// Grants access to an authenticated caller holding any one of `required_roles`.
///
/// An explicitly empty role set means "any authenticated caller". An unset
/// role set is a configuration error reported by [`validate`](AccessAssertion::validate).
///
/// ```
/// use printguard::{AccessAssertion, Principal, RoleAccessAssertion, SecurityContext};
///
/// let policy = RoleAccessAssertion::with_roles(["ROLE_USER"]);
/// let ctx = SecurityContext::authenticated(Principal::new("alice", ["ROLE_USER", "ROLE_OTHER"]));
/// assert!(policy.assert_access(&ctx, "create report", "A4 portrait").is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAccessAssertion {
    required_roles: Option<BTreeSet<String>>,
}

impl RoleAccessAssertion {
    pub const KIND: &'static str = "role";
    pub const ROLES_KEY: &'static str = "roles";

    /// Unconfigured instance; configure it once with [`set_required_roles`](Self::set_required_roles).
    pub fn new() -> Self {
        Self::default()
    }

    /// Configured instance in one step.
    pub fn with_roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { required_roles: Some(roles.into_iter().map(Into::into).collect()) }
    }

    /// Set the required roles. Fails with [`ConfigError::RolesAlreadySet`] when
    /// they have been set before, whatever the new value.
    pub fn set_required_roles<I, S>(&mut self, roles: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if self.required_roles.is_some() {
            return Err(ConfigError::RolesAlreadySet);
        }
        self.required_roles = Some(roles.into_iter().map(Into::into).collect());
        Ok(())
    }

    pub fn required_roles(&self) -> Option<&BTreeSet<String>> {
        self.required_roles.as_ref()
    }

    pub fn is_configured(&self) -> bool {
        self.required_roles.is_some()
    }
}

impl AccessAssertion for RoleAccessAssertion {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn assert_access(&self, ctx: &SecurityContext, action: &str, resource: &str) -> AccessResult<()> {
        // Authentication is demanded before the role set is even looked at.
        let Some(principal) = ctx.principal() else {
            warn!(target: "printguard::access", "request={} anonymous caller refused: {} on '{}'", ctx.request_id(), action, resource);
            return Err(AccessError::authentication_required(action, resource));
        };
        let Some(required) = self.required_roles.as_ref() else {
            error!(target: "printguard::access", "request={} role policy used before configuration: {} on '{}'", ctx.request_id(), action, resource);
            return Err(AccessError::misconfigured(Self::KIND, action, resource));
        };
        if required.is_empty() || principal.has_any_role(required) {
            debug!(target: "printguard::access", "request={} user={} granted {} on '{}'", ctx.request_id(), principal.user_id, action, resource);
            return Ok(());
        }
        warn!(
            target: "printguard::access",
            "request={} user={} denied {} on '{}': holds {:?}, needs one of {:?}",
            ctx.request_id(), principal.user_id, action, resource, principal.roles, required
        );
        Err(AccessError::access_denied(&principal.user_id, action, resource))
    }

    fn validate(&self, errors: &mut Vec<ValidationError>, vctx: &ValidationContext) {
        if self.required_roles.is_none() {
            errors.push(vctx.error("required roles are not configured; use [] to admit any authenticated user"));
        }
    }

    fn marshal(&self) -> ConfigResult<AssertionRecord> {
        let roles = self.required_roles.as_ref().ok_or(ConfigError::NotConfigured(Self::KIND))?;
        let mut record = AssertionRecord::new();
        record.insert(
            Self::ROLES_KEY.to_string(),
            Value::Array(roles.iter().cloned().map(Value::String).collect()),
        );
        Ok(record)
    }

    fn unmarshal(&mut self, record: &AssertionRecord, _registry: &AssertionRegistry) -> ConfigResult<()> {
        // Absent key leaves the policy unset so validation reports it with the rest of the document.
        match string_list(record, Self::ROLES_KEY)? {
            Some(roles) => self.set_required_roles(roles),
            None => Ok(()),
        }
    }
}
