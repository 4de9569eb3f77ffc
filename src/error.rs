//! Error model for access decisions and policy configuration.
//! Request-time failures (`AccessError`) are kept apart from load-time ones
//! (`ConfigError`); validation problems are collected as `ValidationError`
//! values and only become an error when a whole document is rejected.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Outcome of a failed `assert_access` call. Never retryable: the same
/// principal against the same policy always yields the same result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// No authenticated principal in the security context.
    #[error("authentication required to {action} on '{resource}'")]
    AuthenticationRequired { action: String, resource: String },

    /// Principal present but holds none of the required roles.
    #[error("access denied: '{user_id}' may not {action} on '{resource}'")]
    AccessDenied { user_id: String, action: String, resource: String },

    /// Policy reached decision time without being configured.
    #[error("{kind} policy guarding {action} on '{resource}' is not configured")]
    Misconfigured { kind: &'static str, action: String, resource: String },

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),
}

impl AccessError {
    pub fn authentication_required(action: &str, resource: &str) -> Self {
        AccessError::AuthenticationRequired { action: action.into(), resource: resource.into() }
    }

    pub fn access_denied(user_id: &str, action: &str, resource: &str) -> Self {
        AccessError::AccessDenied { user_id: user_id.into(), action: action.into(), resource: resource.into() }
    }

    pub fn misconfigured(kind: &'static str, action: &str, resource: &str) -> Self {
        AccessError::Misconfigured { kind, action: action.into(), resource: resource.into() }
    }

    pub fn code_str(&self) -> &'static str {
        match self {
            AccessError::AuthenticationRequired { .. } => "not_logged_in",
            AccessError::AccessDenied { .. } => "forbidden",
            AccessError::Misconfigured { .. } => "policy_misconfigured",
            AccessError::UnknownTemplate(_) => "unknown_template",
        }
    }

    /// Map to the HTTP status the request pipeline should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            AccessError::AuthenticationRequired { .. } => 401,
            AccessError::AccessDenied { .. } => 403,
            AccessError::UnknownTemplate(_) => 404,
            AccessError::Misconfigured { .. } => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        false
    }
}

pub type AccessResult<T> = Result<T, AccessError>;

/// One structural problem found while validating a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Location of the offending policy inside the configuration document.
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Failures raised while building, (un)marshaling or loading policies.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `set_required_roles` called on an already configured assertion.
    #[error("required roles have already been set on this assertion")]
    RolesAlreadySet,

    #[error("predicates have already been set on this assertion")]
    PredicatesAlreadySet,

    #[error("cannot marshal an unconfigured {0} assertion")]
    NotConfigured(&'static str),

    #[error("record is missing required key '{0}'")]
    MissingKey(String),

    #[error("record key '{key}' is malformed: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("unknown access assertion type '{0}'")]
    UnknownKind(String),

    #[error("configuration document is invalid ({} errors): {}", .0.len(), join_errors(.0))]
    Invalid(Vec<ValidationError>),

    #[error("configuration document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid_value<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        ConfigError::InvalidValue { key: key.into(), reason: reason.into() }
    }

    /// Validation errors carried by a rejected document, empty for every other variant.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            ConfigError::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
