//! Access section of a print configuration document.
//!
//! The document holds one optional policy for the whole configuration and one
//! optional policy per template, each as a tagged assertion record:
//!
//! ```json
//! { "access": {"type": "role", "roles": ["ROLE_USER"]},
//!   "templates": { "A4 portrait": {"access": {"type": "role", "roles": ["ROLE_PRINT"]}} } }
//! ```
//!
//! [`AccessConfig::load`] resolves and validates every policy, aggregating all
//! problems before accepting or rejecting the document, and returns frozen
//! [`AccessPolicies`] ready to be shared across request threads.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::access::{
    AccessAssertion, AlwaysAllowAssertion, AndAccessAssertion, AssertionRecord, AssertionRegistry, ValidationContext,
};
use crate::error::{AccessError, AccessResult, ConfigError, ConfigResult};
use crate::identity::SecurityContext;
use crate::tprintln;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccessConfig {
    /// Document-wide policy; open to everyone when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AssertionRecord>,
    #[serde(default)]
    pub templates: BTreeMap<String, TemplateConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TemplateConfig {
    /// Template policy, combined with the document policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AssertionRecord>,
}

impl AccessConfig {
    pub fn from_json_str(s: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading access configuration {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parsing access configuration {}", path.display()))
    }

    pub fn to_json_string(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load with the built-in policy kinds.
    pub fn load(&self) -> ConfigResult<AccessPolicies> {
        self.load_with(AssertionRegistry::builtin())
    }

    /// Resolve every record through `registry`, validate every policy and
    /// freeze the result. Malformed records abort immediately; validation
    /// problems are collected across the whole document first.
    pub fn load_with(&self, registry: &AssertionRegistry) -> ConfigResult<AccessPolicies> {
        let root = ValidationContext::default();
        let mut errors = Vec::new();

        let document = resolve(self.access.as_ref(), registry)?;
        document.validate(&mut errors, &root.child("access"));

        let mut templates = BTreeMap::new();
        for (name, template) in &self.templates {
            let own = resolve(template.access.as_ref(), registry)?;
            own.validate(&mut errors, &root.child("templates").child(name).child("access"));
            let effective: Arc<dyn AccessAssertion> =
                Arc::new(AndAccessAssertion::with_predicates(vec![document.clone(), own.clone()]));
            templates.insert(name.clone(), TemplatePolicy { own, effective });
        }

        tprintln!("config.load templates={} errors={}", templates.len(), errors.len());
        if !errors.is_empty() {
            for e in &errors {
                warn!(target: "printguard::config", "invalid access policy at {}", e);
            }
            return Err(ConfigError::Invalid(errors));
        }
        info!(
            target: "printguard::config",
            "access configuration loaded: document policy '{}', {} template(s)",
            document.kind(),
            templates.len()
        );
        Ok(AccessPolicies { document, templates })
    }
}

fn resolve(record: Option<&AssertionRecord>, registry: &AssertionRegistry) -> ConfigResult<Arc<dyn AccessAssertion>> {
    match record {
        Some(r) => Ok(Arc::from(registry.unmarshal(r)?)),
        None => Ok(Arc::new(AlwaysAllowAssertion)),
    }
}

#[derive(Debug, Clone)]
struct TemplatePolicy {
    /// As configured on the template; kept for persistence.
    own: Arc<dyn AccessAssertion>,
    /// Document policy AND template policy.
    effective: Arc<dyn AccessAssertion>,
}

/// Validated, immutable policies of one configuration document.
#[derive(Debug, Clone)]
pub struct AccessPolicies {
    document: Arc<dyn AccessAssertion>,
    templates: BTreeMap<String, TemplatePolicy>,
}

impl AccessPolicies {
    /// Check an action guarded by the document-wide policy only.
    pub fn assert_access(&self, ctx: &SecurityContext, action: &str, resource: &str) -> AccessResult<()> {
        self.document.assert_access(ctx, action, resource)
    }

    /// Check use of `template`: the document policy and the template policy must both grant.
    pub fn assert_template_access(&self, ctx: &SecurityContext, template: &str, resource: &str) -> AccessResult<()> {
        let policy = self
            .templates
            .get(template)
            .ok_or_else(|| AccessError::UnknownTemplate(template.to_string()))?;
        policy.effective.assert_access(ctx, &format!("use template '{template}'"), resource)
    }

    pub fn document_policy(&self) -> &Arc<dyn AccessAssertion> {
        &self.document
    }

    pub fn template_names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Marshal the loaded policies back into a document that reloads to the same decisions.
    pub fn to_config(&self) -> ConfigResult<AccessConfig> {
        let mut templates = BTreeMap::new();
        for (name, t) in &self.templates {
            templates.insert(name.clone(), TemplateConfig { access: Some(AssertionRegistry::marshal(t.own.as_ref())?) });
        }
        Ok(AccessConfig { access: Some(AssertionRegistry::marshal(self.document.as_ref())?), templates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Principal;

    fn user(roles: &[&str]) -> SecurityContext {
        SecurityContext::authenticated(Principal::new("tester", roles.iter().copied()))
    }

    #[test]
    fn empty_document_is_open() {
        let policies = AccessConfig::from_json_str("{}").unwrap().load().unwrap();
        assert!(policies.assert_access(&SecurityContext::anonymous(), "print", "report").is_ok());
        assert_eq!(policies.document_policy().kind(), "always");
        assert_eq!(policies.template_names().count(), 0);
    }

    #[test]
    fn template_narrows_document_policy() {
        let cfg = AccessConfig::from_json_str(
            r#"{
                "access": {"type": "role", "roles": ["ROLE_USER"]},
                "templates": {
                    "open": {},
                    "restricted": {"access": {"type": "role", "roles": ["ROLE_PRINT"]}}
                }
            }"#,
        )
        .unwrap();
        let policies = cfg.load().unwrap();

        assert!(policies.assert_template_access(&user(&["ROLE_USER"]), "open", "r").is_ok());
        let err = policies.assert_template_access(&user(&["ROLE_USER"]), "restricted", "r").unwrap_err();
        assert!(matches!(err, AccessError::AccessDenied { .. }));
        // Template grants alone do not bypass the document policy.
        let err = policies.assert_template_access(&user(&["ROLE_PRINT"]), "restricted", "r").unwrap_err();
        assert!(matches!(err, AccessError::AccessDenied { .. }));
        assert!(policies.assert_template_access(&user(&["ROLE_USER", "ROLE_PRINT"]), "restricted", "r").is_ok());
    }

    #[test]
    fn unknown_template_is_reported() {
        let policies = AccessConfig::default().load().unwrap();
        let err = policies.assert_template_access(&user(&[]), "A3", "r").unwrap_err();
        assert_eq!(err, AccessError::UnknownTemplate("A3".into()));
    }

    #[test]
    fn validation_errors_are_aggregated_across_document() {
        let cfg = AccessConfig::from_json_str(
            r#"{
                "access": {"type": "role"},
                "templates": {
                    "a": {"access": {"type": "role", "roles": null}},
                    "b": {"access": {"type": "and"}},
                    "c": {"access": {"type": "role", "roles": []}}
                }
            }"#,
        )
        .unwrap();
        let err = cfg.load().unwrap_err();
        let paths: Vec<&str> = err.validation_errors().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["access", "templates.a.access", "templates.b.access"]);
    }

    #[test]
    fn malformed_record_aborts_load() {
        let cfg = AccessConfig::from_json_str(r#"{"access": {"type": "role", "roles": "ROLE_USER"}}"#).unwrap();
        assert!(matches!(cfg.load(), Err(ConfigError::InvalidValue { .. })));
        let cfg = AccessConfig::from_json_str(r#"{"access": {"type": "ldap"}}"#).unwrap();
        assert!(matches!(cfg.load(), Err(ConfigError::UnknownKind(_))));
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        assert!(matches!(AccessConfig::from_json_str("{"), Err(ConfigError::Json(_))));
    }
}
