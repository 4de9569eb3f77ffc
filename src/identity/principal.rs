use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Authenticated identity plus the roles (authorities) granted to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new<U, I, S>(user_id: U, roles: I) -> Self
    where
        U: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { user_id: user_id.into(), roles: roles.into_iter().map(Into::into).collect() }
    }

    /// Role labels compare exactly; `ROLE_USER` and `role_user` are different roles.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// True when at least one granted role is in `required`.
    pub fn has_any_role(&self, required: &BTreeSet<String>) -> bool {
        self.roles.iter().any(|r| required.contains(r))
    }
}
