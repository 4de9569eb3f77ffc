//! Runtime settings for the printguard binaries: environment first, CLI flags override.

use std::env;
use std::path::PathBuf;

pub const CONFIG_ENV: &str = "PRINTGUARD_CONFIG";
pub const LOG_ENV: &str = "PRINTGUARD_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    /// Access configuration document to load.
    pub config_path: Option<PathBuf>,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self { config_path: None, log_filter: "info".to_string() }
    }
}

impl GateSettings {
    pub fn from_env() -> Self {
        let mut s = Self::default();
        if let Ok(p) = env::var(CONFIG_ENV) {
            if !p.trim().is_empty() { s.config_path = Some(PathBuf::from(p)); }
        }
        if let Ok(f) = env::var(LOG_ENV) {
            if !f.trim().is_empty() { s.log_filter = f; }
        }
        s
    }

    /// Overlay `--config <path>` and `--log <filter>` from `args`.
    pub fn apply_args(mut self, args: &[String]) -> Self {
        if let Some(p) = flag_value(args, "--config") { self.config_path = Some(PathBuf::from(p)); }
        if let Some(f) = flag_value(args, "--log") { self.log_filter = f.to_string(); }
        self
    }
}

/// Value following `flag`, if any.
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].as_str());
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn args_override_defaults() {
        let s = GateSettings::default().apply_args(&args(&["check", "--config", "print.json", "--log", "debug"]));
        assert_eq!(s.config_path, Some(PathBuf::from("print.json")));
        assert_eq!(s.log_filter, "debug");
    }

    #[test]
    fn dangling_flag_is_ignored() {
        let s = GateSettings::default().apply_args(&args(&["--config"]));
        assert_eq!(s, GateSettings::default());
    }

    #[test]
    fn flag_value_picks_first_match() {
        let a = args(&["--user", "alice", "--user", "bob"]);
        assert_eq!(flag_value(&a, "--user"), Some("alice"));
        assert_eq!(flag_value(&a, "--roles"), None);
    }
}
