pub mod access;
pub mod config;
pub mod error;
pub mod identity;
pub mod settings;

pub use access::{
    AccessAssertion, AlwaysAllowAssertion, AndAccessAssertion, AssertionRecord, AssertionRegistry,
    RoleAccessAssertion, ValidationContext,
};
pub use config::{AccessConfig, AccessPolicies, TemplateConfig};
pub use error::{AccessError, AccessResult, ConfigError, ConfigResult, ValidationError};
pub use identity::{Principal, SecurityContext};
pub use settings::GateSettings;

// Test-only printing helper: expands to eprintln! during tests and debug builds.
// Usage: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds, provide a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        // Preserve formatting checks in release without producing code
        if false { let _ = format!($($arg)*); }
    });
}
