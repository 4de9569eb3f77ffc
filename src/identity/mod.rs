//! Caller identity as seen by the access gate.
//! The security context is passed explicitly into every decision; nothing here
//! is thread-local or global.

mod principal;
mod security_context;

pub use principal::Principal;
pub use security_context::SecurityContext;
