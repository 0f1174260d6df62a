//! Arbor Bridge - boundary layer between an editor host and native parsing code
//!
//! This crate marshals values between a dynamically-typed editor host and
//! native code wrapping a parsing library, and propagates failures through
//! the host's non-local exit mechanism without corrupting it.
//!
//! The ground rules, enforced everywhere:
//! - every handle from the host is opaque and re-validated at the boundary
//! - every host call is followed by an exit-state check
//! - once an exit is pending, no further host calls are made; the pending
//!   condition propagates unchanged as [`PendingExit`]

pub mod env;
pub mod host;
pub mod logging;
pub mod marshal;
pub mod mock;

// Re-export the boundary surface
pub use env::{Env, PendingExit};
pub use host::{ExitStatus, FunctionSpec, HostRuntime, HostValue, NativeCallback};
pub use marshal::{ExtractError, NativeKind};
