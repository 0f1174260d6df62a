//! Per-environment context and exit-state discipline
//!
//! Design: one [`Env`] per host environment, built at module load. It
//! caches the `t`/`nil` singletons as global refs so classification never
//! re-interns them, and it owns the one rule everything else hangs off:
//! every host call is followed by [`Env::guard`] before its result is
//! trusted. Nothing here lives in a static; a multi-threaded host hands
//! each thread its own environment, and each gets its own `Env`.

use tracing::trace;

use crate::host::{HostRuntime, HostValue};
use crate::logging;

/// Marker error: a non-local exit is pending in the host
///
/// Once this is returned the only legal continuation is upward
/// propagation. Making further host calls before the host unwinds is
/// undefined at the module boundary, so no code in this crate does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingExit;

impl std::fmt::Display for PendingExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "non-local exit pending in the host runtime")
    }
}

impl std::error::Error for PendingExit {}

/// Per-environment context: one host plus the cached singletons
pub struct Env<'e> {
    host: &'e dyn HostRuntime,
    t: HostValue,
    nil: HostValue,
}

impl<'e> Env<'e> {
    /// Build a context for `host`, caching the `t` and `nil` singletons
    ///
    /// Fails if the host rejects interning or promoting either symbol; a
    /// partially initialized context is never returned.
    pub fn init(host: &'e dyn HostRuntime) -> Result<Self, PendingExit> {
        let t = Self::global_symbol(host, "t")?;
        let nil = Self::global_symbol(host, "nil")?;
        logging::log_env_init();
        Ok(Self { host, t, nil })
    }

    /// Intern `name` and promote it to a global ref, checking the exit
    /// state after each step
    fn global_symbol(host: &dyn HostRuntime, name: &str) -> Result<HostValue, PendingExit> {
        let symbol = host.intern(name);
        if !host.non_local_exit_check().is_clear() {
            return Err(PendingExit);
        }
        let global = host.make_global_ref(symbol);
        if !host.non_local_exit_check().is_clear() {
            return Err(PendingExit);
        }
        Ok(global)
    }

    /// The host runtime this context wraps
    #[inline]
    pub fn host(&self) -> &dyn HostRuntime {
        self.host
    }

    /// Cached `t` singleton
    #[inline]
    pub fn t(&self) -> HostValue {
        self.t
    }

    /// Cached `nil` singleton
    #[inline]
    pub fn nil(&self) -> HostValue {
        self.nil
    }

    /// True iff the host has a non-local exit in flight
    #[inline]
    pub fn pending_exit(&self) -> bool {
        !self.host.non_local_exit_check().is_clear()
    }

    /// Validate the result of the host call that just ran
    ///
    /// `produced` passes through untouched when the environment is clear
    /// and is dropped unseen when an exit is pending. Also used with `()`
    /// as a clean-environment precondition at operation entry.
    #[inline]
    pub fn guard<T>(&self, produced: T) -> Result<T, PendingExit> {
        if self.pending_exit() {
            trace!(event = "guard_tripped", "discarding host result");
            Err(PendingExit)
        } else {
            Ok(produced)
        }
    }

    /// Clean-environment precondition for boundary operations
    #[inline]
    pub(crate) fn ensure_clear(&self) -> Result<(), PendingExit> {
        self.guard(())
    }
}
