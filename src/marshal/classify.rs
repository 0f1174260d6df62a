//! Value classification through host predicates
//!
//! The host's type predicates are ordinary functions, so classification
//! interns the predicate name, funcalls it on the value, and compares the
//! verdict to the `t` singleton by host identity. Anything that is not
//! identical to `t` counts as a mismatch.

use crate::env::{Env, PendingExit};
use crate::host::HostValue;
use crate::logging;

/// Predicate symbol for strings
pub const PRED_STRING: &str = "stringp";
/// Predicate symbol for integers
pub const PRED_INTEGER: &str = "integerp";
/// Predicate symbol for live buffers
pub const PRED_BUFFER: &str = "bufferp";
/// Predicate symbol for records
pub const PRED_RECORD: &str = "recordp";

impl Env<'_> {
    /// Classify `value` with the host predicate named `predicate`
    ///
    /// A pending exit reads as `false`: once the environment is unwinding
    /// there is no legal way to learn the type. Callers that must tell a
    /// mismatch from a dead environment use `check_kind` instead.
    pub fn is_kind(&self, value: HostValue, predicate: &str) -> bool {
        self.check_kind(value, predicate).unwrap_or(false)
    }

    /// Fallible classification
    ///
    /// `Ok(false)` is a genuine mismatch; `Err(PendingExit)` means the
    /// probe itself died. Only the `Ok(false)` arm may be answered with a
    /// wrong-type signal.
    pub(crate) fn check_kind(
        &self,
        value: HostValue,
        predicate: &str,
    ) -> Result<bool, PendingExit> {
        self.ensure_clear()?;
        let pred = self.guard(self.host().intern(predicate))?;
        let verdict = self.guard(self.host().funcall(pred, &[value]))?;
        let matched = self.guard(self.host().eq(verdict, self.t()))?;
        if !matched {
            logging::log_classify_miss(predicate);
        }
        Ok(matched)
    }
}
