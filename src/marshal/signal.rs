//! Raising host error conditions from native code
//!
//! Signaling is terminal for the operation: both entry points leave a
//! condition pending (or find one already pending) and hand back the
//! [`PendingExit`] marker so the caller can return it up the stack. If the
//! environment dies while the payload is being built, the signal is
//! skipped and the original condition stays untouched.

use crate::env::{Env, PendingExit};
use crate::host::HostValue;
use crate::logging;

/// Condition symbol for type contract violations
const COND_WRONG_TYPE: &str = "wrong-type-argument";
/// Condition symbol for generic failures
const COND_ERROR: &str = "error";

impl Env<'_> {
    /// Signal `wrong-type-argument` naming the predicate that rejected
    /// `offending`
    ///
    /// The payload is the two-element list `(predicate offending)`.
    pub fn signal_wrong_type(&self, expected: &str, offending: HostValue) -> PendingExit {
        logging::log_signal(COND_WRONG_TYPE, expected);
        let _ = self.raise_wrong_type(expected, offending);
        PendingExit
    }

    /// Signal a generic `error` carrying `message`
    pub fn signal_error(&self, message: &str) -> PendingExit {
        logging::log_signal(COND_ERROR, message);
        let _ = self.raise_generic(message);
        PendingExit
    }

    fn raise_wrong_type(&self, expected: &str, offending: HostValue) -> Result<(), PendingExit> {
        self.ensure_clear()?;
        let predicate = self.guard(self.host().intern(expected))?;
        self.raise(COND_WRONG_TYPE, &[predicate, offending])
    }

    fn raise_generic(&self, message: &str) -> Result<(), PendingExit> {
        self.ensure_clear()?;
        let text = self.guard(self.host().make_string(message.as_bytes()))?;
        self.raise(COND_ERROR, &[text])
    }

    /// Build the payload list and inject the condition
    fn raise(&self, condition: &str, items: &[HostValue]) -> Result<(), PendingExit> {
        let list_fn = self.guard(self.host().intern("list"))?;
        let payload = self.guard(self.host().funcall(list_fn, items))?;
        let symbol = self.guard(self.host().intern(condition))?;
        self.host().non_local_exit_signal(symbol, payload);
        Ok(())
    }
}
