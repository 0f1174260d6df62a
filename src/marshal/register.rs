//! Exposing native functions under host-visible names
//!
//! Registration wraps the native callback in a host function object and
//! binds it with `defalias`, the host's normal definition path. Binding
//! through `defalias` makes re-registration a plain replacement: the
//! latest binding wins and earlier ones are unreachable.

use crate::env::{Env, PendingExit};
use crate::host::FunctionSpec;
use crate::logging;

impl Env<'_> {
    /// Expose `spec` to host code under `name`
    ///
    /// Reports plain go/no-go; on failure the host condition carrying the
    /// detail is already pending, so callers at module load just stop.
    pub fn register(&self, name: &str, spec: FunctionSpec) -> bool {
        match self.try_register(name, spec) {
            Ok(()) => {
                logging::log_registered(name);
                true
            }
            Err(PendingExit) => {
                logging::log_register_failed(name);
                false
            }
        }
    }

    fn try_register(&self, name: &str, spec: FunctionSpec) -> Result<(), PendingExit> {
        self.ensure_clear()?;
        let function = self.guard(self.host().make_function(spec))?;
        let symbol = self.guard(self.host().intern(name))?;
        let defalias = self.guard(self.host().intern("defalias"))?;
        self.guard(self.host().funcall(defalias, &[symbol, function]))?;
        Ok(())
    }
}
