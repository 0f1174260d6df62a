//! Host value to native data extraction
//!
//! Strings cross the boundary with the host's two-phase copy protocol:
//! one call to learn the size, one to fill the buffer. The buffer is a
//! plain `Vec<u8>` owned by the caller, so every failure path releases it
//! without bookkeeping.

use crate::env::{Env, PendingExit};
use crate::host::HostValue;
use crate::logging;

use super::classify::{PRED_BUFFER, PRED_INTEGER, PRED_STRING};

/// Why a string extraction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractError {
    /// A host condition is pending: the value had the wrong type, the
    /// copy failed, or an exit was already in flight
    Exit(PendingExit),
    /// Native allocation failed; no host condition was raised
    Alloc {
        /// Size the host reported, in bytes
        requested: usize,
    },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exit(_) => write!(f, "host exit pending during extraction"),
            Self::Alloc { requested } => {
                write!(f, "failed to allocate {} bytes for string contents", requested)
            }
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exit(inner) => Some(inner),
            Self::Alloc { .. } => None,
        }
    }
}

impl From<PendingExit> for ExtractError {
    #[inline]
    fn from(inner: PendingExit) -> Self {
        Self::Exit(inner)
    }
}

impl Env<'_> {
    /// Copy a host string's bytes into a fresh owned buffer
    ///
    /// Signals `wrong-type-argument` if `value` is not a string. The
    /// allocation is fallible and fails without touching the host. The
    /// size reported by the copy phase is rechecked against the
    /// allocation: a larger report means the host broke its own contract
    /// and is answered with a generic error condition; a smaller one
    /// truncates the buffer to what was actually written.
    pub fn extract_string(&self, value: HostValue) -> Result<Vec<u8>, ExtractError> {
        if !self.check_kind(value, PRED_STRING)? {
            return Err(self.signal_wrong_type(PRED_STRING, value).into());
        }

        let mut size = 0usize;
        let sized = self
            .guard(self.host().copy_string_contents(value, None, &mut size))?;
        if !sized {
            // False with no condition pending is a host contract breach
            return Err(self.signal_error("host refused the string size query").into());
        }

        let mut buffer: Vec<u8> = Vec::new();
        if buffer.try_reserve_exact(size).is_err() {
            logging::log_alloc_refused(size);
            return Err(ExtractError::Alloc { requested: size });
        }
        buffer.resize(size, 0);

        if size > 0 {
            let mut copied = size;
            let filled = self.guard(self.host().copy_string_contents(
                value,
                Some(&mut buffer[..]),
                &mut copied,
            ))?;
            if !filled {
                return Err(self.signal_error("host refused the string copy").into());
            }
            if copied > size {
                return Err(self
                    .signal_error("host reported more string bytes than were allocated")
                    .into());
            }
            buffer.truncate(copied);
        }

        logging::log_string_copied(buffer.len());
        Ok(buffer)
    }

    /// Unbox a host integer, signaling `wrong-type-argument` on mismatch
    pub fn extract_integer(&self, value: HostValue) -> Result<i64, PendingExit> {
        if !self.check_kind(value, PRED_INTEGER)? {
            return Err(self.signal_wrong_type(PRED_INTEGER, value));
        }
        self.guard(self.host().extract_integer(value))
    }

    /// Check that `value` is a live buffer and pass the handle through
    ///
    /// Buffers stay host-owned; extraction is only the type contract.
    pub fn extract_buffer(&self, value: HostValue) -> Result<HostValue, PendingExit> {
        if !self.check_kind(value, PRED_BUFFER)? {
            return Err(self.signal_wrong_type(PRED_BUFFER, value));
        }
        Ok(value)
    }

    /// Read record slot `index` (slot 0 is the tag) via the host's `aref`
    ///
    /// No shape validation happens here; record-kind checks run first on
    /// every ingress path.
    pub fn record_field(
        &self,
        record: HostValue,
        index: usize,
    ) -> Result<HostValue, PendingExit> {
        self.ensure_clear()?;
        let aref = self.guard(self.host().intern("aref"))?;
        let slot = self.guard(self.host().make_integer(index as i64))?;
        self.guard(self.host().funcall(aref, &[record, slot]))
    }
}
