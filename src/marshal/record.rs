//! Tagged records carrying native pointers
//!
//! Native resources cross into the host as ordinary records whose slot 0
//! is a tag symbol and whose slot 1 is the resource address boxed as a
//! host integer. Host code can forge or mutate records freely, so the
//! shape is re-validated on every crossing back; the payload slot of a
//! record that failed validation is never read.

use core::ffi::c_void;

use crate::env::{Env, PendingExit};
use crate::host::HostValue;
use crate::logging;

use super::classify::PRED_RECORD;

/// Native resource kinds that cross the host boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Language,
    Parser,
    Tree,
    Node,
    Cursor,
}

impl NativeKind {
    /// Tag symbol stored in slot 0 of the wrapping record
    #[inline]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Language => "TSLanguage",
            Self::Parser => "TSParser",
            Self::Tree => "TSTree",
            Self::Node => "TSNode",
            Self::Cursor => "TSTreeCursor",
        }
    }

    /// Host-visible predicate named in wrong-type reports
    #[inline]
    pub const fn predicate(self) -> &'static str {
        match self {
            Self::Language => "tree-sitter-language-p",
            Self::Parser => "tree-sitter-parser-p",
            Self::Tree => "tree-sitter-tree-p",
            Self::Node => "tree-sitter-node-p",
            Self::Cursor => "tree-sitter-cursor-p",
        }
    }

    /// Payload slots after the tag
    #[inline]
    pub const fn field_count(self) -> usize {
        1
    }
}

impl Env<'_> {
    /// Shape-check `value` as a tagged record with `field_count + 1`
    /// slots and the given tag symbol in slot 0
    ///
    /// A pending exit reads as invalid, like the classifier.
    pub fn is_record_of_kind(&self, value: HostValue, tag: &str, field_count: usize) -> bool {
        self.check_record_shape(value, tag, field_count)
            .unwrap_or(false)
    }

    /// Fallible record shape check; checks run in order and stop at the
    /// first failure
    pub(crate) fn check_record_shape(
        &self,
        value: HostValue,
        tag: &str,
        field_count: usize,
    ) -> Result<bool, PendingExit> {
        if !self.check_kind(value, PRED_RECORD)? {
            return Ok(false);
        }
        let length = self.record_length(value)?;
        if length != field_count + 1 {
            logging::log_record_reject(tag, "length");
            return Ok(false);
        }
        let slot0 = self.record_field(value, 0)?;
        let wanted = self.guard(self.host().intern(tag))?;
        let matched = self.guard(self.host().eq(slot0, wanted))?;
        if !matched {
            logging::log_record_reject(tag, "tag");
        }
        Ok(matched)
    }

    /// Box `ptr` for the host as a tagged record of `kind`
    pub fn wrap_native(
        &self,
        kind: NativeKind,
        ptr: *mut c_void,
    ) -> Result<HostValue, PendingExit> {
        self.ensure_clear()?;
        let record_fn = self.guard(self.host().intern("record"))?;
        let tag = self.guard(self.host().intern(kind.tag()))?;
        let address = self.guard(self.host().make_integer(ptr as usize as i64))?;
        let wrapped = self.guard(self.host().funcall(record_fn, &[tag, address]))?;
        logging::log_native_wrapped(kind.tag());
        Ok(wrapped)
    }

    /// Unbox the native pointer from a record of `kind`
    ///
    /// Signals `wrong-type-argument` under the kind's predicate when the
    /// shape is wrong; the payload slot is only read once the shape
    /// holds, and a non-integer payload fails through the host's own
    /// extraction condition.
    pub fn native_ptr(
        &self,
        kind: NativeKind,
        value: HostValue,
    ) -> Result<*mut c_void, PendingExit> {
        if !self.check_record_shape(value, kind.tag(), kind.field_count())? {
            return Err(self.signal_wrong_type(kind.predicate(), value));
        }
        let slot = self.record_field(value, 1)?;
        let address = self.guard(self.host().extract_integer(slot))?;
        Ok(address as usize as *mut c_void)
    }

    /// Record slot count via the host's `length`
    fn record_length(&self, value: HostValue) -> Result<usize, PendingExit> {
        let length_fn = self.guard(self.host().intern("length"))?;
        let boxed = self.guard(self.host().funcall(length_fn, &[value]))?;
        let length = self.guard(self.host().extract_integer(boxed))?;
        Ok(usize::try_from(length).unwrap_or(0))
    }
}
