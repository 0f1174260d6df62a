//! Host runtime boundary
//!
//! Defines the primitive surface the editor host exposes to native code.
//! Everything the host hands out is an opaque [`HostValue`]; this crate
//! never dereferences one, it only passes handles back through the
//! [`HostRuntime`] operations.

use core::ffi::c_void;

use crate::env::Env;

/// Opaque handle to a value owned by the host runtime
///
/// Valid only for the duration of the host call that produced it unless
/// promoted with [`HostRuntime::make_global_ref`]. Identity comparison goes
/// through [`HostRuntime::eq`]; two distinct handles may name one object,
/// so the type deliberately has no `PartialEq`.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct HostValue {
    raw: *mut c_void,
}

impl HostValue {
    /// Wrap a raw handle received from the host
    #[inline]
    pub const fn from_raw(raw: *mut c_void) -> Self {
        Self { raw }
    }

    /// Raw handle for handing back to the host
    #[inline]
    pub const fn as_raw(self) -> *mut c_void {
        self.raw
    }
}

impl core::fmt::Debug for HostValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "HostValue({:p})", self.raw)
    }
}

/// Outcome of the host's pending-exit probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal control flow; host calls are legal
    Returned,
    /// An error condition has been signaled and is unwinding
    Signaled,
    /// A non-error `throw` is unwinding
    Thrown,
}

impl ExitStatus {
    /// True unless a non-local exit is in flight
    #[inline]
    pub const fn is_clear(self) -> bool {
        matches!(self, Self::Returned)
    }
}

/// Native implementation of a host-callable function
///
/// Receives the per-call environment, the evaluated arguments, and the
/// user-data pointer the function was registered with.
pub type NativeCallback = fn(&Env<'_>, &[HostValue], *mut c_void) -> HostValue;

/// Everything the host needs to expose one native function
#[derive(Clone, Copy)]
pub struct FunctionSpec {
    /// Fewest arguments the host will accept for this function
    pub min_arity: usize,
    /// Most arguments the host will accept for this function
    pub max_arity: usize,
    /// Documentation string shown by the host's help system
    pub doc: &'static str,
    /// Native code to run when the function is called
    pub callback: NativeCallback,
    /// Opaque pointer handed back to `callback` on every call
    pub data: *mut c_void,
}

impl FunctionSpec {
    /// Spec for a fixed-arity function with no user data
    #[inline]
    pub const fn new(arity: usize, doc: &'static str, callback: NativeCallback) -> Self {
        Self {
            min_arity: arity,
            max_arity: arity,
            doc,
            callback,
            data: core::ptr::null_mut(),
        }
    }

    /// Widen the accepted argument count to `min..=max`
    #[inline]
    pub const fn with_arity(mut self, min: usize, max: usize) -> Self {
        self.min_arity = min;
        self.max_arity = max;
        self
    }

    /// Attach a user-data pointer passed back on every call
    #[inline]
    pub const fn with_data(mut self, data: *mut c_void) -> Self {
        self.data = data;
        self
    }
}

// Manual Debug since the callback field is a function pointer
impl core::fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("min_arity", &self.min_arity)
            .field("max_arity", &self.max_arity)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

/// Primitive operations the host runtime exposes to native code
///
/// Mirrors the module ABI of the editor host. The host keeps its own
/// interior state, so every method takes `&self`. After any call that can
/// fail inside the host, the caller must consult [`non_local_exit_check`]
/// before trusting the result; handles produced while an exit is pending
/// are unspecified and must be discarded.
///
/// Host-level functions with no dedicated primitive (`list`, `length`,
/// `aref`, `record`, `defalias`) are reached through [`intern`] plus
/// [`funcall`].
///
/// [`non_local_exit_check`]: HostRuntime::non_local_exit_check
/// [`intern`]: HostRuntime::intern
/// [`funcall`]: HostRuntime::funcall
pub trait HostRuntime {
    /// Resolve a symbol by name
    fn intern(&self, name: &str) -> HostValue;

    /// Box a signed integer
    fn make_integer(&self, value: i64) -> HostValue;

    /// Unbox a signed integer; signals a type condition if `value` is not
    /// an integer, making the result unspecified
    fn extract_integer(&self, value: HostValue) -> i64;

    /// Box a byte string
    fn make_string(&self, contents: &[u8]) -> HostValue;

    /// Two-phase string copy
    ///
    /// With `dest = None`, writes the string's byte length into `size` and
    /// returns true. With a destination buffer, copies the contents into
    /// it, rewrites `size` to the number of bytes used, and returns true.
    /// False reports failure, normally with a condition left pending.
    fn copy_string_contents(
        &self,
        source: HostValue,
        dest: Option<&mut [u8]>,
        size: &mut usize,
    ) -> bool;

    /// Call `function` with the given arguments
    fn funcall(&self, function: HostValue, args: &[HostValue]) -> HostValue;

    /// Host identity comparison
    fn eq(&self, a: HostValue, b: HostValue) -> bool;

    /// Wrap a native callback in a host function object
    fn make_function(&self, spec: FunctionSpec) -> HostValue;

    /// Probe for a pending non-local exit
    fn non_local_exit_check(&self) -> ExitStatus;

    /// Raise `condition` with `payload`, leaving the environment pending
    fn non_local_exit_signal(&self, condition: HostValue, payload: HostValue);

    /// Promote a handle so it survives beyond the current call
    fn make_global_ref(&self, value: HostValue) -> HostValue;
}
