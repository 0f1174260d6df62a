//! Boundary marshaling between host values and native data
//!
//! Design: every conversion re-validates its input at the boundary, and
//! every host call is followed by an exit-state check; once an exit is
//! pending no component makes another host call.
//!
//! Architecture:
//! - `classify.rs` - predicate-based value classification
//! - `extract.rs` - host value to native data (two-phase string copy)
//! - `signal.rs` - raising wrong-type and generic error conditions
//! - `record.rs` - tagged records carrying native pointers
//! - `register.rs` - exposing native functions under host names
//!
//! All operations live as methods on [`crate::env::Env`]; the files group
//! them by concern.

mod classify;
mod extract;
mod record;
mod register;
mod signal;

pub use classify::{PRED_BUFFER, PRED_INTEGER, PRED_RECORD, PRED_STRING};
pub use extract::ExtractError;
pub use record::NativeKind;
