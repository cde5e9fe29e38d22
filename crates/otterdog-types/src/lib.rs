//! Shared vocabulary for the otterdog reconciliation engine: the tri-state
//! attribute type, the field-diff map, live-patch counters, the error
//! taxonomy, and small duration-parsing helpers reused by every config
//! struct in the workspace.

pub mod attr;
pub mod diff;
pub mod duration;
pub mod error;
pub mod patch;

pub use attr::{Attr, UnorderedList};
pub use diff::{Change, FieldMap};
pub use error::{ErrorClass, OtterdogError, Result, Severity, ValidationContext, ValidationFailure};
pub use patch::{DiffStatus, PatchType};
