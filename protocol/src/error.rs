//! Validation errors shared by every record builder.
//!
//! Builders in this crate are consuming (`builder.field(x).build()`), so a
//! builder can't be reused after `build()`. What they *can* do is be
//! incomplete, and that's what [`BuilderError`] reports.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuilderError {
    /// A mandatory field was never set.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A field was set to an empty string or an empty list where content is
    /// required.
    #[error("field must not be empty: {0}")]
    EmptyField(&'static str),

    /// A view transfer names fewer new owners than the configured minimum.
    #[error("too few owner hashes: need at least {min}, got {got}")]
    TooFewOwners { min: usize, got: usize },

    /// A field is present but violates a domain rule.
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
