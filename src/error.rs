//! Errors reported by the pooler.
//!
//! Only caller mistakes are errors: bad parameters at construction, or inputs and state
//! slices with the wrong shape. Degenerate numeric states (no connected synapses, empty
//! neighborhoods, zero duty-cycle floors) are handled inside the algorithm and never surface here.

use thiserror::Error;

/// Main error type for pooler operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A construction parameter is out of its valid range.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },

    /// Input or column dimensions are empty, contain zero, or do not match each other.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// The input vector passed to `compute` does not have `num_inputs` bits.
    #[error("input vector has {actual} bits, expected {expected}")]
    InputSizeMismatch { expected: usize, actual: usize },

    /// A column index is outside `0..num_columns`.
    #[error("column {column} out of range (num columns: {num_columns})")]
    ColumnOutOfRange { column: usize, num_columns: usize },

    /// A state slice handed to a setter has the wrong length.
    #[error("'{name}' has length {actual}, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
