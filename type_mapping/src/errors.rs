//! Error types for value validation and decoding

use thiserror::Error;

/// A value was rejected by its column's validator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Column '{column}' requires a value")]
    MissingRequiredValue { column: String },

    #[error("Column '{column}' expects {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Value for column '{column}' is too long: {actual} bytes (max {max})")]
    TooLong {
        column: String,
        max: u32,
        actual: usize,
    },

    #[error("Value for column '{column}' must be exactly {expected} characters, got {actual}")]
    LengthMismatch {
        column: String,
        expected: u32,
        actual: usize,
    },

    #[error("Value {value} is out of range for column '{column}' ({domain})")]
    OutOfRange {
        column: String,
        value: String,
        domain: String,
    },

    #[error("Value {value} exceeds decimal({precision}, {scale}) for column '{column}'")]
    PrecisionExceeded {
        column: String,
        value: String,
        precision: u8,
        scale: u8,
    },

    #[error("'{value}' is not a variant of the enumeration in column '{column}'")]
    UnknownVariant { column: String, value: String },

    #[error("Array for column '{column}' has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        column: String,
        expected: u8,
        found: usize,
    },

    #[error("Array for column '{column}' is not rectangular")]
    RaggedArray { column: String },

    #[error("Invalid value for column '{column}': {reason}")]
    Invalid { column: String, reason: String },
}

impl ValidationError {
    /// Name of the column whose value was rejected
    pub fn column(&self) -> &str {
        match self {
            ValidationError::MissingRequiredValue { column }
            | ValidationError::TypeMismatch { column, .. }
            | ValidationError::TooLong { column, .. }
            | ValidationError::LengthMismatch { column, .. }
            | ValidationError::OutOfRange { column, .. }
            | ValidationError::PrecisionExceeded { column, .. }
            | ValidationError::UnknownVariant { column, .. }
            | ValidationError::DimensionMismatch { column, .. }
            | ValidationError::RaggedArray { column }
            | ValidationError::Invalid { column, .. } => column,
        }
    }
}

/// A stored value could not be turned back into its domain value
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Cannot decode {found} as {domain}")]
    TypeMismatch { domain: String, found: String },

    #[error("Malformed array literal '{literal}': {reason}")]
    MalformedArray { literal: String, reason: String },

    #[error("Enumeration ordinal {0} is out of range")]
    UnknownOrdinal(i64),

    #[error("Row has no column '{0}'")]
    MissingColumn(String),
}
