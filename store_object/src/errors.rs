//! Error types for schema definition, query construction and execution

use crate::validation::IdentifierError;
use thiserror::Error;
use type_mapping::{DecodeError, ValidationError};

/// Invalid table declaration. Raised while defining schemas, before any
/// statement is issued.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Table '{table}' declares column '{column}' more than once")]
    DuplicateColumnName { table: String, column: String },

    #[error("Primary key '{column}' is not a column of table '{table}'")]
    MissingPrimaryKey { table: String, column: String },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    #[error("Column '{column}' cannot auto-increment: {reason}")]
    InvalidAutoIncrement { column: String, reason: String },

    #[error("Column '{column}' has an array of unsupported element type {domain}")]
    UnsupportedArrayElement { column: String, domain: String },

    #[error("Default value of column '{column}' is invalid: {source}")]
    InvalidDefault {
        column: String,
        #[source]
        source: ValidationError,
    },

    #[error("Column '{column}' references unknown column '{target}'")]
    InvalidReference { column: String, target: String },
}

/// A query or command that cannot be turned into a statement
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Page number must be at least 1, got {0}")]
    InvalidPage(i64),

    #[error("Page size must be at least 1, got {0}")]
    InvalidPageSize(i64),

    #[error("Malformed condition: {0}")]
    MalformedCondition(String),

    #[error("Unknown column '{column}' in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    PrimaryKey,
    NotNull,
    ForeignKey,
}

/// Failure reported by a statement executor
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("{kind:?} constraint violated on table '{table}': {message}")]
    Constraint {
        kind: ConstraintKind,
        table: String,
        message: String,
    },

    #[error("Table '{0}' does not exist")]
    UnknownTable(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A computed value the target column cannot hold
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl ExecutorError {
    pub fn constraint(kind: ConstraintKind, table: &str, message: impl Into<String>) -> Self {
        ExecutorError::Constraint {
            kind,
            table: table.to_string(),
            message: message.into(),
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            ExecutorError::Constraint {
                kind: ConstraintKind::PrimaryKey,
                ..
            }
        )
    }
}

impl From<ExecutorError> for DataError {
    fn from(error: ExecutorError) -> Self {
        match error {
            ExecutorError::Validation(e) => DataError::Validation(e),
            other => DataError::Executor(other),
        }
    }
}

/// Umbrella error returned by store operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Executor(ExecutorError),

    #[error("Store returned no key for table '{0}'")]
    MissingKey(String),
}

impl DataError {
    /// The validation failure, if this error is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            DataError::Validation(e) => Some(e),
            _ => None,
        }
    }
}
