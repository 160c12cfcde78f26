//! Store Object - data-access layer for rowkeeper
//!
//! Schemas describe tables, the codec validates entity values against them,
//! conditions and query builders describe reads and writes, and a
//! `StatementExecutor` runs the resulting statements against PostgreSQL or
//! an in-memory store.

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod codec;
pub mod errors;
pub mod executor;
pub mod generic_store;
pub mod prelude;
pub mod query_builder;
pub mod record;
pub mod schema;
pub mod statement;
pub mod traits;
pub mod validation;

pub use errors::{ConstraintKind, DataError, ExecutorError, QueryError, SchemaError};
pub use executor::{IsolationLevel, MemoryExecutor, PgExecutor, StatementExecutor, TransactionOptions};
pub use generic_store::GenericStore;
pub use query_builder::{
    Condition, Expr, GroupBy, JoinClause, JoinType, Page, QueryBuilder, SelectField, SortOrder,
    UpdateSet, UpsertClause,
};
pub use record::Record;
pub use schema::{Column, DefaultExpression, Schema};
pub use statement::{Statement, StatementOutcome};
pub use traits::{Entity, PrimaryKey, StoreObject};
pub use validation::{quote_identifier, validate_identifier, IdentifierError};
