//! Convenience re-exports for common store-object usage

// Core traits
pub use crate::traits::{Entity, PrimaryKey, StoreObject};

// Error types
pub use crate::errors::{DataError, ExecutorError, QueryError, SchemaError};

// Core store functionality
pub use crate::executor::{MemoryExecutor, PgExecutor, StatementExecutor};
pub use crate::generic_store::GenericStore;
pub use crate::record::Record;
pub use crate::schema::{Column, DefaultExpression, Schema};

// Query building
pub use crate::query_builder::{
    Condition, Expr, GroupBy, JoinClause, JoinType, Page, QueryBuilder, SelectField, SortOrder,
    UpdateSet, UpsertClause,
};

// Values
pub use type_mapping::{DecodeError, Domain, StoreValue, ValidationError};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
