//! Query builder utilities
//!
//! Conditions, projections, joins and assignments that describe a statement,
//! and their rendering to PostgreSQL.

pub mod aggregation;
pub mod builder;
pub mod condition;
pub mod grouping;
pub mod join;
pub mod ordering;
pub mod pagination;
pub mod sql_generation;
pub mod update;

#[cfg(test)]
mod tests;

pub use aggregation::{AggregateFunction, SelectField};
pub use builder::QueryBuilder;
pub use condition::{and, or, Condition, Operand, Operator};
pub use grouping::GroupBy;
pub use join::{JoinClause, JoinCondition, JoinType};
pub use ordering::SortOrder;
pub use pagination::Page;
pub use sql_generation::{RenderedStatement, SqlGenerator};
pub use update::{Expr, UpdateOperation, UpdateSet, UpsertClause};
