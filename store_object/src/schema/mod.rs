//! Schema descriptors
//!
//! Columns, tables and the relations between them.

pub mod column;
pub mod table;

pub use column::{Column, ColumnDefault, DefaultExpression, ForeignKey};
pub use table::Schema;
