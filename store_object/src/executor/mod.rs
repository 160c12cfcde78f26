//! Statement execution
//!
//! Stores bind their operations into `Statement`s and hand them to a
//! `StatementExecutor`. `PgExecutor` renders them as PostgreSQL and runs them
//! on a connection pool; `MemoryExecutor` evaluates them over in-process
//! tables with the same semantics.

mod eval;
mod memory;
mod postgres;

pub use memory::MemoryExecutor;
pub use postgres::{IsolationLevel, PgExecutor, TransactionOptions};

use crate::errors::ExecutorError;
use crate::statement::{Statement, StatementOutcome};
use async_trait::async_trait;

/// Runs one bound statement atomically
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn execute(&self, statement: &Statement) -> Result<StatementOutcome, ExecutorError>;
}
