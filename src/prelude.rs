//! Convenience re-exports for common RowKeeper usage
//!
//! ```rust
//! use rowkeeper::prelude::*;
//!
//! let keeper = RowKeeper::in_memory();
//! assert!(keeper.schemas().is_empty());
//! ```

// Core RowKeeper components
pub use crate::core::RowKeeper;
pub use crate::errors::RowKeeperError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, QueryConfig, TransactionIsolation};

// Re-export commonly used store-object types for convenience
pub use store_object::prelude::*;

// Common external dependencies
pub use anyhow;
pub use sqlx;
pub use tokio;
