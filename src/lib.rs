//! # RowKeeper
//!
//! A typed data-access layer for PostgreSQL: validated column domains,
//! composable conditions, paging, grouping, joins, upserts with merge rules,
//! and an in-memory executor with the same semantics for tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rowkeeper::prelude::*;
//! use rowkeeper::datasource::{Movie, MoviesDataSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let mut keeper = RowKeeper::connect(config).await?;
//!
//!     let movies = MoviesDataSource::new(&mut keeper).await?;
//!     let id = movies
//!         .insert_and_get_id(&Movie::new("Up", "Family", "", 96, &["adventure"]))
//!         .await?;
//!
//!     let short = movies.short_movies().await?;
//!     println!("Inserted {}, {} short movies", id, short.len());
//!
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod datasource;
pub mod errors;
pub mod migration;
pub mod prelude;

// Re-export the main public types for convenience
pub use crate::core::RowKeeper;
pub use errors::RowKeeperError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, QueryConfig, TransactionIsolation};

// Re-export internal crates used by the public API
pub use store_object;
pub use type_mapping;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
