//! Error types for the RowKeeper crate
//!
//! Store operations return `store_object::DataError`; this enum covers the
//! coordinator itself and wraps data errors raised while it works.

use store_object::DataError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RowKeeperError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] sqlx::Error),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Schema(#[from] store_object::SchemaError),

    #[error("Schema not registered: {0}")]
    SchemaNotFound(String),

    #[error("Schema already registered: {0}")]
    SchemaAlreadyRegistered(String),

    #[error("Foreign keys form a cycle between tables: {0}")]
    DependencyCycle(String),
}
