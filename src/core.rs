//! Core RowKeeper functionality
//!
//! `RowKeeper` owns the statement executor, the registered schemas and the
//! query defaults, and hands out typed stores over them.

use std::sync::Arc;
use std::time::Duration;

use config::{AppConfig, QueryConfig, TransactionIsolation};
use sqlx::PgPool;
use store_object::executor::{IsolationLevel, MemoryExecutor, PgExecutor, StatementExecutor, TransactionOptions};
use store_object::{Entity, GenericStore, Schema};

use crate::errors::RowKeeperError;

/// Main coordinator that manages the store connection and registered schemas
pub struct RowKeeper {
    executor: Arc<dyn StatementExecutor>,
    pool: Option<PgPool>,
    schemas: Vec<Arc<Schema>>,
    query: QueryConfig,
}

impl std::fmt::Debug for RowKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowKeeper")
            .field("postgres", &self.pool.is_some())
            .field(
                "schemas",
                &self.schemas.iter().map(|s| s.table_name()).collect::<Vec<_>>(),
            )
            .field("query", &self.query)
            .finish()
    }
}

impl RowKeeper {
    /// Connect to PostgreSQL with the pool and transaction settings of `config`
    pub async fn connect(config: AppConfig) -> Result<Self, RowKeeperError> {
        let database = &config.database;
        let connection_string = database.connection_string();

        let mut pool_options = sqlx::postgres::PgPoolOptions::new()
            .max_connections(database.max_connections)
            .min_connections(database.min_connections)
            .acquire_timeout(Duration::from_secs(database.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(database.idle_timeout_seconds));

        // Set max lifetime if specified
        if database.max_lifetime_seconds > 0 {
            pool_options =
                pool_options.max_lifetime(Duration::from_secs(database.max_lifetime_seconds));
        }

        let pool = pool_options.connect(&connection_string).await?;
        let options = TransactionOptions {
            isolation: database.transaction_isolation.map(isolation_level),
            read_only: database.read_only,
        };
        tracing::info!(
            "Connected to {}:{}/{} (read_only: {})",
            database.host,
            database.port,
            database.database,
            database.read_only
        );

        Ok(Self {
            executor: Arc::new(PgExecutor::new(pool.clone(), options)),
            pool: Some(pool),
            schemas: Vec::new(),
            query: config.query,
        })
    }

    /// Load the configuration file and connect
    pub async fn from_env() -> Result<Self, RowKeeperError> {
        Self::connect(AppConfig::load()?).await
    }

    /// Coordinator over an arbitrary executor
    pub fn with_executor(executor: Arc<dyn StatementExecutor>, query: QueryConfig) -> Self {
        Self {
            executor,
            pool: None,
            schemas: Vec::new(),
            query,
        }
    }

    /// Coordinator over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::with_executor(Arc::new(MemoryExecutor::new()), QueryConfig::default())
    }

    /// PostgreSQL pool, when connected to one
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    pub fn executor(&self) -> Arc<dyn StatementExecutor> {
        self.executor.clone()
    }

    pub fn query_config(&self) -> &QueryConfig {
        &self.query
    }

    /// Register a schema under its table name
    pub fn register_schema(&mut self, schema: Schema) -> Result<Arc<Schema>, RowKeeperError> {
        if self.schemas.iter().any(|s| s.table_name() == schema.table_name()) {
            return Err(RowKeeperError::SchemaAlreadyRegistered(
                schema.table_name().to_string(),
            ));
        }
        let schema = Arc::new(schema);
        self.schemas.push(schema.clone());
        Ok(schema)
    }

    /// Get a registered schema by table name
    pub fn schema(&self, table: &str) -> Result<Arc<Schema>, RowKeeperError> {
        self.schemas
            .iter()
            .find(|s| s.table_name() == table)
            .cloned()
            .ok_or_else(|| RowKeeperError::SchemaNotFound(table.to_string()))
    }

    /// Registered schemas in registration order
    pub fn schemas(&self) -> &[Arc<Schema>] {
        &self.schemas
    }

    /// Typed store over a registered table
    pub fn store<T: Entity>(&self, table: &str) -> Result<GenericStore<T>, RowKeeperError> {
        Ok(GenericStore::new(self.executor.clone(), self.schema(table)?))
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), RowKeeperError> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").fetch_one(pool).await?;
        }
        Ok(())
    }
}

fn isolation_level(isolation: TransactionIsolation) -> IsolationLevel {
    match isolation {
        TransactionIsolation::ReadUncommitted => IsolationLevel::ReadUncommitted,
        TransactionIsolation::ReadCommitted => IsolationLevel::ReadCommitted,
        TransactionIsolation::RepeatableRead => IsolationLevel::RepeatableRead,
        TransactionIsolation::Serializable => IsolationLevel::Serializable,
    }
}
