//! PostgreSQL executor
//!
//! Each statement runs in its own transaction on a pooled connection. The
//! transaction is opened with the configured isolation level and access mode
//! before the statement is sent.

use super::StatementExecutor;
use crate::errors::{ConstraintKind, ExecutorError};
use crate::query_builder::SqlGenerator;
use crate::record::Record;
use crate::statement::{Statement, StatementOutcome};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};
use type_mapping::{encode_array, StorageType, StoreValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn to_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Settings applied to every statement transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Server default when unset
    pub isolation: Option<IsolationLevel>,
    pub read_only: bool,
}

impl TransactionOptions {
    /// `SET TRANSACTION` statement for these options, if any applies
    pub fn to_sql(&self) -> Option<String> {
        let mut modes = Vec::new();
        if let Some(isolation) = self.isolation {
            modes.push(format!("ISOLATION LEVEL {}", isolation.to_sql()));
        }
        if self.read_only {
            modes.push("READ ONLY".to_string());
        }
        if modes.is_empty() {
            None
        } else {
            Some(format!("SET TRANSACTION {}", modes.join(", ")))
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
    options: TransactionOptions,
}

impl PgExecutor {
    pub fn new(pool: PgPool, options: TransactionOptions) -> Self {
        Self { pool, options }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn options(&self) -> TransactionOptions {
        self.options
    }
}

#[async_trait]
impl StatementExecutor for PgExecutor {
    async fn execute(&self, statement: &Statement) -> Result<StatementOutcome, ExecutorError> {
        let table = statement.table_name();
        let rendered = SqlGenerator::render(statement)?;

        tracing::debug!("[{}] Table: {}", statement.kind(), table);
        tracing::debug!("[{}] SQL: {}", statement.kind(), rendered.sql);
        crate::trace_log!("[{}] Params: {:?}", statement.kind(), rendered.params);

        let mut tx = self.pool.begin().await?;
        if let Some(set_transaction) = self.options.to_sql() {
            sqlx::query(&set_transaction).execute(&mut *tx).await?;
        }

        let mut query = sqlx::query(&rendered.sql);
        for param in &rendered.params {
            query = bind_value(query, param);
        }

        let outcome = match &rendered.shape {
            Some(shape) => {
                let rows = query
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| map_error(table, e))?;
                let records = rows
                    .iter()
                    .map(|row| read_row(row, shape))
                    .collect::<Result<Vec<_>, _>>()?;
                StatementOutcome::with_rows(records)
            }
            None => {
                let result = query
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_error(table, e))?;
                StatementOutcome::affected(result.rows_affected())
            }
        };

        tx.commit().await.map_err(|e| map_error(table, e))?;

        tracing::debug!(
            "[{}] Completed on {}: {} row(s)",
            statement.kind(),
            table,
            outcome.rows_affected
        );
        Ok(outcome)
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &StoreValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        StoreValue::Null => query.bind(Option::<String>::None),
        StoreValue::SmallInt(v) => query.bind(*v),
        StoreValue::Integer(v) => query.bind(*v),
        StoreValue::BigInt(v) => query.bind(*v),
        StoreValue::Real(v) => query.bind(*v),
        StoreValue::Float(v) => query.bind(*v),
        // numeric travels as text and is cast by the placeholder
        StoreValue::Decimal(v) => query.bind(v.clone()),
        StoreValue::Boolean(v) => query.bind(*v),
        StoreValue::Text(v) => query.bind(v.clone()),
        StoreValue::Bytes(v) => query.bind(v.clone()),
        StoreValue::Date(v) => query.bind(*v),
        StoreValue::Time(v) => query.bind(*v),
        StoreValue::DateTime(v) => query.bind(*v),
        StoreValue::Timestamp(v) => query.bind(*v),
        StoreValue::TimestampTz(v) => query.bind(*v),
        StoreValue::Json(v) => query.bind(v.clone()),
        StoreValue::Array(_) => query.bind(encode_array(value)),
    }
}

fn read_row(row: &PgRow, shape: &[(String, StorageType)]) -> Result<Record, ExecutorError> {
    let mut record = Record::with_capacity(shape.len());
    for (name, storage) in shape {
        record.insert(name.clone(), read_value(row, name, storage)?);
    }
    Ok(record)
}

fn read_value(row: &PgRow, name: &str, storage: &StorageType) -> Result<StoreValue, ExecutorError> {
    let value = match storage {
        StorageType::SmallInt => row.try_get::<Option<i16>, _>(name)?.map(StoreValue::SmallInt),
        StorageType::Integer => row.try_get::<Option<i32>, _>(name)?.map(StoreValue::Integer),
        StorageType::BigInt => row.try_get::<Option<i64>, _>(name)?.map(StoreValue::BigInt),
        StorageType::Real => row.try_get::<Option<f32>, _>(name)?.map(StoreValue::Real),
        StorageType::DoublePrecision => row.try_get::<Option<f64>, _>(name)?.map(StoreValue::Float),
        StorageType::Numeric { .. } => row.try_get::<Option<String>, _>(name)?.map(StoreValue::Decimal),
        StorageType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(StoreValue::Boolean),
        StorageType::Char(_) | StorageType::Varchar(_) | StorageType::Text => {
            row.try_get::<Option<String>, _>(name)?.map(StoreValue::Text)
        }
        // array literal, selected as text
        StorageType::Array { .. } => row.try_get::<Option<String>, _>(name)?.map(StoreValue::Text),
        StorageType::Bytea => row.try_get::<Option<Vec<u8>>, _>(name)?.map(StoreValue::Bytes),
        StorageType::Date => row.try_get::<Option<NaiveDate>, _>(name)?.map(StoreValue::Date),
        StorageType::Time => row.try_get::<Option<NaiveTime>, _>(name)?.map(StoreValue::Time),
        StorageType::Timestamp => row
            .try_get::<Option<NaiveDateTime>, _>(name)?
            .map(StoreValue::DateTime),
        StorageType::TimestampTz => row
            .try_get::<Option<DateTime<Utc>>, _>(name)?
            .map(StoreValue::Timestamp),
        StorageType::Jsonb => row
            .try_get::<Option<serde_json::Value>, _>(name)?
            .map(StoreValue::Json),
    };
    Ok(value.unwrap_or(StoreValue::Null))
}

/// Map integrity violations to constraint errors; everything else stays a
/// driver error.
fn map_error(table: &str, error: sqlx::Error) -> ExecutorError {
    if let sqlx::Error::Database(db) = &error {
        let kind = match db.code().as_deref() {
            Some("23505") => Some(ConstraintKind::PrimaryKey),
            Some("23502") => Some(ConstraintKind::NotNull),
            Some("23503") => Some(ConstraintKind::ForeignKey),
            Some("42P01") => return ExecutorError::UnknownTable(table.to_string()),
            _ => None,
        };
        if let Some(kind) = kind {
            return ExecutorError::constraint(kind, table, db.message());
        }
    }
    ExecutorError::Sqlx(error)
}
