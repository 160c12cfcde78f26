use crate::codec::{self, Scope};
use crate::errors::DataError;
use crate::executor::StatementExecutor;
use crate::query_builder::{Condition, JoinClause, QueryBuilder};
use crate::record::Record;
use crate::schema::Schema;
use crate::statement::{InsertStatement, OnConflict, SelectStatement, Statement, StatementOutcome};
use crate::traits::{Entity, PrimaryKey};
use std::marker::PhantomData;
use std::sync::Arc;

/// Store for one entity type over any statement executor
#[derive(Clone)]
pub struct GenericStore<T: Entity> {
    pub(crate) executor: Arc<dyn StatementExecutor>,
    pub(crate) schema: Arc<Schema>,
    pub(crate) _phantom: PhantomData<T>,
}

impl<T: Entity> std::fmt::Debug for GenericStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericStore")
            .field("table", &self.schema.table_name())
            .field("columns", &self.schema.columns().len())
            .field("entity", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Entity> GenericStore<T> {
    pub fn new(executor: Arc<dyn StatementExecutor>, schema: Arc<Schema>) -> Self {
        Self {
            executor,
            schema,
            _phantom: PhantomData,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn table_name(&self) -> &str {
        self.schema.table_name()
    }

    pub(crate) async fn run(&self, statement: Statement) -> Result<StatementOutcome, DataError> {
        crate::debug_log!("[{}] Dispatching on {}", statement.kind(), self.table_name());
        Ok(self.executor.execute(&statement).await?)
    }

    pub(crate) fn key_condition(&self, id: &T::Key) -> Condition {
        Condition::eq(self.schema.primary_key_name(), id.to_value())
    }

    /// Run a select and return the rows in storage form
    pub(crate) async fn select(
        &self,
        joins: Vec<JoinClause>,
        query: &QueryBuilder,
    ) -> Result<Vec<Record>, DataError> {
        let statement = SelectStatement::bind(self.schema.clone(), joins, query)?;
        Ok(self.run(Statement::Select(statement)).await?.rows)
    }

    pub(crate) fn decode_entities(&self, rows: Vec<Record>) -> Result<Vec<T>, DataError> {
        rows.into_iter()
            .map(|row| {
                let decoded = codec::decode(&self.schema, row)?;
                Ok(T::from_record(&decoded)?)
            })
            .collect()
    }

    /// Decode the columns of rows that may also carry aliases or joined
    /// tables
    pub(crate) fn decode_records(
        &self,
        joins: &[JoinClause],
        rows: Vec<Record>,
    ) -> Result<Vec<Record>, DataError> {
        let scope = Scope::with_joins(&self.schema, joins);
        rows.into_iter()
            .map(|row| Ok(codec::decode_lenient(&scope, row)?))
            .collect()
    }

    pub(crate) async fn insert_records(
        &self,
        entities: &[T],
        on_conflict: OnConflict,
        returning: bool,
    ) -> Result<StatementOutcome, DataError> {
        let records: Vec<Record> = entities.iter().map(Entity::to_record).collect();
        let statement =
            InsertStatement::bind(self.schema.clone(), &records, on_conflict, returning)?;
        self.run(Statement::Insert(statement)).await
    }

    /// Key of the first returned row, if any row came back
    pub(crate) fn returned_key(
        &self,
        outcome: &StatementOutcome,
    ) -> Result<Option<T::Key>, DataError> {
        let Some(row) = outcome.rows.first() else {
            return Ok(None);
        };
        let pk = self.schema.primary_key();
        let value = row
            .get(pk.name())
            .cloned()
            .ok_or_else(|| DataError::MissingKey(self.table_name().to_string()))?;
        let value = pk.resolved().from_storage(value)?;
        Ok(Some(T::Key::from_value(&value)?))
    }
}
