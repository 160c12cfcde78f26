//! `StoreObject` for `GenericStore`

use super::core::GenericStore;
use crate::errors::{DataError, QueryError};
use crate::query_builder::{
    Condition, Expr, GroupBy, JoinClause, Page, QueryBuilder, SelectField, SortOrder, UpdateSet,
    UpsertClause,
};
use crate::record::Record;
use crate::statement::{DeleteStatement, OnConflict, Statement, UpdateStatement};
use crate::traits::{Entity, StoreObject};
use async_trait::async_trait;
use type_mapping::StoreValue;

#[async_trait]
impl<T: Entity> StoreObject for GenericStore<T> {
    type Model = T;
    type Id = T::Key;

    async fn ensure_exists(&self) -> Result<(), DataError> {
        self.run(Statement::CreateTable(self.schema.clone())).await?;
        Ok(())
    }

    async fn insert(&self, entity: &T) -> Result<(), DataError> {
        self.insert_records(std::slice::from_ref(entity), OnConflict::Error, false)
            .await?;
        Ok(())
    }

    async fn insert_returning_key(&self, entity: &T) -> Result<T::Key, DataError> {
        let outcome = self
            .insert_records(std::slice::from_ref(entity), OnConflict::Error, true)
            .await?;
        self.returned_key(&outcome)?
            .ok_or_else(|| DataError::MissingKey(self.table_name().to_string()))
    }

    async fn insert_ignore(&self, entity: &T) -> Result<(), DataError> {
        self.insert_records(std::slice::from_ref(entity), OnConflict::Ignore, false)
            .await?;
        Ok(())
    }

    async fn insert_ignore_returning_key(&self, entity: &T) -> Result<Option<T::Key>, DataError> {
        let outcome = self
            .insert_records(std::slice::from_ref(entity), OnConflict::Ignore, true)
            .await?;
        self.returned_key(&outcome)
    }

    async fn batch_insert(&self, entities: &[T]) -> Result<u64, DataError> {
        if entities.is_empty() {
            return Ok(0);
        }
        let outcome = self
            .insert_records(entities, OnConflict::Error, false)
            .await?;
        Ok(outcome.rows_affected)
    }

    async fn upsert(&self, entity: &T, merge: UpsertClause) -> Result<(), DataError> {
        self.insert_records(std::slice::from_ref(entity), OnConflict::Update(merge), false)
            .await?;
        Ok(())
    }

    async fn update(&self, entity: &T) -> Result<u64, DataError> {
        let Some(id) = entity.key() else {
            return Ok(0);
        };
        let record = entity.to_record();
        let pk = self.schema.primary_key_name();
        let assignments: Vec<(String, Expr)> = self
            .schema
            .column_names()
            .filter(|name| *name != pk)
            .map(|name| {
                let value = record.get(name).cloned().unwrap_or(StoreValue::Null);
                (name.to_string(), Expr::Literal(value))
            })
            .collect();
        let statement =
            UpdateStatement::bind(self.schema.clone(), &assignments, &self.key_condition(&id))?;
        Ok(self.run(Statement::Update(statement)).await?.rows_affected)
    }

    async fn update_where(&self, condition: Condition, updates: UpdateSet) -> Result<u64, DataError> {
        if updates.is_empty() {
            return Ok(0);
        }
        let statement =
            UpdateStatement::bind(self.schema.clone(), &updates.assignments(), &condition)?;
        Ok(self.run(Statement::Update(statement)).await?.rows_affected)
    }

    async fn delete_where(&self, condition: Condition) -> Result<u64, DataError> {
        let statement = DeleteStatement::bind(self.schema.clone(), &condition)?;
        Ok(self.run(Statement::Delete(statement)).await?.rows_affected)
    }

    async fn delete_by_id(&self, id: &T::Key) -> Result<u64, DataError> {
        self.delete_where(self.key_condition(id)).await
    }

    async fn delete_all(&self) -> Result<u64, DataError> {
        self.delete_where(Condition::all()).await
    }

    async fn fetch_all(&self, query: QueryBuilder) -> Result<Vec<T>, DataError> {
        if query.is_aggregate() {
            return Err(QueryError::InvalidQuery(
                "grouped or aggregate queries return records, use aggregate".to_string(),
            )
            .into());
        }
        let rows = self.select(Vec::new(), &query).await?;
        self.decode_entities(rows)
    }

    async fn list_all(&self) -> Result<Vec<T>, DataError> {
        self.fetch_all(QueryBuilder::new()).await
    }

    async fn fetch_by_id(&self, id: &T::Key) -> Result<Option<T>, DataError> {
        self.fetch_one(QueryBuilder::new().filter(self.key_condition(id)))
            .await
    }

    async fn fetch_one(&self, query: QueryBuilder) -> Result<Option<T>, DataError> {
        Ok(self.fetch_all(query.limit(1)).await?.into_iter().next())
    }

    async fn page(&self, number: i64, size: i64) -> Result<Vec<T>, DataError> {
        let page = Page::new(number, size)?;
        let query = QueryBuilder::new()
            .order_by(self.schema.primary_key_name(), SortOrder::Asc)
            .page(page);
        self.fetch_all(query).await
    }

    async fn count_where(&self, condition: Condition) -> Result<i64, DataError> {
        let query = QueryBuilder::new()
            .filter(condition)
            .select(vec![SelectField::count_all()]);
        let rows = self.select(Vec::new(), &query).await?;
        match rows.first() {
            Some(row) => Ok(row.get_as::<i64>("count")?),
            None => Ok(0),
        }
    }

    async fn count_grouped_by(&self, column: &str) -> Result<Vec<(StoreValue, i64)>, DataError> {
        let query = QueryBuilder::new()
            .select(vec![SelectField::field(column), SelectField::count_all()])
            .group_by(GroupBy::single(column))
            .order_by("count", SortOrder::Desc)
            .order_by(column, SortOrder::Asc);
        let rows = self.select(Vec::new(), &query).await?;
        self.decode_records(&[], rows)?
            .into_iter()
            .map(|row| {
                let key = row.get(column).cloned().unwrap_or(StoreValue::Null);
                Ok((key, row.get_as::<i64>("count")?))
            })
            .collect()
    }

    async fn aggregate(&self, query: QueryBuilder) -> Result<Vec<Record>, DataError> {
        let rows = self.select(Vec::new(), &query).await?;
        self.decode_records(&[], rows)
    }

    async fn fetch_joined(
        &self,
        join: JoinClause,
        query: QueryBuilder,
    ) -> Result<Vec<Record>, DataError> {
        let joins = vec![join];
        let rows = self.select(joins.clone(), &query).await?;
        self.decode_records(&joins, rows)
    }
}
