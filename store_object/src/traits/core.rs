//! Trait definitions
//!
//! This module defines the data-access operations every store offers.

use super::entity::{Entity, PrimaryKey};
use crate::errors::DataError;
use crate::query_builder::{Condition, JoinClause, QueryBuilder, UpdateSet, UpsertClause};
use crate::record::Record;
use async_trait::async_trait;
use std::fmt::Debug;
use type_mapping::StoreValue;

/// Common database operations for one entity type
#[async_trait]
pub trait StoreObject: Clone + Send + Sync + Debug {
    /// The entity this store reads and writes
    type Model: Entity;

    /// Primary key type of the entity
    type Id: PrimaryKey;

    /// Create the table if it does not exist
    async fn ensure_exists(&self) -> Result<(), DataError>;

    /// Insert one entity; a key conflict is an error
    async fn insert(&self, entity: &Self::Model) -> Result<(), DataError>;

    /// Insert one entity and return its key
    async fn insert_returning_key(&self, entity: &Self::Model) -> Result<Self::Id, DataError>;

    /// Insert unless the key already exists
    async fn insert_ignore(&self, entity: &Self::Model) -> Result<(), DataError>;

    /// Insert unless the key already exists, returning the key if a row was
    /// written
    async fn insert_ignore_returning_key(
        &self,
        entity: &Self::Model,
    ) -> Result<Option<Self::Id>, DataError>;

    /// Insert all entities in one statement. Either every row is written or
    /// none is.
    async fn batch_insert(&self, entities: &[Self::Model]) -> Result<u64, DataError>;

    /// Insert, or merge into the existing row on a key conflict
    async fn upsert(&self, entity: &Self::Model, merge: UpsertClause) -> Result<(), DataError>;

    /// Overwrite every non-key column of the row with the entity's key
    async fn update(&self, entity: &Self::Model) -> Result<u64, DataError>;

    /// Apply `updates` to every row matching `condition`
    async fn update_where(
        &self,
        condition: Condition,
        updates: UpdateSet,
    ) -> Result<u64, DataError>;

    /// Delete rows matching `condition`
    async fn delete_where(&self, condition: Condition) -> Result<u64, DataError>;

    async fn delete_by_id(&self, id: &Self::Id) -> Result<u64, DataError>;

    async fn delete_all(&self) -> Result<u64, DataError>;

    /// Find entities matching the query
    async fn fetch_all(&self, query: QueryBuilder) -> Result<Vec<Self::Model>, DataError>;

    /// List all entities of this type
    async fn list_all(&self) -> Result<Vec<Self::Model>, DataError>;

    async fn fetch_by_id(&self, id: &Self::Id) -> Result<Option<Self::Model>, DataError>;

    /// First entity matching the query
    async fn fetch_one(&self, query: QueryBuilder) -> Result<Option<Self::Model>, DataError>;

    /// One page of entities ordered by key, pages numbered from 1
    async fn page(&self, number: i64, size: i64) -> Result<Vec<Self::Model>, DataError>;

    async fn count_where(&self, condition: Condition) -> Result<i64, DataError>;

    /// Row counts per distinct value of `column`, largest first, ties by
    /// value ascending
    async fn count_grouped_by(&self, column: &str) -> Result<Vec<(StoreValue, i64)>, DataError>;

    /// Run a query with aggregate fields and grouping
    async fn aggregate(&self, query: QueryBuilder) -> Result<Vec<Record>, DataError>;

    /// Query across a join. Columns come back qualified as `table.column`.
    async fn fetch_joined(
        &self,
        join: JoinClause,
        query: QueryBuilder,
    ) -> Result<Vec<Record>, DataError>;
}
