//! Table creation for registered schemas

use std::collections::HashSet;
use std::sync::Arc;

use store_object::{Schema, Statement};

use crate::core::RowKeeper;
use crate::errors::RowKeeperError;

impl RowKeeper {
    /// Registered schemas ordered so that every table comes after the tables
    /// it references. References to unregistered tables are assumed to exist
    /// already.
    pub fn creation_order(&self) -> Result<Vec<Arc<Schema>>, RowKeeperError> {
        let registered: HashSet<&str> = self.schemas().iter().map(|s| s.table_name()).collect();
        let mut created: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&Arc<Schema>> = self.schemas().iter().collect();
        let mut ordered = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let (ready, blocked): (Vec<_>, Vec<_>) = pending.into_iter().partition(|schema| {
                schema
                    .dependencies()
                    .iter()
                    .all(|dep| !registered.contains(dep) || created.contains(dep))
            });
            if ready.is_empty() {
                let names: Vec<&str> = blocked.iter().map(|s| s.table_name()).collect();
                return Err(RowKeeperError::DependencyCycle(names.join(", ")));
            }
            for schema in ready {
                created.insert(schema.table_name());
                ordered.push(schema.clone());
            }
            pending = blocked;
        }
        Ok(ordered)
    }

    /// Create every registered table that does not exist yet
    pub async fn ensure_all(&self) -> Result<(), RowKeeperError> {
        for schema in self.creation_order()? {
            tracing::debug!("Ensuring table {}", schema.table_name());
            self.executor()
                .execute(&Statement::CreateTable(schema))
                .await
                .map_err(store_object::DataError::from)?;
        }
        Ok(())
    }
}
