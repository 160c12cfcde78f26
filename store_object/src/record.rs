//! Column-indexed rows
//!
//! A `Record` is what entities map to and what executors return: an ordered
//! list of `(column, value)` pairs. Rows produced by joins carry qualified
//! `table.column` keys.

use serde::Serialize;
use type_mapping::{DecodeError, FromStoreValue, StoreValue};

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Record {
    fields: Vec<(String, StoreValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, column: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column, replacing any previous value under the same key
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<StoreValue>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Look a column up by exact key, then by unique `*.column` suffix, then
    /// with its qualifier stripped.
    pub fn get(&self, column: &str) -> Option<&StoreValue> {
        self.position(column).map(|i| &self.fields[i].1)
    }

    fn position(&self, column: &str) -> Option<usize> {
        if let Some(i) = self.fields.iter().position(|(name, _)| name == column) {
            return Some(i);
        }

        if !column.contains('.') {
            let mut matches = self
                .fields
                .iter()
                .enumerate()
                .filter(|(_, (name, _))| {
                    name.rsplit_once('.')
                        .is_some_and(|(_, suffix)| suffix == column)
                })
                .map(|(i, _)| i);
            let first = matches.next();
            return if matches.next().is_none() { first } else { None };
        }

        let (_, unqualified) = column.rsplit_once('.')?;
        self.fields.iter().position(|(name, _)| name == unqualified)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    pub fn remove(&mut self, column: &str) -> Option<StoreValue> {
        self.position(column).map(|i| self.fields.remove(i).1)
    }

    /// Typed read of a column that must be present
    pub fn get_as<T: FromStoreValue>(&self, column: &str) -> Result<T, DecodeError> {
        let value = self
            .get(column)
            .ok_or_else(|| DecodeError::MissingColumn(column.to_string()))?;
        T::from_store_value(value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StoreValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> Vec<(String, StoreValue)> {
        self.fields
    }
}

impl FromIterator<(String, StoreValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, StoreValue)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_existing_key() {
        let mut record = Record::new().with("title", "Up").with("genre", "Family");
        record.insert("title", "Inside Out");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("title"), Some(&StoreValue::from("Inside Out")));
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["title", "genre"]);
    }

    #[test]
    fn test_qualified_lookup() {
        let record = Record::new()
            .with("authors.id", 1)
            .with("authors.name", "Author1")
            .with("books.id", 7)
            .with("books.title", "Book1");

        assert_eq!(record.get("books.title"), Some(&StoreValue::from("Book1")));
        assert_eq!(record.get("title"), Some(&StoreValue::from("Book1")));
        // ambiguous without a qualifier
        assert_eq!(record.get("id"), None);

        let plain = Record::new().with("title", "Up");
        assert_eq!(plain.get("movies.title"), Some(&StoreValue::from("Up")));
    }

    #[test]
    fn test_typed_reads() {
        let record = Record::new()
            .with("duration_in_minutes", 96)
            .with("description", StoreValue::Null);
        assert_eq!(record.get_as::<i32>("duration_in_minutes").unwrap(), 96);
        assert_eq!(record.get_as::<Option<String>>("description").unwrap(), None);
        assert_eq!(
            record.get_as::<String>("title"),
            Err(DecodeError::MissingColumn("title".to_string()))
        );
    }
}
