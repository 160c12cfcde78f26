//! Mapping between application entities and records

use crate::record::Record;
use std::fmt::Debug;
use type_mapping::{DecodeError, FromStoreValue, StoreValue};

/// Types usable as a primary key
pub trait PrimaryKey: Clone + Send + Sync + Debug + PartialEq + 'static {
    fn to_value(&self) -> StoreValue;

    fn from_value(value: &StoreValue) -> Result<Self, DecodeError>;
}

macro_rules! impl_primary_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PrimaryKey for $ty {
                fn to_value(&self) -> StoreValue {
                    StoreValue::from(self.clone())
                }

                fn from_value(value: &StoreValue) -> Result<Self, DecodeError> {
                    <$ty>::from_store_value(value)
                }
            }
        )*
    };
}

impl_primary_key!(i16, i32, i64, String);

/// An entity stored as one row of a schema.
///
/// `to_record` and `from_record` must be inverse: reading back the record of
/// an entity yields an equal entity. The key is `None` before the store has
/// assigned one.
pub trait Entity: Clone + Send + Sync + Debug + 'static {
    type Key: PrimaryKey;

    fn key(&self) -> Option<Self::Key>;

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> Result<Self, DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Tag {
        id: Option<i32>,
        label: String,
        weight: Option<f64>,
    }

    impl Entity for Tag {
        type Key = i32;

        fn key(&self) -> Option<i32> {
            self.id
        }

        fn to_record(&self) -> Record {
            Record::new()
                .with("id", self.id)
                .with("label", self.label.as_str())
                .with("weight", self.weight)
        }

        fn from_record(record: &Record) -> Result<Self, DecodeError> {
            Ok(Self {
                id: record.get_as("id")?,
                label: record.get_as("label")?,
                weight: record.get_as("weight")?,
            })
        }
    }

    #[test]
    fn test_record_mapping_is_inverse() {
        let tag = Tag {
            id: Some(3),
            label: "noir".to_string(),
            weight: None,
        };
        assert_eq!(Tag::from_record(&tag.to_record()).unwrap(), tag);
    }

    #[test]
    fn test_primary_key_values() {
        assert_eq!(7i64.to_value(), StoreValue::BigInt(7));
        assert_eq!(i32::from_value(&StoreValue::SmallInt(4)).unwrap(), 4);
        assert_eq!(
            String::from_value(&StoreValue::from("abc")).unwrap(),
            "abc".to_string()
        );
        assert!(i16::from_value(&StoreValue::BigInt(1 << 40)).is_err());
    }
}
