//! Serialization utilities
//!
//! Helpers for entities that keep structured data in a JSON column.

use crate::errors::DecodeError;
use crate::types::StoreValue;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serialize any `Serialize` value into a JSON column value
pub fn to_json_value<T: Serialize>(data: &T) -> Result<StoreValue, serde_json::Error> {
    serde_json::to_value(data).map(StoreValue::Json)
}

/// Deserialize a JSON column value into `T`
pub fn from_json_value<T: DeserializeOwned>(value: &StoreValue) -> Result<T, DecodeError> {
    let json = match value {
        StoreValue::Json(json) => json.clone(),
        StoreValue::Text(text) => serde_json::from_str(text).map_err(|e| DecodeError::TypeMismatch {
            domain: "json".to_string(),
            found: e.to_string(),
        })?,
        other => {
            return Err(DecodeError::TypeMismatch {
                domain: "json".to_string(),
                found: other.type_name().to_string(),
            })
        }
    };
    serde_json::from_value(json).map_err(|e| DecodeError::TypeMismatch {
        domain: "json".to_string(),
        found: e.to_string(),
    })
}
