//! Typed extraction of runtime values
//!
//! Entity mappers read their fields back through `FromStoreValue`, which
//! accepts any representation the codec may produce for a domain (e.g. an
//! `int32` field may come back as `SmallInt` from a narrower column).

use crate::errors::DecodeError;
use crate::types::StoreValue;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

pub trait FromStoreValue: Sized {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError>;
}

fn mismatch(expected: &str, found: &StoreValue) -> DecodeError {
    DecodeError::TypeMismatch {
        domain: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromStoreValue for $ty {
                fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
                    value
                        .as_i64()
                        .and_then(|v| <$ty>::try_from(v).ok())
                        .ok_or_else(|| mismatch($name, value))
                }
            }
        )*
    };
}

impl_from_integer!(i16 => "int16", i32 => "int32", i64 => "int64");

impl FromStoreValue for f32 {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        match value {
            StoreValue::Real(v) => Ok(*v),
            StoreValue::Float(v) => Ok(*v as f32),
            other => Err(mismatch("float32", other)),
        }
    }
}

impl FromStoreValue for f64 {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        match value {
            StoreValue::Real(v) => Ok(f64::from(*v)),
            StoreValue::Float(v) => Ok(*v),
            other => Err(mismatch("float64", other)),
        }
    }
}

impl FromStoreValue for bool {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        value.as_bool().ok_or_else(|| mismatch("boolean", value))
    }
}

impl FromStoreValue for String {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("text", value))
    }
}

impl FromStoreValue for NaiveDate {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        match value {
            StoreValue::Date(d) => Ok(*d),
            other => Err(mismatch("date", other)),
        }
    }
}

impl FromStoreValue for NaiveTime {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        match value {
            StoreValue::Time(t) => Ok(*t),
            other => Err(mismatch("time", other)),
        }
    }
}

impl FromStoreValue for NaiveDateTime {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        match value {
            StoreValue::DateTime(dt) => Ok(*dt),
            other => Err(mismatch("datetime", other)),
        }
    }
}

impl FromStoreValue for DateTime<Utc> {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        match value {
            StoreValue::Timestamp(ts) => Ok(*ts),
            StoreValue::TimestampTz(ts) => Ok(ts.with_timezone(&Utc)),
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl FromStoreValue for DateTime<FixedOffset> {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        match value {
            StoreValue::TimestampTz(ts) => Ok(*ts),
            StoreValue::Timestamp(ts) => Ok(ts.fixed_offset()),
            other => Err(mismatch("timestamp+tz", other)),
        }
    }
}

impl FromStoreValue for serde_json::Value {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        match value {
            StoreValue::Json(json) => Ok(json.clone()),
            other => Err(mismatch("json", other)),
        }
    }
}

impl FromStoreValue for StoreValue {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        Ok(value.clone())
    }
}

impl<T: FromStoreValue> FromStoreValue for Option<T> {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        match value {
            StoreValue::Null => Ok(None),
            other => T::from_store_value(other).map(Some),
        }
    }
}

impl<T: FromStoreValue> FromStoreValue for Vec<T> {
    fn from_store_value(value: &StoreValue) -> Result<Self, DecodeError> {
        match value {
            StoreValue::Array(items) => items.iter().map(T::from_store_value).collect(),
            other => Err(mismatch("array", other)),
        }
    }
}

/// Binary columns come back as `Bytes`; read them with this instead of
/// `Vec<u8>`, which would be taken for an array.
pub fn bytes_from_store_value(value: &StoreValue) -> Result<Vec<u8>, DecodeError> {
    match value {
        StoreValue::Bytes(bytes) => Ok(bytes.clone()),
        other => Err(mismatch("binary", other)),
    }
}
