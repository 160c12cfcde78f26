//! Runtime values
//!
//! This module defines the value type that flows between entities, the codec
//! and the store, plus comparison rules shared by every executor.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single column value, either at the domain level (what entities produce)
/// or at the storage level (what the store holds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreValue {
    Null,
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Real(f32),
    Float(f64),
    Decimal(String), // Store as string to preserve precision
    Boolean(bool),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    TimestampTz(DateTime<FixedOffset>),
    Json(serde_json::Value),
    Array(Vec<StoreValue>),
}

impl StoreValue {
    /// Build a binary value
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        StoreValue::Bytes(bytes.into())
    }

    /// Build a decimal value from its textual form
    pub fn decimal(value: impl Into<String>) -> Self {
        StoreValue::Decimal(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, StoreValue::Null)
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            StoreValue::Null => "null",
            StoreValue::SmallInt(_) => "smallint",
            StoreValue::Integer(_) => "integer",
            StoreValue::BigInt(_) => "bigint",
            StoreValue::Real(_) => "real",
            StoreValue::Float(_) => "double",
            StoreValue::Decimal(_) => "decimal",
            StoreValue::Boolean(_) => "boolean",
            StoreValue::Text(_) => "text",
            StoreValue::Bytes(_) => "bytes",
            StoreValue::Date(_) => "date",
            StoreValue::Time(_) => "time",
            StoreValue::DateTime(_) => "datetime",
            StoreValue::Timestamp(_) => "timestamp",
            StoreValue::TimestampTz(_) => "timestamptz",
            StoreValue::Json(_) => "json",
            StoreValue::Array(_) => "array",
        }
    }

    /// Integer view of any integer variant
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StoreValue::SmallInt(v) => Some(i64::from(*v)),
            StoreValue::Integer(v) => Some(i64::from(*v)),
            StoreValue::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating point view of any numeric variant, decimals included
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StoreValue::Real(v) => Some(f64::from(*v)),
            StoreValue::Float(v) => Some(*v),
            StoreValue::Decimal(s) => s.parse().ok(),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoreValue::Text(s) | StoreValue::Decimal(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoreValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            StoreValue::SmallInt(_)
                | StoreValue::Integer(_)
                | StoreValue::BigInt(_)
                | StoreValue::Real(_)
                | StoreValue::Float(_)
                | StoreValue::Decimal(_)
        )
    }

    /// SQL-style comparison. Returns `None` when either side is null or the
    /// two values are not comparable.
    pub fn compare(&self, other: &StoreValue) -> Option<Ordering> {
        use StoreValue::*;

        if let (Some(a), Some(b)) = (self.as_i64(), other.as_i64()) {
            return Some(a.cmp(&b));
        }
        if self.is_numeric() && other.is_numeric() {
            return self.as_f64()?.partial_cmp(&other.as_f64()?);
        }

        match (self, other) {
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Bytes(a), Bytes(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (TimestampTz(a), TimestampTz(b)) => Some(a.cmp(b)),
            (Timestamp(a), TimestampTz(b)) => Some(a.cmp(&b.with_timezone(&Utc))),
            (TimestampTz(a), Timestamp(b)) => Some(a.with_timezone(&Utc).cmp(b)),
            (Json(a), Json(b)) => (a == b).then_some(Ordering::Equal),
            (Array(a), Array(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    match left.compare(right)? {
                        Ordering::Equal => continue,
                        unequal => return Some(unequal),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// SQL-style equality: null never equals anything
    pub fn sql_eq(&self, other: &StoreValue) -> Option<bool> {
        if self.is_null() || other.is_null() {
            return None;
        }
        Some(self.compare(other) == Some(Ordering::Equal))
    }
}

/// Convert basic Rust types to StoreValue
impl From<String> for StoreValue {
    fn from(val: String) -> Self {
        StoreValue::Text(val)
    }
}

impl From<&str> for StoreValue {
    fn from(val: &str) -> Self {
        StoreValue::Text(val.to_string())
    }
}

impl From<i16> for StoreValue {
    fn from(val: i16) -> Self {
        StoreValue::SmallInt(val)
    }
}

impl From<i32> for StoreValue {
    fn from(val: i32) -> Self {
        StoreValue::Integer(val)
    }
}

impl From<i64> for StoreValue {
    fn from(val: i64) -> Self {
        StoreValue::BigInt(val)
    }
}

impl From<f32> for StoreValue {
    fn from(val: f32) -> Self {
        StoreValue::Real(val)
    }
}

impl From<f64> for StoreValue {
    fn from(val: f64) -> Self {
        StoreValue::Float(val)
    }
}

impl From<bool> for StoreValue {
    fn from(val: bool) -> Self {
        StoreValue::Boolean(val)
    }
}

impl From<NaiveDate> for StoreValue {
    fn from(val: NaiveDate) -> Self {
        StoreValue::Date(val)
    }
}

impl From<NaiveTime> for StoreValue {
    fn from(val: NaiveTime) -> Self {
        StoreValue::Time(val)
    }
}

impl From<NaiveDateTime> for StoreValue {
    fn from(val: NaiveDateTime) -> Self {
        StoreValue::DateTime(val)
    }
}

impl From<DateTime<Utc>> for StoreValue {
    fn from(val: DateTime<Utc>) -> Self {
        StoreValue::Timestamp(val)
    }
}

impl From<DateTime<FixedOffset>> for StoreValue {
    fn from(val: DateTime<FixedOffset>) -> Self {
        StoreValue::TimestampTz(val)
    }
}

impl From<serde_json::Value> for StoreValue {
    fn from(val: serde_json::Value) -> Self {
        StoreValue::Json(val)
    }
}

impl<T> From<Vec<T>> for StoreValue
where
    T: Into<StoreValue>,
{
    fn from(val: Vec<T>) -> Self {
        StoreValue::Array(val.into_iter().map(Into::into).collect())
    }
}

impl<T> From<Option<T>> for StoreValue
where
    T: Into<StoreValue>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => StoreValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_mixed_integers() {
        let a = StoreValue::SmallInt(5);
        let b = StoreValue::BigInt(7);
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(StoreValue::Integer(96).compare(&StoreValue::Integer(96)), Some(Ordering::Equal));
    }

    #[test]
    fn test_compare_numeric_with_decimal() {
        let a = StoreValue::decimal("12.50");
        let b = StoreValue::Integer(12);
        assert_eq!(a.compare(&b), Some(Ordering::Greater));
    }

    #[test]
    fn test_null_is_never_equal() {
        assert_eq!(StoreValue::Null.sql_eq(&StoreValue::Null), None);
        assert_eq!(StoreValue::Null.compare(&StoreValue::Integer(1)), None);
    }

    #[test]
    fn test_incomparable_types() {
        assert_eq!(StoreValue::from("a").compare(&StoreValue::Integer(1)), None);
    }

    #[test]
    fn test_option_and_vec_conversions() {
        assert_eq!(StoreValue::from(Option::<i32>::None), StoreValue::Null);
        assert_eq!(
            StoreValue::from(vec!["a", "b"]),
            StoreValue::Array(vec![StoreValue::from("a"), StoreValue::from("b")])
        );
    }
}
