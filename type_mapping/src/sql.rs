//! SQL type conversion utilities
//!
//! This module maps resolved storage types to their PostgreSQL names, both
//! for DDL generation and for casting bound parameters.

use crate::array::encode_array;
use crate::types::StoreValue;
use std::fmt;

/// Storage-native column type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    SmallInt,
    Integer,
    BigInt,
    Real,
    DoublePrecision,
    Numeric { precision: u8, scale: u8 },
    Boolean,
    Char(u32),
    Varchar(u32),
    Text,
    Bytea,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Jsonb,
    Array { element: Box<StorageType>, dimensions: u8 },
}

impl StorageType {
    /// Type name as written in `CREATE TABLE`
    pub fn to_sql(&self) -> String {
        match self {
            StorageType::SmallInt => "SMALLINT".to_string(),
            StorageType::Integer => "INTEGER".to_string(),
            StorageType::BigInt => "BIGINT".to_string(),
            StorageType::Real => "REAL".to_string(),
            StorageType::DoublePrecision => "DOUBLE PRECISION".to_string(),
            StorageType::Numeric { precision, scale } => format!("NUMERIC({},{})", precision, scale),
            StorageType::Boolean => "BOOLEAN".to_string(),
            StorageType::Char(n) => format!("CHAR({})", n),
            StorageType::Varchar(n) => format!("VARCHAR({})", n),
            StorageType::Text => "TEXT".to_string(),
            StorageType::Bytea => "BYTEA".to_string(),
            StorageType::Date => "DATE".to_string(),
            StorageType::Time => "TIME".to_string(),
            StorageType::Timestamp => "TIMESTAMP".to_string(),
            StorageType::TimestampTz => "TIMESTAMP WITH TIME ZONE".to_string(),
            StorageType::Jsonb => "JSONB".to_string(),
            StorageType::Array {
                element,
                dimensions,
            } => format!("{}{}", element.to_sql(), "[]".repeat(usize::from(*dimensions))),
        }
    }

    /// Unparameterized name used to cast a bound parameter (`$1::varchar`).
    /// Length limits are left out so the store never truncates silently.
    pub fn cast_name(&self) -> String {
        match self {
            StorageType::SmallInt => "smallint".to_string(),
            StorageType::Integer => "integer".to_string(),
            StorageType::BigInt => "bigint".to_string(),
            StorageType::Real => "real".to_string(),
            StorageType::DoublePrecision => "double precision".to_string(),
            StorageType::Numeric { .. } => "numeric".to_string(),
            StorageType::Boolean => "boolean".to_string(),
            StorageType::Char(_) => "bpchar".to_string(),
            StorageType::Varchar(_) => "varchar".to_string(),
            StorageType::Text => "text".to_string(),
            StorageType::Bytea => "bytea".to_string(),
            StorageType::Date => "date".to_string(),
            StorageType::Time => "time".to_string(),
            StorageType::Timestamp => "timestamp".to_string(),
            StorageType::TimestampTz => "timestamptz".to_string(),
            StorageType::Jsonb => "jsonb".to_string(),
            StorageType::Array { element, .. } => format!("{}[]", element.cast_name()),
        }
    }

    /// Serial pseudo-type for auto-increment keys, if the type has one
    pub fn serial_sql(&self) -> Option<&'static str> {
        match self {
            StorageType::SmallInt => Some("SMALLSERIAL"),
            StorageType::Integer => Some("SERIAL"),
            StorageType::BigInt => Some("BIGSERIAL"),
            _ => None,
        }
    }

    /// Types read back through their text form (`col::text`): arrays are
    /// decoded from their literal and decimals keep every digit.
    pub fn reads_as_text(&self) -> bool {
        matches!(self, StorageType::Array { .. } | StorageType::Numeric { .. })
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Render a storage value as an inline SQL literal, used for column
/// `DEFAULT` clauses.
pub fn sql_literal(value: &StoreValue) -> String {
    match value {
        StoreValue::Null => "NULL".to_string(),
        StoreValue::SmallInt(v) => v.to_string(),
        StoreValue::Integer(v) => v.to_string(),
        StoreValue::BigInt(v) => v.to_string(),
        StoreValue::Real(v) => v.to_string(),
        StoreValue::Float(v) => v.to_string(),
        StoreValue::Decimal(v) => v.clone(),
        StoreValue::Boolean(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
        StoreValue::Text(s) => quote(s),
        StoreValue::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            format!("'\\x{}'::bytea", hex)
        }
        StoreValue::Date(d) => quote(&d.to_string()),
        StoreValue::Time(t) => quote(&t.to_string()),
        StoreValue::DateTime(dt) => quote(&dt.to_string()),
        StoreValue::Timestamp(ts) => quote(&ts.to_rfc3339()),
        StoreValue::TimestampTz(ts) => quote(&ts.to_rfc3339()),
        StoreValue::Json(json) => format!("{}::jsonb", quote(&json.to_string())),
        StoreValue::Array(_) => quote(&encode_array(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl_names() {
        assert_eq!(StorageType::Varchar(100).to_sql(), "VARCHAR(100)");
        assert_eq!(
            StorageType::Numeric {
                precision: 12,
                scale: 2
            }
            .to_sql(),
            "NUMERIC(12,2)"
        );
        let matrix = StorageType::Array {
            element: Box::new(StorageType::Integer),
            dimensions: 2,
        };
        assert_eq!(matrix.to_sql(), "INTEGER[][]");
        assert_eq!(matrix.cast_name(), "integer[]");
    }

    #[test]
    fn test_serial_types() {
        assert_eq!(StorageType::Integer.serial_sql(), Some("SERIAL"));
        assert_eq!(StorageType::BigInt.serial_sql(), Some("BIGSERIAL"));
        assert_eq!(StorageType::Text.serial_sql(), None);
    }

    #[test]
    fn test_sql_literal_escapes_quotes() {
        assert_eq!(sql_literal(&StoreValue::from("it's")), "'it''s'");
        assert_eq!(sql_literal(&StoreValue::Boolean(true)), "TRUE");
        assert_eq!(sql_literal(&StoreValue::from(vec![1, 2])), "'{1,2}'");
    }
}
