//! Column type registry
//!
//! Resolves a logical domain into its storage type and validation rule, and
//! converts values between the domain and storage representations.

use crate::array::{decode_array, encode_array};
use crate::domain::{CustomDomain, Domain, EnumRepr};
use crate::errors::{DecodeError, ValidationError};
use crate::sql::StorageType;
use crate::types::StoreValue;
use crate::validate::{decimal_digits, decimal_text, PatternValidator, TemporalKind, Validator, ValueValidator};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// A domain together with everything derived from it
#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub domain: Domain,
    pub storage: StorageType,
    pub validator: Validator,
}

/// Resolve a domain. Resolution is a pure function of the domain.
pub fn resolve(domain: &Domain) -> ResolvedType {
    let (storage, validator) = match domain {
        Domain::SmallInt => (StorageType::SmallInt, int_range(i64::from(i16::MIN), i64::from(i16::MAX))),
        Domain::Integer => (StorageType::Integer, int_range(i64::from(i32::MIN), i64::from(i32::MAX))),
        Domain::BigInt => (StorageType::BigInt, int_range(i64::MIN, i64::MAX)),
        Domain::Real => (StorageType::Real, Validator::Float { single: true }),
        Domain::Double => (StorageType::DoublePrecision, Validator::Float { single: false }),
        Domain::Decimal { precision, scale } => (
            StorageType::Numeric {
                precision: *precision,
                scale: *scale,
            },
            Validator::Decimal {
                precision: *precision,
                scale: *scale,
            },
        ),
        Domain::Boolean => (StorageType::Boolean, Validator::Boolean),
        Domain::Char(n) => (StorageType::Char(*n), Validator::FixedLength(*n)),
        Domain::Varchar(n) => (StorageType::Varchar(*n), Validator::MaxLength(Some(*n))),
        Domain::Text => (StorageType::Text, Validator::MaxLength(None)),
        Domain::Array {
            element,
            dimensions,
        } => {
            let inner = resolve(element);
            (
                StorageType::Array {
                    element: Box::new(inner.storage),
                    dimensions: *dimensions,
                },
                Validator::Array {
                    element: Box::new(inner.validator),
                    dimensions: *dimensions,
                },
            )
        }
        Domain::Binary(limit) => (StorageType::Bytea, Validator::Binary(*limit)),
        Domain::LargeBinary => (StorageType::Bytea, Validator::Binary(None)),
        Domain::Enum { variants, repr } => match repr {
            EnumRepr::Ordinal => (
                StorageType::Integer,
                Validator::Enum {
                    variants: variants.clone(),
                    max_length: None,
                },
            ),
            EnumRepr::Name { max_length } => (
                StorageType::Varchar(*max_length),
                Validator::Enum {
                    variants: variants.clone(),
                    max_length: Some(*max_length),
                },
            ),
        },
        Domain::Date => (StorageType::Date, Validator::Temporal(TemporalKind::Date)),
        Domain::Time => (StorageType::Time, Validator::Temporal(TemporalKind::Time)),
        Domain::DateTime => (StorageType::Timestamp, Validator::Temporal(TemporalKind::DateTime)),
        Domain::Timestamp => (StorageType::Timestamp, Validator::Temporal(TemporalKind::Timestamp)),
        Domain::TimestampTz => (StorageType::TimestampTz, Validator::Temporal(TemporalKind::TimestampTz)),
        Domain::Json => (StorageType::Jsonb, Validator::Json),
        Domain::Custom(custom) => {
            let base = resolve(&custom.base);
            (
                base.storage,
                Validator::Custom {
                    base: Box::new(base.validator),
                    check: custom.validator.clone(),
                },
            )
        }
    };

    ResolvedType {
        domain: domain.clone(),
        storage,
        validator,
    }
}

fn int_range(min: i64, max: i64) -> Validator {
    Validator::Integer { min, max }
}

impl ResolvedType {
    /// Validate a domain value and convert it to its storage form. This is
    /// the single path used both for entity encoding and parameter binding.
    pub fn encode(&self, column: &str, value: &StoreValue) -> Result<StoreValue, ValidationError> {
        self.validator.check(column, value)?;
        to_storage(&self.domain, column, value)
    }

    /// Convert a stored value back to the domain representation
    pub fn from_storage(&self, value: StoreValue) -> Result<StoreValue, DecodeError> {
        from_storage(&self.domain, value)
    }
}

/// Assumes `value` already passed the domain's validator
fn to_storage(domain: &Domain, column: &str, value: &StoreValue) -> Result<StoreValue, ValidationError> {
    if value.is_null() {
        return Ok(StoreValue::Null);
    }

    let out_of_range = || ValidationError::OutOfRange {
        column: column.to_string(),
        value: format!("{:?}", value),
        domain: domain.to_string(),
    };

    let stored = match domain {
        Domain::SmallInt => {
            let v = value.as_i64().ok_or_else(out_of_range)?;
            StoreValue::SmallInt(i16::try_from(v).map_err(|_| out_of_range())?)
        }
        Domain::Integer => {
            let v = value.as_i64().ok_or_else(out_of_range)?;
            StoreValue::Integer(i32::try_from(v).map_err(|_| out_of_range())?)
        }
        Domain::BigInt => StoreValue::BigInt(value.as_i64().ok_or_else(out_of_range)?),
        Domain::Real => StoreValue::Real(value.as_f64().ok_or_else(out_of_range)? as f32),
        Domain::Double => StoreValue::Float(value.as_f64().ok_or_else(out_of_range)?),
        Domain::Decimal { scale, .. } => {
            let text = decimal_text(value).ok_or_else(out_of_range)?;
            StoreValue::Decimal(normalize_decimal(&text, *scale).ok_or_else(out_of_range)?)
        }
        Domain::Enum { variants, repr } => match repr {
            EnumRepr::Ordinal => {
                let name = value.as_str().ok_or_else(out_of_range)?;
                let index = variants.iter().position(|v| v == name).ok_or_else(out_of_range)?;
                StoreValue::Integer(i32::try_from(index).map_err(|_| out_of_range())?)
            }
            EnumRepr::Name { .. } => value.clone(),
        },
        Domain::Array { element, .. } => {
            let normalized = normalize_elements(element, column, value)?;
            StoreValue::Text(encode_array(&normalized))
        }
        // instants are stored as UTC wall-clock time
        Domain::Timestamp => match value {
            StoreValue::Timestamp(ts) => StoreValue::DateTime(ts.naive_utc()),
            StoreValue::TimestampTz(ts) => StoreValue::DateTime(ts.naive_utc()),
            other => other.clone(),
        },
        Domain::TimestampTz => match value {
            StoreValue::Timestamp(ts) => StoreValue::TimestampTz(ts.fixed_offset()),
            other => other.clone(),
        },
        Domain::Custom(CustomDomain { base, .. }) => to_storage(base, column, value)?,
        _ => value.clone(),
    };

    Ok(stored)
}

fn normalize_elements(element: &Domain, column: &str, value: &StoreValue) -> Result<StoreValue, ValidationError> {
    match value {
        StoreValue::Array(items) => Ok(StoreValue::Array(
            items
                .iter()
                .map(|item| normalize_elements(element, column, item))
                .collect::<Result<_, _>>()?,
        )),
        leaf => to_storage(element, column, leaf),
    }
}

/// Rewrite a decimal literal with exactly `scale` fractional digits.
/// Returns `None` if the text is not a plain decimal or would lose digits.
pub fn normalize_decimal(text: &str, scale: u8) -> Option<String> {
    decimal_digits(text)?;
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > usize::from(scale) {
        return None;
    }

    let integer = integer.trim_start_matches('0');
    let integer = if integer.is_empty() { "0" } else { integer };
    let mut out = String::new();
    if negative && (integer != "0" || !fraction.is_empty()) {
        out.push('-');
    }
    out.push_str(integer);
    if scale > 0 {
        out.push('.');
        out.push_str(fraction);
        out.push_str(&"0".repeat(usize::from(scale) - fraction.len()));
    }
    Some(out)
}

fn from_storage(domain: &Domain, value: StoreValue) -> Result<StoreValue, DecodeError> {
    if value.is_null() {
        return Ok(StoreValue::Null);
    }

    let mismatch = |found: &StoreValue| DecodeError::TypeMismatch {
        domain: domain.to_string(),
        found: found.type_name().to_string(),
    };

    match domain {
        Domain::SmallInt => value
            .as_i64()
            .and_then(|v| i16::try_from(v).ok())
            .map(StoreValue::SmallInt)
            .ok_or_else(|| mismatch(&value)),
        Domain::Integer => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(StoreValue::Integer)
            .ok_or_else(|| mismatch(&value)),
        Domain::BigInt => value.as_i64().map(StoreValue::BigInt).ok_or_else(|| mismatch(&value)),
        Domain::Real => match value {
            StoreValue::Real(_) => Ok(value),
            StoreValue::Float(f) => Ok(StoreValue::Real(f as f32)),
            other => Err(mismatch(&other)),
        },
        Domain::Double => match value {
            StoreValue::Float(_) => Ok(value),
            StoreValue::Real(f) => Ok(StoreValue::Float(f64::from(f))),
            other => Err(mismatch(&other)),
        },
        Domain::Decimal { .. } => match value {
            StoreValue::Decimal(s) | StoreValue::Text(s) => Ok(StoreValue::Decimal(s)),
            other => Err(mismatch(&other)),
        },
        Domain::Enum { variants, repr } => match (repr, value) {
            (EnumRepr::Ordinal, stored) => {
                let ordinal = stored.as_i64().ok_or_else(|| mismatch(&stored))?;
                usize::try_from(ordinal)
                    .ok()
                    .and_then(|i| variants.get(i))
                    .map(|name| StoreValue::Text(name.clone()))
                    .ok_or(DecodeError::UnknownOrdinal(ordinal))
            }
            (EnumRepr::Name { .. }, StoreValue::Text(name)) => Ok(StoreValue::Text(name)),
            (EnumRepr::Name { .. }, other) => Err(mismatch(&other)),
        },
        Domain::Array {
            element,
            dimensions,
        } => match value {
            StoreValue::Text(literal) => decode_array(&literal, element_base(element), *dimensions),
            StoreValue::Array(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
        Domain::Timestamp => match value {
            StoreValue::Timestamp(_) => Ok(value),
            StoreValue::DateTime(naive) => Ok(StoreValue::Timestamp(naive.and_utc())),
            StoreValue::TimestampTz(ts) => Ok(StoreValue::Timestamp(ts.with_timezone(&Utc))),
            other => Err(mismatch(&other)),
        },
        Domain::TimestampTz => match value {
            StoreValue::TimestampTz(_) => Ok(value),
            StoreValue::Timestamp(ts) => Ok(StoreValue::TimestampTz(utc_offset(ts))),
            other => Err(mismatch(&other)),
        },
        Domain::Json => match value {
            StoreValue::Json(_) => Ok(value),
            StoreValue::Text(s) => serde_json::from_str(&s)
                .map(StoreValue::Json)
                .map_err(|_| DecodeError::TypeMismatch {
                    domain: domain.to_string(),
                    found: format!("'{}'", s),
                }),
            other => Err(mismatch(&other)),
        },
        Domain::Custom(custom) => from_storage(&custom.base, value),
        Domain::Boolean => expect_variant(value, |v| matches!(v, StoreValue::Boolean(_)), mismatch),
        Domain::Char(_) | Domain::Varchar(_) | Domain::Text => {
            expect_variant(value, |v| matches!(v, StoreValue::Text(_)), mismatch)
        }
        Domain::Binary(_) | Domain::LargeBinary => {
            expect_variant(value, |v| matches!(v, StoreValue::Bytes(_)), mismatch)
        }
        Domain::Date => expect_variant(value, |v| matches!(v, StoreValue::Date(_)), mismatch),
        Domain::Time => expect_variant(value, |v| matches!(v, StoreValue::Time(_)), mismatch),
        Domain::DateTime => expect_variant(value, |v| matches!(v, StoreValue::DateTime(_)), mismatch),
    }
}

fn expect_variant(
    value: StoreValue,
    accepts: impl Fn(&StoreValue) -> bool,
    mismatch: impl Fn(&StoreValue) -> DecodeError,
) -> Result<StoreValue, DecodeError> {
    if accepts(&value) {
        Ok(value)
    } else {
        Err(mismatch(&value))
    }
}

fn element_base(element: &Domain) -> &Domain {
    match element {
        Domain::Custom(custom) => element_base(&custom.base),
        other => other,
    }
}

fn utc_offset(ts: DateTime<Utc>) -> DateTime<FixedOffset> {
    ts.fixed_offset()
}

/// Named custom domains available to schema definitions
#[derive(Debug, Clone, Default)]
pub struct ColumnTypeRegistry {
    custom: HashMap<String, Domain>,
}

impl ColumnTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `email` domain: a `varchar(100)` that must
    /// look like `local@domain.tld`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("email", Domain::Varchar(100), Arc::new(PatternValidator::email()));
        registry
    }

    /// Register (or replace) a custom domain and return it
    pub fn register(
        &mut self,
        name: impl Into<String>,
        base: Domain,
        validator: Arc<dyn ValueValidator>,
    ) -> Domain {
        let name = name.into();
        let domain = Domain::custom(name.clone(), base, validator);
        self.custom.insert(name, domain.clone());
        domain
    }

    pub fn custom(&self, name: &str) -> Option<Domain> {
        self.custom.get(name).cloned()
    }

    pub fn resolve(&self, domain: &Domain) -> ResolvedType {
        resolve(domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_enum_by_ordinal_round_trip() {
        let resolved = resolve(&Domain::enum_by_ordinal(&["ADMIN", "USER", "GUEST"]));
        assert_eq!(resolved.storage, StorageType::Integer);
        let stored = resolved.encode("role", &StoreValue::from("GUEST")).unwrap();
        assert_eq!(stored, StoreValue::Integer(2));
        assert_eq!(resolved.from_storage(stored).unwrap(), StoreValue::from("GUEST"));
        assert_eq!(
            resolved.from_storage(StoreValue::Integer(7)),
            Err(DecodeError::UnknownOrdinal(7))
        );
    }

    #[test]
    fn test_enum_by_name_length_limit() {
        let resolved = resolve(&Domain::enum_by_name(4, &["USER", "ADMIN"]));
        assert_eq!(resolved.storage, StorageType::Varchar(4));
        assert!(resolved.encode("role", &StoreValue::from("USER")).is_ok());
        assert!(matches!(
            resolved.encode("role", &StoreValue::from("ADMIN")),
            Err(ValidationError::TooLong { .. })
        ));
        assert!(matches!(
            resolved.encode("role", &StoreValue::from("ROOT")),
            Err(ValidationError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn test_integer_width_conversion() {
        let resolved = resolve(&Domain::SmallInt);
        assert_eq!(
            resolved.encode("height", &StoreValue::Integer(175)).unwrap(),
            StoreValue::SmallInt(175)
        );
        let resolved = resolve(&Domain::BigInt);
        assert_eq!(
            resolved.encode("id", &StoreValue::Integer(1)).unwrap(),
            StoreValue::BigInt(1)
        );
    }

    #[test]
    fn test_decimal_normalization() {
        assert_eq!(normalize_decimal("42", 2).as_deref(), Some("42.00"));
        assert_eq!(normalize_decimal("0012.3", 2).as_deref(), Some("12.30"));
        assert_eq!(normalize_decimal("-.5", 2).as_deref(), Some("-0.50"));
        assert_eq!(normalize_decimal("-0.0", 2).as_deref(), Some("0.00"));
        assert_eq!(normalize_decimal("7.25", 0), None);

        let resolved = resolve(&Domain::decimal(12, 2));
        assert_eq!(
            resolved.encode("balance", &StoreValue::Float(1234.5)).unwrap(),
            StoreValue::decimal("1234.50")
        );
    }

    #[test]
    fn test_array_storage_round_trip() {
        let resolved = resolve(&Domain::array_with_dimensions(Domain::Integer, 2));
        let matrix = StoreValue::from(vec![vec![1, 2], vec![3, 4]]);
        let stored = resolved.encode("matrix", &matrix).unwrap();
        assert_eq!(stored, StoreValue::from("{{1,2},{3,4}}"));
        assert_eq!(resolved.from_storage(stored).unwrap(), matrix);
    }

    #[test]
    fn test_array_elements_normalized_to_width() {
        let resolved = resolve(&Domain::array(Domain::SmallInt));
        let stored = resolved.encode("small", &StoreValue::from(vec![1, 2])).unwrap();
        assert_eq!(stored, StoreValue::from("{1,2}"));
        assert_eq!(
            resolved.from_storage(stored).unwrap(),
            StoreValue::Array(vec![StoreValue::SmallInt(1), StoreValue::SmallInt(2)])
        );
    }

    #[test]
    fn test_email_domain_from_registry() {
        let registry = ColumnTypeRegistry::with_builtins();
        let email = registry.custom("email").unwrap();
        let resolved = registry.resolve(&email);
        assert_eq!(resolved.storage, StorageType::Varchar(100));
        assert!(resolved.encode("email", &StoreValue::from("john@example.com")).is_ok());
        assert!(resolved.encode("email", &StoreValue::from("john.example.com")).is_err());
        assert!(resolved.encode("email", &StoreValue::Null).is_err());
        assert!(registry.custom("phone").is_none());
    }

    #[test]
    fn test_timestamp_stored_without_zone() {
        let resolved = resolve(&Domain::Timestamp);
        assert_eq!(resolved.storage, StorageType::Timestamp);
        assert_eq!(resolved.storage.to_sql(), "TIMESTAMP");

        let instant = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
            .and_utc();
        let offset = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let stored = resolved
            .encode("timestamp", &StoreValue::TimestampTz(instant.with_timezone(&offset)))
            .unwrap();
        assert_eq!(stored, StoreValue::DateTime(instant.naive_utc()));
        assert_eq!(resolved.from_storage(stored).unwrap(), StoreValue::Timestamp(instant));
    }

    #[test]
    fn test_decode_rejects_wrong_storage() {
        let resolved = resolve(&Domain::Date);
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            resolved.from_storage(StoreValue::Date(date)).unwrap(),
            StoreValue::Date(date)
        );
        assert!(resolved.from_storage(StoreValue::from("2024-01-31")).is_err());
    }
}
