//! Value validation
//!
//! Every column carries a `Validator` synthesized from its domain. The same
//! validator runs when an entity is encoded and when a literal is bound as a
//! statement parameter, so both paths accept and reject exactly the same
//! values.

use crate::errors::ValidationError;
use crate::types::StoreValue;
use regex::Regex;
use std::fmt::Debug;
use std::sync::{Arc, LazyLock};

// word characters are ASCII only
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9_.-]+@[A-Za-z0-9_.-]+\.[A-Za-z0-9_]+$";

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"));

/// Application-supplied validation for custom domains.
///
/// Unlike built-in validators, a custom validator also sees `Null`, so it can
/// reject missing values on its own.
pub trait ValueValidator: Send + Sync + Debug {
    fn validate(&self, column: &str, value: &StoreValue) -> Result<(), ValidationError>;
}

/// Accepts text values matching a regular expression; rejects null
#[derive(Debug, Clone)]
pub struct PatternValidator {
    description: String,
    pattern: Regex,
}

impl PatternValidator {
    pub fn new(description: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            description: description.into(),
            pattern: Regex::new(pattern)?,
        })
    }

    /// `local@domain.tld` with a permissive character class
    pub fn email() -> Self {
        Self {
            description: "email".to_string(),
            pattern: EMAIL_REGEX.clone(),
        }
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.pattern.is_match(candidate)
    }
}

impl ValueValidator for PatternValidator {
    fn validate(&self, column: &str, value: &StoreValue) -> Result<(), ValidationError> {
        match value {
            StoreValue::Text(s) if self.is_match(s) => Ok(()),
            StoreValue::Text(s) => Err(ValidationError::Invalid {
                column: column.to_string(),
                reason: format!("'{}' is not a valid {}", s, self.description),
            }),
            other => Err(ValidationError::Invalid {
                column: column.to_string(),
                reason: format!("{} is not a valid {}", other.type_name(), self.description),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
    Timestamp,
    TimestampTz,
}

/// Validation rule synthesized from a domain
#[derive(Debug, Clone)]
pub enum Validator {
    Integer { min: i64, max: i64 },
    Float { single: bool },
    Decimal { precision: u8, scale: u8 },
    Boolean,
    FixedLength(u32),
    MaxLength(Option<u32>),
    Binary(Option<u32>),
    Enum {
        variants: Vec<String>,
        max_length: Option<u32>,
    },
    Array {
        element: Box<Validator>,
        dimensions: u8,
    },
    Temporal(TemporalKind),
    Json,
    Custom {
        base: Box<Validator>,
        check: Arc<dyn ValueValidator>,
    },
}

impl Validator {
    /// Check one value. Null passes every built-in rule; nullability is the
    /// codec's concern.
    pub fn check(&self, column: &str, value: &StoreValue) -> Result<(), ValidationError> {
        if let Validator::Custom { base, check } = self {
            base.check(column, value)?;
            return check.validate(column, value);
        }
        if value.is_null() {
            return Ok(());
        }

        match self {
            Validator::Integer { min, max } => {
                let v = value.as_i64().ok_or_else(|| mismatch(column, "integer", value))?;
                if v < *min || v > *max {
                    return Err(ValidationError::OutOfRange {
                        column: column.to_string(),
                        value: v.to_string(),
                        domain: format!("{}..={}", min, max),
                    });
                }
                Ok(())
            }
            Validator::Float { single } => {
                let v = match value {
                    StoreValue::Real(_) | StoreValue::Float(_) => value.as_f64(),
                    other => other.as_i64().map(|i| i as f64),
                }
                .ok_or_else(|| mismatch(column, "floating point number", value))?;
                if *single && (!v.is_finite() || v.abs() > f64::from(f32::MAX)) {
                    return Err(ValidationError::OutOfRange {
                        column: column.to_string(),
                        value: v.to_string(),
                        domain: "float32".to_string(),
                    });
                }
                Ok(())
            }
            Validator::Decimal { precision, scale } => {
                let text = decimal_text(value).ok_or_else(|| mismatch(column, "decimal", value))?;
                let (integer_digits, fraction_digits) =
                    decimal_digits(&text).ok_or_else(|| mismatch(column, "decimal", value))?;
                if fraction_digits > usize::from(*scale)
                    || integer_digits > usize::from(precision.saturating_sub(*scale))
                {
                    return Err(ValidationError::PrecisionExceeded {
                        column: column.to_string(),
                        value: text,
                        precision: *precision,
                        scale: *scale,
                    });
                }
                Ok(())
            }
            Validator::Boolean => match value {
                StoreValue::Boolean(_) => Ok(()),
                other => Err(mismatch(column, "boolean", other)),
            },
            Validator::FixedLength(n) => {
                let s = text(column, value)?;
                let actual = s.chars().count();
                if actual != *n as usize {
                    return Err(ValidationError::LengthMismatch {
                        column: column.to_string(),
                        expected: *n,
                        actual,
                    });
                }
                Ok(())
            }
            Validator::MaxLength(limit) => {
                let s = text(column, value)?;
                check_max(column, *limit, s.len())
            }
            Validator::Binary(limit) => match value {
                StoreValue::Bytes(bytes) => check_max(column, *limit, bytes.len()),
                other => Err(mismatch(column, "binary", other)),
            },
            Validator::Enum {
                variants,
                max_length,
            } => {
                let name = text(column, value)?;
                if !variants.iter().any(|v| v == name) {
                    return Err(ValidationError::UnknownVariant {
                        column: column.to_string(),
                        value: name.to_string(),
                    });
                }
                check_max(column, *max_length, name.len())
            }
            Validator::Array {
                element,
                dimensions,
            } => check_array(column, element, *dimensions, value),
            Validator::Temporal(kind) => {
                let ok = matches!(
                    (kind, value),
                    (TemporalKind::Date, StoreValue::Date(_))
                        | (TemporalKind::Time, StoreValue::Time(_))
                        | (TemporalKind::DateTime, StoreValue::DateTime(_))
                        | (TemporalKind::Timestamp, StoreValue::Timestamp(_))
                        | (TemporalKind::Timestamp, StoreValue::TimestampTz(_))
                        | (TemporalKind::TimestampTz, StoreValue::TimestampTz(_))
                        | (TemporalKind::TimestampTz, StoreValue::Timestamp(_))
                );
                if ok {
                    Ok(())
                } else {
                    Err(mismatch(column, &format!("{:?}", kind).to_lowercase(), value))
                }
            }
            Validator::Json => match value {
                StoreValue::Json(_) => Ok(()),
                other => Err(mismatch(column, "json", other)),
            },
            Validator::Custom { .. } => Ok(()),
        }
    }
}

fn mismatch(column: &str, expected: &str, found: &StoreValue) -> ValidationError {
    ValidationError::TypeMismatch {
        column: column.to_string(),
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

fn text<'a>(column: &str, value: &'a StoreValue) -> Result<&'a str, ValidationError> {
    match value {
        StoreValue::Text(s) => Ok(s),
        other => Err(mismatch(column, "text", other)),
    }
}

fn check_max(column: &str, limit: Option<u32>, actual: usize) -> Result<(), ValidationError> {
    match limit {
        Some(max) if actual > max as usize => Err(ValidationError::TooLong {
            column: column.to_string(),
            max,
            actual,
        }),
        _ => Ok(()),
    }
}

fn check_array(
    column: &str,
    element: &Validator,
    dimensions: u8,
    value: &StoreValue,
) -> Result<(), ValidationError> {
    // length of every array at each depth, fixed by the first one seen
    let mut shape = vec![None; usize::from(dimensions)];
    check_nested(column, element, dimensions, value, &mut shape)
}

fn check_nested(
    column: &str,
    element: &Validator,
    dimensions: u8,
    value: &StoreValue,
    shape: &mut [Option<usize>],
) -> Result<(), ValidationError> {
    let StoreValue::Array(items) = value else {
        return Err(mismatch(column, "array", value));
    };

    if let Some((length, inner_shape)) = shape.split_first_mut() {
        if *length.get_or_insert(items.len()) != items.len() {
            return Err(ValidationError::RaggedArray {
                column: column.to_string(),
            });
        }
        if dimensions > 1 {
            for item in items {
                if !matches!(item, StoreValue::Array(_)) {
                    return Err(ValidationError::DimensionMismatch {
                        column: column.to_string(),
                        expected: dimensions,
                        found: 1,
                    });
                }
                check_nested(column, element, dimensions - 1, item, inner_shape).map_err(|e| match e {
                    ValidationError::DimensionMismatch { found, .. } => ValidationError::DimensionMismatch {
                        column: column.to_string(),
                        expected: dimensions,
                        found: found + 1,
                    },
                    other => other,
                })?;
            }
            return Ok(());
        }
    }

    for item in items {
        if let StoreValue::Array(inner) = item {
            return Err(ValidationError::DimensionMismatch {
                column: column.to_string(),
                expected: dimensions,
                found: depth(inner) + 1,
            });
        }
        element.check(column, item)?;
    }
    Ok(())
}

fn depth(items: &[StoreValue]) -> usize {
    items
        .iter()
        .map(|item| match item {
            StoreValue::Array(inner) => depth(inner) + 1,
            _ => 1,
        })
        .max()
        .unwrap_or(1)
}

/// Textual form of a numeric value as it would be written to a decimal column
pub fn decimal_text(value: &StoreValue) -> Option<String> {
    match value {
        StoreValue::Decimal(s) => Some(s.trim().to_string()),
        StoreValue::Real(f) => f.is_finite().then(|| f.to_string()),
        StoreValue::Float(f) => f.is_finite().then(|| f.to_string()),
        other => other.as_i64().map(|i| i.to_string()),
    }
}

/// Count integer and fractional digits of a plain decimal literal.
/// Leading zeros of the integer part and trailing zeros of the fraction do
/// not count.
pub fn decimal_digits(text: &str) -> Option<(usize, usize)> {
    let unsigned = text.strip_prefix(&['-', '+'][..]).unwrap_or(text);
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    if !integer.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((
        integer.trim_start_matches('0').len(),
        fraction.trim_end_matches('0').len(),
    ))
}
