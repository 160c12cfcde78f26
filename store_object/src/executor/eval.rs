//! Row-level evaluation for the in-memory executor
//!
//! Conditions follow SQL three-valued logic: `None` stands for UNKNOWN, and
//! only rows evaluating to `Some(true)` are selected.

use crate::errors::{ExecutorError, QueryError};
use crate::query_builder::{Condition, Expr, Operand, Operator, SortOrder};
use crate::record::Record;
use crate::schema::Column;
use regex::Regex;
use std::cmp::Ordering;
use type_mapping::{StorageType, StoreValue, ValidationError};

static NULL: StoreValue = StoreValue::Null;

fn value_of<'r>(row: &'r Record, column: &str) -> &'r StoreValue {
    row.get(column).unwrap_or(&NULL)
}

/// Evaluate `condition` against one row
pub fn matches(condition: &Condition, row: &Record) -> Result<Option<bool>, ExecutorError> {
    match condition {
        Condition::All => Ok(Some(true)),
        Condition::And(left, right) => {
            let left = matches(left, row)?;
            if left == Some(false) {
                return Ok(Some(false));
            }
            Ok(match (left, matches(right, row)?) {
                (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            })
        }
        Condition::Or(left, right) => {
            let left = matches(left, row)?;
            if left == Some(true) {
                return Ok(Some(true));
            }
            Ok(match (left, matches(right, row)?) {
                (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            })
        }
        Condition::Predicate {
            column,
            operator,
            operand,
        } => predicate(value_of(row, column), *operator, operand),
    }
}

fn compare(value: &StoreValue, other: &StoreValue) -> Option<Ordering> {
    if value.is_null() || other.is_null() {
        return None;
    }
    value.compare(other)
}

fn predicate(
    value: &StoreValue,
    operator: Operator,
    operand: &Operand,
) -> Result<Option<bool>, ExecutorError> {
    let malformed = || {
        ExecutorError::Query(QueryError::MalformedCondition(format!(
            "{:?} cannot take {:?}",
            operator, operand
        )))
    };

    let result = match (operator, operand) {
        (Operator::IsNull, _) => Some(value.is_null()),
        (Operator::IsNotNull, _) => Some(!value.is_null()),
        (Operator::Eq, Operand::Value(v)) => compare(value, v).map(|o| o == Ordering::Equal),
        (Operator::Neq, Operand::Value(v)) => compare(value, v).map(|o| o != Ordering::Equal),
        (Operator::Less, Operand::Value(v)) => compare(value, v).map(|o| o == Ordering::Less),
        (Operator::LessEq, Operand::Value(v)) => compare(value, v).map(|o| o != Ordering::Greater),
        (Operator::Greater, Operand::Value(v)) => compare(value, v).map(|o| o == Ordering::Greater),
        (Operator::GreaterEq, Operand::Value(v)) => compare(value, v).map(|o| o != Ordering::Less),
        (Operator::Between, Operand::Range(low, high)) => {
            let above = compare(value, low).map(|o| o != Ordering::Less);
            let below = compare(value, high).map(|o| o != Ordering::Greater);
            match (above, below) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            }
        }
        (Operator::Like, Operand::Pattern(p)) => text_match(value, &like_regex(p)?)?,
        (Operator::NotLike, Operand::Pattern(p)) => text_match(value, &like_regex(p)?)?.map(|m| !m),
        (Operator::RegexMatch, Operand::Pattern(p)) => text_match(value, &compile(p)?)?,
        (Operator::InList, Operand::List(values)) => in_list(value, values),
        (Operator::NotInList, Operand::List(values)) => in_list(value, values).map(|m| !m),
        _ => return Err(malformed()),
    };
    Ok(result)
}

/// SQL `IN`: true on any match, unknown if no match but a null is involved
fn in_list(value: &StoreValue, values: &[StoreValue]) -> Option<bool> {
    if values.is_empty() {
        return Some(false);
    }
    if value.is_null() {
        return None;
    }
    let mut unknown = false;
    for candidate in values {
        match value.sql_eq(candidate) {
            Some(true) => return Some(true),
            Some(false) => {}
            None => unknown = true,
        }
    }
    if unknown {
        None
    } else {
        Some(false)
    }
}

fn text_match(value: &StoreValue, regex: &Regex) -> Result<Option<bool>, ExecutorError> {
    if value.is_null() {
        return Ok(None);
    }
    match value.as_str() {
        Some(text) => Ok(Some(regex.is_match(text))),
        None => Err(ExecutorError::InvalidValue(format!(
            "pattern match on non-text value {:?}",
            value
        ))),
    }
}

fn compile(pattern: &str) -> Result<Regex, ExecutorError> {
    Regex::new(pattern)
        .map_err(|e| QueryError::MalformedCondition(format!("invalid pattern '{}': {}", pattern, e)).into())
}

/// Translate a LIKE pattern into an anchored regular expression
pub fn like_to_regex(pattern: &str) -> String {
    let mut out = String::from("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => {
                let escaped = chars.next().unwrap_or('\\');
                out.push_str(&regex::escape(&escaped.to_string()));
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

fn like_regex(pattern: &str) -> Result<Regex, ExecutorError> {
    compile(&like_to_regex(pattern))
}

/// Evaluate an assignment expression for `target`. `incoming` is the
/// proposed row of an upsert, `existing` the stored row being updated.
pub fn evaluate(
    expr: &Expr,
    incoming: Option<&Record>,
    existing: &Record,
    target: &Column,
) -> Result<StoreValue, ExecutorError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Existing(column) => Ok(value_of(existing, column).clone()),
        Expr::Incoming(column) => incoming
            .map(|row| value_of(row, column).clone())
            .ok_or_else(|| {
                QueryError::InvalidExpression(format!("incoming value of '{}' outside an upsert", column))
                    .into()
            }),
        Expr::Expression(expression) => Ok(expression.evaluate()),
        Expr::Concat(parts) => {
            let mut text = String::new();
            for part in parts {
                let value = evaluate(part, incoming, existing, target)?;
                if value.is_null() {
                    return Ok(StoreValue::Null);
                }
                text.push_str(&concat_text(&value)?);
            }
            Ok(StoreValue::Text(text))
        }
        Expr::Add(l, r) => arithmetic(Arith::Add, l, r, incoming, existing, target),
        Expr::Subtract(l, r) => arithmetic(Arith::Subtract, l, r, incoming, existing, target),
        Expr::Multiply(l, r) => arithmetic(Arith::Multiply, l, r, incoming, existing, target),
        Expr::Divide(l, r) => arithmetic(Arith::Divide, l, r, incoming, existing, target),
    }
}

fn concat_text(value: &StoreValue) -> Result<String, ExecutorError> {
    if let Some(text) = value.as_str() {
        return Ok(text.to_string());
    }
    match value {
        StoreValue::SmallInt(v) => Ok(v.to_string()),
        StoreValue::Integer(v) => Ok(v.to_string()),
        StoreValue::BigInt(v) => Ok(v.to_string()),
        StoreValue::Real(v) => Ok(v.to_string()),
        StoreValue::Float(v) => Ok(v.to_string()),
        other => Err(ExecutorError::InvalidValue(format!("cannot concatenate {}", other.type_name()))),
    }
}

#[derive(Debug, Clone, Copy)]
enum Arith {
    Add,
    Subtract,
    Multiply,
    Divide,
}

fn arithmetic(
    op: Arith,
    left: &Expr,
    right: &Expr,
    incoming: Option<&Record>,
    existing: &Record,
    target: &Column,
) -> Result<StoreValue, ExecutorError> {
    let left = evaluate(left, incoming, existing, target)?;
    let right = evaluate(right, incoming, existing, target)?;
    if left.is_null() || right.is_null() {
        return Ok(StoreValue::Null);
    }

    let column = target.name();
    let invalid = |reason: &str| ExecutorError::InvalidValue(format!("{} on '{}'", reason, column));

    match target.storage() {
        StorageType::SmallInt | StorageType::Integer | StorageType::BigInt => {
            let (a, b) = match (left.as_i64(), right.as_i64()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(invalid("integer arithmetic on non-integer operands")),
            };
            let result = match op {
                Arith::Add => a.checked_add(b),
                Arith::Subtract => a.checked_sub(b),
                Arith::Multiply => a.checked_mul(b),
                Arith::Divide => {
                    if b == 0 {
                        return Err(invalid("division by zero"));
                    }
                    a.checked_div(b)
                }
            }
            .ok_or_else(|| invalid("integer overflow"))?;
            narrow_integer(result, target.storage()).ok_or_else(|| invalid("integer overflow"))
        }
        StorageType::Numeric { scale, .. } => {
            let (a, b) = match (decimal_operand(&left), decimal_operand(&right)) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(invalid("arithmetic on non-numeric operands")),
            };
            let result = decimal_arithmetic(op, a, b, u32::from(*scale)).map_err(|reason| invalid(reason))?;
            Ok(StoreValue::Decimal(format_decimal(result, u32::from(*scale))))
        }
        StorageType::Real | StorageType::DoublePrecision => {
            let (a, b) = match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(invalid("arithmetic on non-numeric operands")),
            };
            let result = match op {
                Arith::Add => a + b,
                Arith::Subtract => a - b,
                Arith::Multiply => a * b,
                Arith::Divide => {
                    if b == 0.0 {
                        return Err(invalid("division by zero"));
                    }
                    a / b
                }
            };
            if !result.is_finite() {
                return Err(invalid("numeric overflow"));
            }
            Ok(match target.storage() {
                StorageType::Real => StoreValue::Real(result as f32),
                _ => StoreValue::Float(result),
            })
        }
        other => Err(invalid(&format!("arithmetic on {} column", other))),
    }
}

/// A decimal as an unscaled integer and its number of fractional digits
type Scaled = (i128, u32);

fn parse_decimal(text: &str) -> Option<Scaled> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }
    let mut unscaled: i128 = 0;
    for c in integer.chars().chain(fraction.chars()) {
        let digit = c.to_digit(10)?;
        unscaled = unscaled.checked_mul(10)?.checked_add(i128::from(digit))?;
    }
    let scale = u32::try_from(fraction.len()).ok()?;
    Some((if negative { -unscaled } else { unscaled }, scale))
}

fn decimal_operand(value: &StoreValue) -> Option<Scaled> {
    match value {
        StoreValue::Decimal(s) | StoreValue::Text(s) => parse_decimal(s),
        StoreValue::Real(v) => parse_decimal(&v.to_string()),
        StoreValue::Float(v) => parse_decimal(&v.to_string()),
        other => other.as_i64().map(|v| (i128::from(v), 0)),
    }
}

fn pow10(exponent: u32) -> Option<i128> {
    10i128.checked_pow(exponent)
}

/// `numerator / denominator`, rounding half away from zero
fn divide_rounded(numerator: i128, denominator: i128) -> Option<i128> {
    let quotient = numerator.checked_div(denominator)?;
    let remainder = numerator.checked_rem(denominator)?;
    if remainder.unsigned_abs().checked_mul(2)? >= denominator.unsigned_abs() {
        let away = if (numerator < 0) == (denominator < 0) { 1 } else { -1 };
        quotient.checked_add(away)
    } else {
        Some(quotient)
    }
}

/// Change the scale of `value`, rounding half away from zero when digits
/// are dropped
fn rescale((unscaled, scale): Scaled, target: u32) -> Option<i128> {
    if target >= scale {
        unscaled.checked_mul(pow10(target - scale)?)
    } else {
        divide_rounded(unscaled, pow10(scale - target)?)
    }
}

/// Exact decimal arithmetic, returning the unscaled result at `scale`
fn decimal_arithmetic(op: Arith, a: Scaled, b: Scaled, scale: u32) -> Result<i128, &'static str> {
    const OVERFLOW: &str = "numeric overflow";
    match op {
        Arith::Add | Arith::Subtract => {
            let common = a.1.max(b.1);
            let left = rescale(a, common).ok_or(OVERFLOW)?;
            let right = rescale(b, common).ok_or(OVERFLOW)?;
            let sum = match op {
                Arith::Add => left.checked_add(right),
                _ => left.checked_sub(right),
            }
            .ok_or(OVERFLOW)?;
            rescale((sum, common), scale).ok_or(OVERFLOW)
        }
        Arith::Multiply => {
            let product = a.0.checked_mul(b.0).ok_or(OVERFLOW)?;
            rescale((product, a.1 + b.1), scale).ok_or(OVERFLOW)
        }
        Arith::Divide => {
            if b.0 == 0 {
                return Err("division by zero");
            }
            // a / b at `scale` is a.0 * 10^(scale + b.1 - a.1) / b.0
            let shift = i64::from(scale) + i64::from(b.1) - i64::from(a.1);
            let (numerator, denominator) = if shift >= 0 {
                let factor = pow10(u32::try_from(shift).map_err(|_| OVERFLOW)?).ok_or(OVERFLOW)?;
                (a.0.checked_mul(factor).ok_or(OVERFLOW)?, b.0)
            } else {
                let factor = pow10(u32::try_from(-shift).map_err(|_| OVERFLOW)?).ok_or(OVERFLOW)?;
                (a.0, b.0.checked_mul(factor).ok_or(OVERFLOW)?)
            };
            divide_rounded(numerator, denominator).ok_or(OVERFLOW)
        }
    }
}

fn format_decimal(unscaled: i128, scale: u32) -> String {
    let digits = unscaled.unsigned_abs().to_string();
    let width = scale as usize + 1;
    let digits = if digits.len() < width {
        format!("{}{}", "0".repeat(width - digits.len()), digits)
    } else {
        digits
    };
    let (integer, fraction) = digits.split_at(digits.len() - scale as usize);
    let sign = if unscaled < 0 { "-" } else { "" };
    if fraction.is_empty() {
        format!("{}{}", sign, integer)
    } else {
        format!("{}{}.{}", sign, integer, fraction)
    }
}

/// Fit an integer into the width of an integer storage type
pub fn narrow_integer(value: i64, storage: &StorageType) -> Option<StoreValue> {
    match storage {
        StorageType::SmallInt => i16::try_from(value).ok().map(StoreValue::SmallInt),
        StorageType::Integer => i32::try_from(value).ok().map(StoreValue::Integer),
        StorageType::BigInt => Some(StoreValue::BigInt(value)),
        _ => None,
    }
}

/// Re-check a computed value against the type of `column` and return it in
/// storage form. Nulls are left to the NOT NULL check.
pub fn conform(column: &Column, value: StoreValue) -> Result<StoreValue, ExecutorError> {
    if value.is_null() {
        return Ok(value);
    }
    let resolved = column.resolved();
    let found = value.type_name();
    let domain_value = resolved
        .from_storage(value)
        .map_err(|_| ValidationError::TypeMismatch {
            column: column.name().to_string(),
            expected: resolved.domain.to_string(),
            found: found.to_string(),
        })?;
    Ok(resolved.encode(column.name(), &domain_value)?)
}

/// Ordering used by ORDER BY: ascending puts nulls last, descending first
pub fn sort_cmp(a: &StoreValue, b: &StoreValue, order: SortOrder) -> Ordering {
    let ascending = match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.compare(b).unwrap_or(Ordering::Equal),
    };
    match order {
        SortOrder::Asc => ascending,
        SortOrder::Desc => ascending.reverse(),
    }
}

/// Equality used for grouping and DISTINCT, where nulls are equal
pub fn same_value(a: &StoreValue, b: &StoreValue) -> bool {
    match (a.is_null(), b.is_null()) {
        (true, true) => true,
        (false, false) => a.compare(b) == Some(Ordering::Equal),
        _ => false,
    }
}
