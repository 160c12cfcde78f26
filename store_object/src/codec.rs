//! Value codec
//!
//! Converts records of domain values into storage parameters and back. Every
//! value headed for the store, whether part of an entity or a literal inside
//! a condition or assignment, passes through `bind`, so the same validator
//! accepts and rejects it in both places.

use crate::errors::{DataError, QueryError};
use crate::query_builder::{Condition, Expr, JoinClause, Operand};
use crate::record::Record;
use crate::schema::{Column, ColumnDefault, DefaultExpression, Schema};
use type_mapping::{DecodeError, StoreValue, ValidationError};

/// A value to write into one column of one row
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Value(StoreValue),
    /// Evaluated by the store at write time
    Expression(DefaultExpression),
    /// Left for the store to generate (auto-increment key)
    Generated,
}

impl Param {
    pub fn as_value(&self) -> Option<&StoreValue> {
        match self {
            Param::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Storage parameters for one row, in schema column order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodedRow {
    values: Vec<(String, Param)>,
}

impl EncodedRow {
    pub fn get(&self, column: &str) -> Option<&Param> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, param)| param)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.values.iter().map(|(name, param)| (name.as_str(), param))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Validate one value against its column and convert it to storage form
pub fn bind(column: &Column, value: &StoreValue) -> Result<StoreValue, ValidationError> {
    column.resolved().encode(column.name(), value)
}

/// Encode a record for `schema`. Every column is resolved before anything is
/// returned, so a failure leaves no partial output.
///
/// A column whose value is absent or null takes, in order: its default, a
/// null if it is nullable, a generated value if it auto-increments, and
/// otherwise fails with `MissingRequiredValue`.
pub fn encode(schema: &Schema, record: &Record) -> Result<EncodedRow, DataError> {
    if let Some(unknown) = record.columns().find(|c| !schema.has_column(c)) {
        return Err(QueryError::UnknownColumn {
            table: schema.table_name().to_string(),
            column: unknown.to_string(),
        }
        .into());
    }

    let mut values = Vec::with_capacity(schema.columns().len());
    for column in schema.columns() {
        let value = record.get(column.name()).filter(|v| !v.is_null());
        let param = match value {
            Some(value) => Param::Value(bind(column, value)?),
            None => encode_absent(column)?,
        };
        values.push((column.name().to_string(), param));
    }

    Ok(EncodedRow { values })
}

fn encode_absent(column: &Column) -> Result<Param, ValidationError> {
    match column.column_default() {
        Some(ColumnDefault::Value(value)) => return Ok(Param::Value(value.clone())),
        Some(ColumnDefault::Expression(expression)) => return Ok(Param::Expression(*expression)),
        None => {}
    }

    if column.is_nullable() {
        // custom validators decide whether they accept null
        return bind(column, &StoreValue::Null).map(Param::Value);
    }
    if column.is_auto_increment() {
        return Ok(Param::Generated);
    }
    Err(ValidationError::MissingRequiredValue {
        column: column.name().to_string(),
    })
}

/// Convert a stored row of `schema` back to domain values
pub fn decode(schema: &Schema, record: Record) -> Result<Record, DecodeError> {
    let mut fields: Vec<(String, StoreValue)> = record.into_fields();
    let mut decoded = Record::with_capacity(schema.columns().len());
    for column in schema.columns() {
        let position = fields
            .iter()
            .position(|(name, _)| name == column.name())
            .ok_or_else(|| DecodeError::MissingColumn(column.name().to_string()))?;
        let (name, value) = fields.swap_remove(position);
        decoded.insert(name, column.resolved().from_storage(value)?);
    }
    Ok(decoded)
}

/// Decode whatever keys of `record` name a column in scope, qualified or
/// not. Other keys, such as aggregate aliases, pass through unchanged.
pub fn decode_lenient(scope: &Scope<'_>, record: Record) -> Result<Record, DecodeError> {
    record
        .into_fields()
        .into_iter()
        .map(|(name, value)| match scope.lookup(&name) {
            Some((_, column)) => Ok((name, column.resolved().from_storage(value)?)),
            None => Ok((name, value)),
        })
        .collect()
}

/// Tables visible to a statement: the base table followed by joined tables
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    base: &'a Schema,
    joined: Vec<&'a Schema>,
}

impl<'a> Scope<'a> {
    pub fn single(base: &'a Schema) -> Self {
        Self {
            base,
            joined: Vec::new(),
        }
    }

    pub fn with_joins(base: &'a Schema, joins: &'a [JoinClause]) -> Self {
        Self {
            base,
            joined: joins.iter().map(|j| j.schema.as_ref()).collect(),
        }
    }

    pub fn base(&self) -> &'a Schema {
        self.base
    }

    pub fn is_joined(&self) -> bool {
        !self.joined.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = &'a Schema> + '_ {
        std::iter::once(self.base).chain(self.joined.iter().copied())
    }

    /// Find a column by `table.column` or by bare name, base table first
    pub fn lookup(&self, name: &str) -> Option<(&'a Schema, &'a Column)> {
        match name.split_once('.') {
            Some((table, column)) => self
                .tables()
                .find(|s| s.table_name() == table)
                .and_then(|s| s.column(column).map(|c| (s, c))),
            None => self
                .tables()
                .find_map(|s| s.column(name).map(|c| (s, c))),
        }
    }

    pub fn resolve(&self, name: &str) -> Result<(&'a Schema, &'a Column), QueryError> {
        self.lookup(name).ok_or_else(|| QueryError::UnknownColumn {
            table: self.base.table_name().to_string(),
            column: name.to_string(),
        })
    }

    /// Name under which the column is referenced in statements: bare for a
    /// single table, `table.column` once joins are involved
    pub fn reference(&self, name: &str) -> Result<String, QueryError> {
        let (schema, column) = self.resolve(name)?;
        Ok(if self.is_joined() {
            format!("{}.{}", schema.table_name(), column.name())
        } else {
            column.name().to_string()
        })
    }
}

/// Validate a condition against the tables in scope and convert its literals
/// to storage form. Pattern operands are not validated.
pub fn bind_condition(scope: &Scope<'_>, condition: &Condition) -> Result<Condition, DataError> {
    condition
        .check_shape()
        .map_err(QueryError::MalformedCondition)?;
    bind_node(scope, condition, &no_alias)
}

fn no_alias(_: &str) -> Option<String> {
    None
}

/// Like `bind_condition`, but columns unknown to the scope may name output
/// aliases (HAVING); their literals are kept as given.
pub fn bind_having(
    scope: &Scope<'_>,
    condition: &Condition,
    aliases: &[String],
) -> Result<Condition, DataError> {
    condition
        .check_shape()
        .map_err(QueryError::MalformedCondition)?;
    let alias_of = |name: &str| aliases.iter().find(|a| *a == name).cloned();
    bind_node(scope, condition, &alias_of)
}

fn bind_node(
    scope: &Scope<'_>,
    condition: &Condition,
    alias_of: &dyn Fn(&str) -> Option<String>,
) -> Result<Condition, DataError> {
    match condition {
        Condition::All => Ok(Condition::All),
        Condition::And(left, right) => Ok(Condition::And(
            Box::new(bind_node(scope, left, alias_of)?),
            Box::new(bind_node(scope, right, alias_of)?),
        )),
        Condition::Or(left, right) => Ok(Condition::Or(
            Box::new(bind_node(scope, left, alias_of)?),
            Box::new(bind_node(scope, right, alias_of)?),
        )),
        Condition::Predicate {
            column,
            operator,
            operand,
        } => {
            if scope.lookup(column).is_none() {
                if let Some(alias) = alias_of(column) {
                    return Ok(Condition::Predicate {
                        column: alias,
                        operator: *operator,
                        operand: operand.clone(),
                    });
                }
            }
            let (_, target) = scope.resolve(column)?;
            let operand = bind_operand(target, operand)?;
            Ok(Condition::Predicate {
                column: scope.reference(column)?,
                operator: *operator,
                operand,
            })
        }
    }
}

fn bind_operand(column: &Column, operand: &Operand) -> Result<Operand, ValidationError> {
    Ok(match operand {
        Operand::Value(v) => Operand::Value(bind(column, v)?),
        Operand::Range(low, high) => Operand::Range(bind(column, low)?, bind(column, high)?),
        Operand::List(values) => Operand::List(
            values
                .iter()
                .map(|v| bind(column, v))
                .collect::<Result<_, _>>()?,
        ),
        Operand::None | Operand::Pattern(_) => operand.clone(),
    })
}

/// Validate an assignment to `target` in `schema`. Literals are bound
/// through the target column; column references must exist. `Incoming` is
/// only allowed in upsert merges.
pub fn bind_assignment(
    schema: &Schema,
    target: &str,
    expr: &Expr,
    allow_incoming: bool,
) -> Result<Expr, DataError> {
    let column = schema.column(target).ok_or_else(|| QueryError::UnknownColumn {
        table: schema.table_name().to_string(),
        column: target.to_string(),
    })?;
    bind_expr(schema, column, expr, allow_incoming)
}

fn bind_expr(schema: &Schema, target: &Column, expr: &Expr, allow_incoming: bool) -> Result<Expr, DataError> {
    let known = |name: &str| -> Result<(), QueryError> {
        if schema.has_column(name) {
            Ok(())
        } else {
            Err(QueryError::UnknownColumn {
                table: schema.table_name().to_string(),
                column: name.to_string(),
            })
        }
    };
    let pair = |l: &Expr, r: &Expr| -> Result<(Box<Expr>, Box<Expr>), DataError> {
        Ok((
            Box::new(bind_expr(schema, target, l, allow_incoming)?),
            Box::new(bind_expr(schema, target, r, allow_incoming)?),
        ))
    };

    Ok(match expr {
        Expr::Literal(value) => Expr::Literal(bind(target, value)?),
        Expr::Existing(name) => {
            known(name)?;
            Expr::Existing(name.clone())
        }
        Expr::Incoming(name) => {
            if !allow_incoming {
                return Err(QueryError::InvalidExpression(format!(
                    "incoming value of '{}' is only available in an upsert",
                    name
                ))
                .into());
            }
            known(name)?;
            Expr::Incoming(name.clone())
        }
        Expr::Expression(e) => Expr::Expression(*e),
        Expr::Concat(parts) => Expr::Concat(
            parts
                .iter()
                .map(|p| bind_expr(schema, target, p, allow_incoming))
                .collect::<Result<_, _>>()?,
        ),
        Expr::Add(l, r) => {
            let (l, r) = pair(l, r)?;
            Expr::Add(l, r)
        }
        Expr::Subtract(l, r) => {
            let (l, r) = pair(l, r)?;
            Expr::Subtract(l, r)
        }
        Expr::Multiply(l, r) => {
            let (l, r) = pair(l, r)?;
            Expr::Multiply(l, r)
        }
        Expr::Divide(l, r) => {
            let (l, r) = pair(l, r)?;
            Expr::Divide(l, r)
        }
    })
}
