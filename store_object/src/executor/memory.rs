//! In-process executor
//!
//! Keeps every table as a vector of rows in storage form, keyed by bare
//! column names. Statements are applied atomically: a failing statement
//! leaves every table exactly as it was. Values computed by update and
//! merge expressions are checked against their column type before they are
//! stored.

use super::eval::{self, conform, evaluate, matches, narrow_integer, same_value, sort_cmp};
use super::StatementExecutor;
use crate::codec::{EncodedRow, Param};
use crate::errors::{ConstraintKind, ExecutorError, QueryError};
use crate::query_builder::{AggregateFunction, JoinClause, JoinType, SelectField, SortOrder};
use crate::record::Record;
use crate::schema::Schema;
use crate::statement::{
    merge_assignments, DeleteStatement, InsertStatement, OnConflict, SelectStatement, Statement,
    StatementOutcome, UpdateStatement,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use type_mapping::StoreValue;

#[derive(Debug)]
struct MemoryTable {
    schema: Arc<Schema>,
    rows: Vec<Record>,
    /// Last value handed out for an auto-increment key
    sequence: i64,
}

impl MemoryTable {
    fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            sequence: 0,
        }
    }

    fn position_of(&self, key: &StoreValue) -> Option<usize> {
        let pk = self.schema.primary_key_name();
        self.rows
            .iter()
            .position(|row| row.get(pk).is_some_and(|v| same_value(v, key)))
    }
}

type Tables = HashMap<String, MemoryTable>;

/// Executor backed by in-process tables. Share one instance between stores
/// behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: RwLock<Tables>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored in `table`
    pub async fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.read().await.get(table).map(|t| t.rows.len())
    }
}

#[async_trait]
impl StatementExecutor for MemoryExecutor {
    async fn execute(&self, statement: &Statement) -> Result<StatementOutcome, ExecutorError> {
        tracing::debug!("[{}] Table: {}", statement.kind(), statement.table_name());

        let outcome = match statement {
            Statement::CreateTable(schema) => {
                let mut tables = self.tables.write().await;
                tables
                    .entry(schema.table_name().to_string())
                    .or_insert_with(|| MemoryTable::new(schema.clone()));
                StatementOutcome::affected(0)
            }
            Statement::Select(select) => {
                let tables = self.tables.read().await;
                run_select(&tables, select)?
            }
            Statement::Insert(insert) => {
                let mut tables = self.tables.write().await;
                run_insert(&mut tables, insert)?
            }
            Statement::Update(update) => {
                let mut tables = self.tables.write().await;
                run_update(&mut tables, update)?
            }
            Statement::Delete(delete) => {
                let mut tables = self.tables.write().await;
                run_delete(&mut tables, delete)?
            }
        };

        crate::debug_log!(
            "[{}] Completed on {}: {} row(s)",
            statement.kind(),
            statement.table_name(),
            outcome.rows_affected
        );
        Ok(outcome)
    }
}

fn table<'t>(tables: &'t Tables, name: &str) -> Result<&'t MemoryTable, ExecutorError> {
    tables
        .get(name)
        .ok_or_else(|| ExecutorError::UnknownTable(name.to_string()))
}

fn table_mut<'t>(tables: &'t mut Tables, name: &str) -> Result<&'t mut MemoryTable, ExecutorError> {
    tables
        .get_mut(name)
        .ok_or_else(|| ExecutorError::UnknownTable(name.to_string()))
}

// ========================================
// SELECT
// ========================================

fn qualify(table: &str, row: &Record) -> Record {
    row.iter()
        .map(|(column, value)| (format!("{}.{}", table, column), value.clone()))
        .collect()
}

fn qualified_columns(schema: &Schema) -> Vec<String> {
    schema
        .column_names()
        .map(|c| format!("{}.{}", schema.table_name(), c))
        .collect()
}

fn null_row(columns: &[String]) -> Record {
    columns
        .iter()
        .map(|c| (c.clone(), StoreValue::Null))
        .collect()
}

fn concat_rows(left: &Record, right: &Record) -> Record {
    left.iter()
        .chain(right.iter())
        .map(|(c, v)| (c.to_string(), v.clone()))
        .collect()
}

fn join_rows(
    left: Vec<Record>,
    left_columns: &[String],
    right: Vec<Record>,
    right_columns: &[String],
    join: &JoinClause,
) -> Vec<Record> {
    let Some(on) = join.condition.as_ref().filter(|_| join.join_type != JoinType::Cross) else {
        return left
            .iter()
            .flat_map(|l| right.iter().map(move |r| concat_rows(l, r)))
            .collect();
    };

    let joined = |l: &Record, r: &Record| {
        match (l.get(&on.left_field), r.get(&on.right_field)) {
            (Some(a), Some(b)) => a.sql_eq(b) == Some(true),
            _ => false,
        }
    };

    let keep_left = matches!(join.join_type, JoinType::Left | JoinType::Full);
    let keep_right = matches!(join.join_type, JoinType::Right | JoinType::Full);
    let mut right_matched = vec![false; right.len()];
    let mut out = Vec::new();

    for l in &left {
        let mut matched = false;
        for (i, r) in right.iter().enumerate() {
            if joined(l, r) {
                matched = true;
                right_matched[i] = true;
                out.push(concat_rows(l, r));
            }
        }
        if !matched && keep_left {
            out.push(concat_rows(l, &null_row(right_columns)));
        }
    }
    if keep_right {
        let padding = null_row(left_columns);
        for (r, _) in right.iter().zip(&right_matched).filter(|(_, m)| !**m) {
            out.push(concat_rows(&padding, r));
        }
    }
    out
}

fn source_rows(tables: &Tables, select: &SelectStatement) -> Result<Vec<Record>, ExecutorError> {
    let base = table(tables, select.schema.table_name())?;
    if select.joins.is_empty() {
        return Ok(base.rows.clone());
    }

    let mut columns = qualified_columns(&base.schema);
    let mut rows: Vec<Record> = base
        .rows
        .iter()
        .map(|r| qualify(base.schema.table_name(), r))
        .collect();
    for join in &select.joins {
        let right = table(tables, join.table())?;
        let right_columns = qualified_columns(&right.schema);
        let right_rows = right.rows.iter().map(|r| qualify(join.table(), r)).collect();
        rows = join_rows(rows, &columns, right_rows, &right_columns, join);
        columns.extend(right_columns);
    }
    Ok(rows)
}

fn run_select(tables: &Tables, select: &SelectStatement) -> Result<StatementOutcome, ExecutorError> {
    let mut rows = Vec::new();
    for row in source_rows(tables, select)? {
        if matches(&select.condition, &row)? == Some(true) {
            rows.push(row);
        }
    }

    // (row the ORDER BY can see, projected output)
    let mut results: Vec<(Record, Record)> = if select.is_aggregate() {
        aggregate(select, &rows)?
    } else {
        rows.into_iter()
            .map(|row| {
                let output = project(select, &row)?;
                Ok((row, output))
            })
            .collect::<Result<_, ExecutorError>>()?
    };

    if !select.order_by.is_empty() {
        results.sort_by(|(row_a, out_a), (row_b, out_b)| {
            for (name, order) in &select.order_by {
                let a = out_a.get(name).or_else(|| row_a.get(name)).unwrap_or(&StoreValue::Null);
                let b = out_b.get(name).or_else(|| row_b.get(name)).unwrap_or(&StoreValue::Null);
                let ordering = sort_cmp(a, b, *order);
                if ordering != std::cmp::Ordering::Equal {
                    return ordering;
                }
            }
            std::cmp::Ordering::Equal
        });
    }

    let offset = usize::try_from(select.offset.unwrap_or(0)).unwrap_or(0);
    let limit = select
        .limit
        .map(|l| usize::try_from(l).unwrap_or(0))
        .unwrap_or(usize::MAX);
    let output = results
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|(_, output)| output)
        .collect();
    Ok(StatementOutcome::with_rows(output))
}

fn project(select: &SelectStatement, row: &Record) -> Result<Record, ExecutorError> {
    if select.fields.is_empty() {
        return Ok(row.clone());
    }
    let mut output = Record::with_capacity(select.fields.len());
    for field in &select.fields {
        match field {
            SelectField::All => {
                for (column, value) in row.iter() {
                    output.insert(column, value.clone());
                }
            }
            SelectField::Field(name) => output.insert(name.clone(), value(row, name)),
            SelectField::FieldWithAlias { field, alias } => {
                output.insert(alias.clone(), value(row, field))
            }
            SelectField::Aggregate { .. } => {
                return Err(QueryError::InvalidQuery("aggregate in a plain select".to_string()).into())
            }
        }
    }
    Ok(output)
}

fn value(row: &Record, name: &str) -> StoreValue {
    row.get(name).cloned().unwrap_or(StoreValue::Null)
}

fn aggregate(select: &SelectStatement, rows: &[Record]) -> Result<Vec<(Record, Record)>, ExecutorError> {
    let keys: &[String] = select
        .group_by
        .as_ref()
        .map(|g| g.fields.as_slice())
        .unwrap_or(&[]);

    // groups in order of first appearance
    let mut groups: Vec<(Vec<StoreValue>, Vec<&Record>)> = Vec::new();
    for row in rows {
        let key: Vec<StoreValue> = keys.iter().map(|k| value(row, k)).collect();
        match groups
            .iter_mut()
            .find(|(existing, _)| existing.iter().zip(&key).all(|(a, b)| same_value(a, b)))
        {
            Some((_, members)) => members.push(row),
            None => groups.push((key, vec![row])),
        }
    }
    if keys.is_empty() && groups.is_empty() {
        groups.push((Vec::new(), Vec::new()));
    }

    if select.fields.is_empty() {
        return Err(QueryError::InvalidQuery(
            "cannot select every column of a grouped query".to_string(),
        )
        .into());
    }

    let having = select.group_by.as_ref().and_then(|g| g.having.as_ref());
    let mut results = Vec::with_capacity(groups.len());
    for (key, members) in groups {
        let mut output = Record::with_capacity(select.fields.len());
        for field in &select.fields {
            match field {
                SelectField::FieldWithAlias { field, alias } => {
                    let v = members.first().map(|row| value(row, field)).unwrap_or(StoreValue::Null);
                    output.insert(alias.clone(), v);
                }
                SelectField::Field(name) => {
                    let v = members.first().map(|row| value(row, name)).unwrap_or(StoreValue::Null);
                    output.insert(name.clone(), v);
                }
                SelectField::Aggregate { function, field: column, .. } => {
                    let name = field.output_name().unwrap_or_else(|| function.to_sql().to_lowercase());
                    output.insert(name, aggregate_value(*function, column.as_deref(), &members)?);
                }
                SelectField::All => {
                    return Err(QueryError::InvalidQuery(
                        "cannot select every column of a grouped query".to_string(),
                    )
                    .into())
                }
            }
        }
        // HAVING and ORDER BY see the outputs plus the grouped columns
        let mut visible = output.clone();
        for (name, v) in keys.iter().zip(key) {
            if !visible.contains(name) {
                visible.insert(name.clone(), v);
            }
        }
        if let Some(having) = having {
            if matches(having, &visible)? != Some(true) {
                continue;
            }
        }
        results.push((visible, output));
    }
    Ok(results)
}

fn aggregate_value(
    function: AggregateFunction,
    column: Option<&str>,
    rows: &[&Record],
) -> Result<StoreValue, ExecutorError> {
    let Some(column) = column else {
        return Ok(StoreValue::BigInt(rows.len() as i64));
    };
    let values: Vec<&StoreValue> = rows
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|v| !v.is_null())
        .collect();

    let numeric = |values: &[&StoreValue]| -> Result<Vec<f64>, ExecutorError> {
        values
            .iter()
            .map(|v| {
                v.as_f64().ok_or_else(|| {
                    ExecutorError::InvalidValue(format!("cannot aggregate {} values", v.type_name()))
                })
            })
            .collect()
    };

    Ok(match function {
        AggregateFunction::Count => StoreValue::BigInt(values.len() as i64),
        AggregateFunction::CountDistinct => {
            let mut distinct: Vec<&StoreValue> = Vec::new();
            for v in values {
                if !distinct.iter().any(|d| same_value(d, v)) {
                    distinct.push(v);
                }
            }
            StoreValue::BigInt(distinct.len() as i64)
        }
        AggregateFunction::Sum => {
            if values.is_empty() {
                StoreValue::Null
            } else {
                StoreValue::Float(numeric(&values)?.iter().sum())
            }
        }
        AggregateFunction::Avg => {
            if values.is_empty() {
                StoreValue::Null
            } else {
                let numbers = numeric(&values)?;
                StoreValue::Float(numbers.iter().sum::<f64>() / numbers.len() as f64)
            }
        }
        AggregateFunction::Min => extreme(&values, SortOrder::Asc),
        AggregateFunction::Max => extreme(&values, SortOrder::Desc),
    })
}

fn extreme(values: &[&StoreValue], order: SortOrder) -> StoreValue {
    values
        .iter()
        .min_by(|a, b| sort_cmp(a, b, order))
        .map(|v| (*v).clone())
        .unwrap_or(StoreValue::Null)
}

// ========================================
// INSERT
// ========================================

fn materialize(schema: &Schema, row: &EncodedRow, sequence: &mut i64) -> Result<Record, ExecutorError> {
    let mut record = Record::with_capacity(row.len());
    for (name, param) in row.iter() {
        let value = match param {
            Param::Value(value) => value.clone(),
            Param::Expression(expression) => match schema.column(name) {
                Some(column) => conform(column, expression.evaluate())?,
                None => expression.evaluate(),
            },
            Param::Generated => {
                let column = schema.primary_key();
                *sequence += 1;
                narrow_integer(*sequence, column.storage()).ok_or_else(|| {
                    ExecutorError::InvalidValue(format!("sequence of '{}' exhausted", column.name()))
                })?
            }
        };
        record.insert(name, value);
    }

    let pk = schema.primary_key();
    if pk.is_auto_increment() {
        if let Some(id) = record.get(pk.name()).and_then(StoreValue::as_i64) {
            *sequence = (*sequence).max(id);
        }
    }
    Ok(record)
}

fn check_not_null(schema: &Schema, row: &Record) -> Result<(), ExecutorError> {
    for column in schema.columns().iter().filter(|c| !c.is_nullable()) {
        if row.get(column.name()).map_or(true, StoreValue::is_null) {
            return Err(ExecutorError::constraint(
                ConstraintKind::NotNull,
                schema.table_name(),
                format!("null value in column '{}'", column.name()),
            ));
        }
    }
    Ok(())
}

/// Every non-null reference must name an existing row. References into the
/// same table also see `pending` rows of the current statement.
fn check_foreign_keys(
    tables: &Tables,
    schema: &Schema,
    row: &Record,
    pending: &[Record],
) -> Result<(), ExecutorError> {
    for (column, fk) in schema.foreign_keys() {
        let Some(value) = row.get(column.name()).filter(|v| !v.is_null()) else {
            continue;
        };
        let target = table(tables, &fk.table)?;
        let refers = |candidate: &Record| {
            candidate
                .get(&fk.column)
                .is_some_and(|v| v.sql_eq(value) == Some(true))
        };
        let mut found = target.rows.iter().any(refers);
        if !found && fk.table == schema.table_name() {
            found = pending.iter().any(refers) || refers(row);
        }
        if !found {
            return Err(ExecutorError::constraint(
                ConstraintKind::ForeignKey,
                schema.table_name(),
                format!(
                    "'{}' = {:?} has no match in '{}'.'{}'",
                    column.name(),
                    value,
                    fk.table,
                    fk.column
                ),
            ));
        }
    }
    Ok(())
}

fn duplicate_key(schema: &Schema, key: &StoreValue) -> ExecutorError {
    ExecutorError::constraint(
        ConstraintKind::PrimaryKey,
        schema.table_name(),
        format!("duplicate key '{}' = {:?}", schema.primary_key_name(), key),
    )
}

fn run_insert(tables: &mut Tables, insert: &InsertStatement) -> Result<StatementOutcome, ExecutorError> {
    let schema = insert.schema.as_ref();
    let pk = schema.primary_key_name();
    let current = table(tables, schema.table_name())?;

    let mut sequence = current.sequence;
    let mut added: Vec<Record> = Vec::new();
    let mut replaced: Vec<(usize, Record)> = Vec::new();
    let mut returned: Vec<Record> = Vec::new();

    for encoded in &insert.rows {
        let row = materialize(schema, encoded, &mut sequence)?;
        check_not_null(schema, &row)?;
        check_foreign_keys(tables, schema, &row, &added)?;
        let key = value(&row, pk);

        let conflict_in_batch = added.iter().any(|r| r.get(pk).is_some_and(|v| same_value(v, &key)));
        let existing = current.position_of(&key);

        if conflict_in_batch || existing.is_some() {
            match &insert.on_conflict {
                OnConflict::Error => return Err(duplicate_key(schema, &key)),
                OnConflict::Ignore => continue,
                OnConflict::Update(_) if conflict_in_batch => return Err(duplicate_key(schema, &key)),
                OnConflict::Update(clause) => {
                    let Some(position) = existing else { continue };
                    if replaced.iter().any(|(p, _)| *p == position) {
                        return Err(duplicate_key(schema, &key));
                    }
                    let stored = &current.rows[position];
                    if let Some(guard) = &clause.guard {
                        if matches(guard, stored)? != Some(true) {
                            continue;
                        }
                    }
                    let mut merged = stored.clone();
                    for (name, expr) in merge_assignments(schema, clause) {
                        let column = schema.column(&name).ok_or_else(|| QueryError::UnknownColumn {
                            table: schema.table_name().to_string(),
                            column: name.clone(),
                        })?;
                        merged.insert(name.clone(), conform(column, evaluate(&expr, Some(&row), stored, column)?)?);
                    }
                    check_not_null(schema, &merged)?;
                    check_foreign_keys(tables, schema, &merged, &added)?;
                    replaced.push((position, merged));
                    returned.push(Record::new().with(pk, key));
                }
            }
            continue;
        }

        added.push(row);
        returned.push(Record::new().with(pk, key));
    }

    let affected = (added.len() + replaced.len()) as u64;
    let target = table_mut(tables, schema.table_name())?;
    target.sequence = sequence;
    for (position, row) in replaced {
        target.rows[position] = row;
    }
    target.rows.extend(added);

    Ok(if insert.returning {
        StatementOutcome::with_rows(returned)
    } else {
        StatementOutcome::affected(affected)
    })
}

// ========================================
// UPDATE / DELETE
// ========================================

fn run_update(tables: &mut Tables, update: &UpdateStatement) -> Result<StatementOutcome, ExecutorError> {
    let schema = update.schema.as_ref();
    let pk = schema.primary_key_name();
    let current = table(tables, schema.table_name())?;

    let mut changes: Vec<(usize, Record)> = Vec::new();
    for (position, row) in current.rows.iter().enumerate() {
        if matches(&update.condition, row)? != Some(true) {
            continue;
        }
        // every right-hand side sees the row as it was
        let mut updated = row.clone();
        for (name, expr) in &update.assignments {
            let column = schema.column(name).ok_or_else(|| QueryError::UnknownColumn {
                table: schema.table_name().to_string(),
                column: name.clone(),
            })?;
            updated.insert(name.clone(), conform(column, evaluate(expr, None, row, column)?)?);
        }
        check_not_null(schema, &updated)?;
        check_foreign_keys(tables, schema, &updated, &[])?;
        changes.push((position, updated));
    }

    if update.assignments.iter().any(|(name, _)| name == pk) {
        let mut keys: Vec<StoreValue> = current
            .rows
            .iter()
            .enumerate()
            .map(|(position, row)| {
                changes
                    .iter()
                    .find(|(p, _)| *p == position)
                    .map(|(_, updated)| value(updated, pk))
                    .unwrap_or_else(|| value(row, pk))
            })
            .collect();
        while let Some(key) = keys.pop() {
            if keys.iter().any(|k| same_value(k, &key)) {
                return Err(duplicate_key(schema, &key));
            }
        }
    }

    let affected = changes.len() as u64;
    let target = table_mut(tables, schema.table_name())?;
    for (position, row) in changes {
        target.rows[position] = row;
    }
    Ok(StatementOutcome::affected(affected))
}

fn run_delete(tables: &mut Tables, delete: &DeleteStatement) -> Result<StatementOutcome, ExecutorError> {
    let target = table_mut(tables, delete.schema.table_name())?;
    let mut keep = Vec::with_capacity(target.rows.len());
    for row in &target.rows {
        keep.push(eval::matches(&delete.condition, row)? != Some(true));
    }
    let before = target.rows.len();
    let mut flags = keep.into_iter();
    target.rows.retain(|_| flags.next().unwrap_or(true));
    Ok(StatementOutcome::affected((before - target.rows.len()) as u64))
}
