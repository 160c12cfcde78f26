//! Statements passed to a `StatementExecutor`
//!
//! A statement holds only validated, storage-form values. The constructors
//! here do the binding, so executors never see a literal that skipped its
//! column's validator.

use crate::codec::{self, EncodedRow, Scope};
use crate::errors::{DataError, QueryError};
use crate::query_builder::{
    Condition, Expr, GroupBy, JoinClause, QueryBuilder, SelectField, SortOrder, UpsertClause,
};
use crate::record::Record;
use crate::schema::Schema;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Statement {
    CreateTable(Arc<Schema>),
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    pub fn schema(&self) -> &Arc<Schema> {
        match self {
            Statement::CreateTable(schema) => schema,
            Statement::Select(s) => &s.schema,
            Statement::Insert(s) => &s.schema,
            Statement::Update(s) => &s.schema,
            Statement::Delete(s) => &s.schema,
        }
    }

    pub fn table_name(&self) -> &str {
        self.schema().table_name()
    }

    /// Short label used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::CreateTable(_) => "CREATE",
            Statement::Select(_) => "SELECT",
            Statement::Insert(s) => match s.on_conflict {
                OnConflict::Error => "INSERT",
                OnConflict::Ignore => "INSERT_IGNORE",
                OnConflict::Update(_) => "UPSERT",
            },
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub schema: Arc<Schema>,
    /// Empty selects every column of every table in scope
    pub fields: Vec<SelectField>,
    pub joins: Vec<JoinClause>,
    pub condition: Condition,
    pub group_by: Option<GroupBy>,
    pub order_by: Vec<(String, SortOrder)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SelectStatement {
    /// Bind a query against `schema` and the joined tables
    pub fn bind(
        schema: Arc<Schema>,
        joins: Vec<JoinClause>,
        query: &QueryBuilder,
    ) -> Result<Self, DataError> {
        if let Some(limit) = query.limit_value().filter(|l| *l < 0) {
            return Err(QueryError::InvalidQuery(format!("negative limit {}", limit)).into());
        }
        if let Some(offset) = query.offset_value().filter(|o| *o < 0) {
            return Err(QueryError::InvalidQuery(format!("negative offset {}", offset)).into());
        }

        let scope = Scope::with_joins(&schema, &joins);
        let condition = codec::bind_condition(&scope, &query.condition())?;

        let mut fields = Vec::with_capacity(query.projection().len());
        for field in query.projection() {
            fields.push(bind_field(&scope, field)?);
        }
        let aliases: Vec<String> = fields.iter().filter_map(SelectField::output_name).collect();

        let group_by = match query.grouping() {
            Some(group_by) => {
                let mut grouped = GroupBy::new(
                    group_by
                        .fields
                        .iter()
                        .map(|f| scope.reference(f))
                        .collect::<Result<Vec<String>, QueryError>>()?,
                );
                if let Some(having) = &group_by.having {
                    grouped = grouped.having(codec::bind_having(&scope, having, &aliases)?);
                }
                Some(grouped)
            }
            None => None,
        };

        let order_by = query
            .order()
            .iter()
            .map(|(field, order)| {
                let name = if aliases.iter().any(|a| a == field) {
                    field.clone()
                } else {
                    scope.reference(field)?
                };
                Ok((name, *order))
            })
            .collect::<Result<Vec<_>, QueryError>>()?;

        Ok(Self {
            schema,
            fields,
            joins,
            condition,
            group_by,
            order_by,
            limit: query.limit_value(),
            offset: query.offset_value(),
        })
    }

    pub fn is_aggregate(&self) -> bool {
        self.group_by.is_some() || self.fields.iter().any(SelectField::is_aggregate)
    }
}

fn bind_field(scope: &Scope<'_>, field: &SelectField) -> Result<SelectField, QueryError> {
    Ok(match field {
        SelectField::All => SelectField::All,
        SelectField::Field(name) => SelectField::FieldWithAlias {
            field: scope.reference(name)?,
            alias: name.clone(),
        },
        SelectField::FieldWithAlias { field, alias } => SelectField::FieldWithAlias {
            field: scope.reference(field)?,
            alias: alias.clone(),
        },
        SelectField::Aggregate {
            function,
            field: column,
            ..
        } => {
            let alias = field.output_name();
            SelectField::Aggregate {
                function: *function,
                field: column.as_deref().map(|c| scope.reference(c)).transpose()?,
                alias,
            }
        }
    })
}

/// What an insert does when the primary key already exists
#[derive(Debug, Clone)]
pub enum OnConflict {
    Error,
    Ignore,
    Update(UpsertClause),
}

#[derive(Debug, Clone)]
pub struct InsertStatement {
    pub schema: Arc<Schema>,
    pub rows: Vec<EncodedRow>,
    pub on_conflict: OnConflict,
    /// Return the primary key of every inserted or updated row
    pub returning: bool,
}

impl InsertStatement {
    /// Encode `records` for `schema`. Any invalid record rejects the whole
    /// statement.
    pub fn bind(
        schema: Arc<Schema>,
        records: &[Record],
        on_conflict: OnConflict,
        returning: bool,
    ) -> Result<Self, DataError> {
        let rows = records
            .iter()
            .map(|record| codec::encode(&schema, record))
            .collect::<Result<Vec<_>, _>>()?;

        let on_conflict = match on_conflict {
            OnConflict::Update(clause) => OnConflict::Update(bind_upsert(&schema, &clause)?),
            other => other,
        };

        Ok(Self {
            schema,
            rows,
            on_conflict,
            returning,
        })
    }
}

fn bind_upsert(schema: &Schema, clause: &UpsertClause) -> Result<UpsertClause, DataError> {
    let mut bound = UpsertClause::new();
    for (column, expr) in &clause.assignments {
        bound = bound.set(column.clone(), codec::bind_assignment(schema, column, expr, true)?);
    }
    for column in &clause.exclude {
        if !schema.has_column(column) {
            return Err(QueryError::UnknownColumn {
                table: schema.table_name().to_string(),
                column: column.clone(),
            }
            .into());
        }
        bound = bound.exclude(column.clone());
    }
    if let Some(guard) = &clause.guard {
        bound = bound.guard(codec::bind_condition(&Scope::single(schema), guard)?);
    }
    Ok(bound)
}

/// Columns written when an upsert conflicts, with their expressions: every
/// non-key column that is not excluded, using its assignment if it has one
/// and the incoming value otherwise.
pub fn merge_assignments(schema: &Schema, clause: &UpsertClause) -> Vec<(String, Expr)> {
    schema
        .columns()
        .iter()
        .map(|c| c.name())
        .filter(|name| *name != schema.primary_key_name() && !clause.is_excluded(name))
        .map(|name| {
            let expr = clause
                .assignment(name)
                .cloned()
                .unwrap_or_else(|| Expr::incoming(name));
            (name.to_string(), expr)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct UpdateStatement {
    pub schema: Arc<Schema>,
    pub assignments: Vec<(String, Expr)>,
    pub condition: Condition,
}

impl UpdateStatement {
    pub fn bind(
        schema: Arc<Schema>,
        assignments: &[(String, Expr)],
        condition: &Condition,
    ) -> Result<Self, DataError> {
        let assignments = assignments
            .iter()
            .map(|(column, expr)| {
                Ok((column.clone(), codec::bind_assignment(&schema, column, expr, false)?))
            })
            .collect::<Result<Vec<_>, DataError>>()?;
        let condition = codec::bind_condition(&Scope::single(&schema), condition)?;
        Ok(Self {
            schema,
            assignments,
            condition,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DeleteStatement {
    pub schema: Arc<Schema>,
    pub condition: Condition,
}

impl DeleteStatement {
    pub fn bind(schema: Arc<Schema>, condition: &Condition) -> Result<Self, DataError> {
        let condition = codec::bind_condition(&Scope::single(&schema), condition)?;
        Ok(Self { schema, condition })
    }
}

/// Result of executing one statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOutcome {
    /// Selected rows, or returned keys, in storage form
    pub rows: Vec<Record>,
    pub rows_affected: u64,
}

impl StatementOutcome {
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows: Vec::new(),
            rows_affected,
        }
    }

    pub fn with_rows(rows: Vec<Record>) -> Self {
        let rows_affected = rows.len() as u64;
        Self {
            rows,
            rows_affected,
        }
    }
}
