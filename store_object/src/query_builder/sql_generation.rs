//! PostgreSQL rendering of statements
//!
//! Every literal becomes a `$n::type` placeholder cast to the storage type of
//! the column it is compared with or assigned to. Identifiers are always
//! double-quoted.

use crate::codec::{Param, Scope};
use crate::errors::QueryError;
use crate::query_builder::aggregation::{AggregateFunction, SelectField};
use crate::query_builder::condition::{Condition, Operand, Operator};
use crate::query_builder::join::{JoinClause, JoinType};
use crate::query_builder::ordering::SortOrder;
use crate::query_builder::update::Expr;
use crate::schema::Schema;
use crate::statement::{
    merge_assignments, DeleteStatement, InsertStatement, OnConflict, SelectStatement, Statement,
    UpdateStatement,
};
use crate::validation::quote_identifier;
use type_mapping::{StorageType, StoreValue};

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedStatement {
    pub sql: String,
    pub params: Vec<StoreValue>,
    /// Output columns and their storage types, for statements that return rows
    pub shape: Option<Vec<(String, StorageType)>>,
}

/// Resolves a column reference to its SQL expression and storage type
type Resolver<'r> = &'r dyn Fn(&str) -> Result<(String, StorageType), QueryError>;

#[derive(Debug, Default)]
struct Params {
    values: Vec<StoreValue>,
}

impl Params {
    fn bind(&mut self, value: &StoreValue, storage: &StorageType) -> String {
        self.values.push(value.clone());
        format!("${}::{}", self.values.len(), storage.cast_name())
    }
}

pub struct SqlGenerator;

impl SqlGenerator {
    pub fn render(statement: &Statement) -> Result<RenderedStatement, QueryError> {
        match statement {
            Statement::CreateTable(schema) => Ok(RenderedStatement {
                sql: schema.create_table_sql(),
                params: Vec::new(),
                shape: None,
            }),
            Statement::Select(select) => Self::render_select(select),
            Statement::Insert(insert) => Self::render_insert(insert),
            Statement::Update(update) => Self::render_update(update),
            Statement::Delete(delete) => Self::render_delete(delete),
        }
    }

    /// Column expression as it appears in a select list
    fn select_expr(reference: &str, storage: &StorageType) -> String {
        if storage.reads_as_text() {
            format!("{}::text", quote_identifier(reference))
        } else {
            quote_identifier(reference)
        }
    }

    fn render_select(select: &SelectStatement) -> Result<RenderedStatement, QueryError> {
        let scope = Scope::with_joins(&select.schema, &select.joins);
        let mut params = Params::default();
        let mut columns = Vec::new();
        let mut shape = Vec::new();
        // output alias -> (expression, type), for HAVING
        let mut outputs: Vec<(String, String, StorageType)> = Vec::new();

        let all = [SelectField::All];
        let fields = if select.fields.is_empty() {
            &all[..]
        } else {
            &select.fields[..]
        };

        for field in fields {
            match field {
                SelectField::All => {
                    for schema in scope.tables() {
                        for column in schema.columns() {
                            let key = if scope.is_joined() {
                                format!("{}.{}", schema.table_name(), column.name())
                            } else {
                                column.name().to_string()
                            };
                            columns.push(format!(
                                "{} AS {}",
                                Self::select_expr(&key, column.storage()),
                                quote_identifier_whole(&key)
                            ));
                            shape.push((key, column.storage().clone()));
                        }
                    }
                }
                SelectField::Field(reference) => {
                    let (_, column) = scope.resolve(reference)?;
                    columns.push(format!(
                        "{} AS {}",
                        Self::select_expr(reference, column.storage()),
                        quote_identifier_whole(reference)
                    ));
                    shape.push((reference.clone(), column.storage().clone()));
                }
                SelectField::FieldWithAlias { field, alias } => {
                    let (_, column) = scope.resolve(field)?;
                    let expr = Self::select_expr(field, column.storage());
                    columns.push(format!("{} AS {}", expr, quote_identifier_whole(alias)));
                    outputs.push((alias.clone(), expr, column.storage().clone()));
                    shape.push((alias.clone(), column.storage().clone()));
                }
                SelectField::Aggregate { function, field: column, .. } => {
                    let alias = field
                        .output_name()
                        .ok_or_else(|| QueryError::InvalidQuery("aggregate without name".to_string()))?;
                    let input = match column {
                        Some(reference) => Some((reference.as_str(), scope.resolve(reference)?.1.storage())),
                        None => None,
                    };
                    let expr = Self::aggregate_expr(*function, input);
                    let storage = function.result_type(input.map(|(_, s)| s));
                    columns.push(format!("{} AS {}", expr, quote_identifier_whole(&alias)));
                    outputs.push((alias.clone(), expr, storage.clone()));
                    shape.push((alias, storage));
                }
            }
        }

        let mut sql = format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            quote_identifier(select.schema.table_name())
        );

        for join in &select.joins {
            sql.push(' ');
            sql.push_str(&Self::join_sql(join));
        }

        let resolve_column = |name: &str| -> Result<(String, StorageType), QueryError> {
            let (_, column) = scope.resolve(name)?;
            Ok((quote_identifier(name), column.storage().clone()))
        };

        if !select.condition.is_all() {
            sql.push_str(" WHERE ");
            sql.push_str(&Self::condition_sql(&select.condition, &resolve_column, &mut params)?);
        }

        if let Some(group_by) = &select.group_by {
            if !group_by.fields.is_empty() {
                let grouped: Vec<String> = group_by.fields.iter().map(|f| quote_identifier(f)).collect();
                sql.push_str(" GROUP BY ");
                sql.push_str(&grouped.join(", "));
            }
            if let Some(having) = group_by.having.as_ref().filter(|h| !h.is_all()) {
                let resolve_having = |name: &str| -> Result<(String, StorageType), QueryError> {
                    match outputs.iter().find(|(alias, _, _)| alias == name) {
                        Some((_, expr, storage)) => Ok((expr.clone(), storage.clone())),
                        None => resolve_column(name),
                    }
                };
                sql.push_str(" HAVING ");
                sql.push_str(&Self::condition_sql(having, &resolve_having, &mut params)?);
            }
        }

        let output_names: Vec<&str> = shape.iter().map(|(key, _)| key.as_str()).collect();
        sql.push_str(&Self::build_order_clause(&select.order_by, &output_names));
        sql.push_str(&Self::build_limit_clause(select.limit, select.offset));

        Ok(RenderedStatement {
            sql,
            params: params.values,
            shape: Some(shape),
        })
    }

    fn aggregate_expr(function: AggregateFunction, input: Option<(&str, &StorageType)>) -> String {
        let Some((reference, storage)) = input else {
            return format!("{}(*)", function.to_sql());
        };
        let column = quote_identifier(reference);
        match function {
            AggregateFunction::Count => format!("COUNT({})", column),
            AggregateFunction::CountDistinct => format!("COUNT(DISTINCT {})", column),
            AggregateFunction::Sum | AggregateFunction::Avg => {
                format!("{}({})::double precision", function.to_sql(), column)
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                if storage.reads_as_text() {
                    format!("{}({})::text", function.to_sql(), column)
                } else {
                    format!("{}({})", function.to_sql(), column)
                }
            }
        }
    }

    fn join_sql(join: &JoinClause) -> String {
        let table = quote_identifier(join.table());
        match (&join.condition, join.join_type) {
            (Some(on), join_type) if join_type != JoinType::Cross => format!(
                "{} {} ON {} = {}",
                join_type.to_sql(),
                table,
                quote_identifier(&on.left_field),
                quote_identifier(&on.right_field)
            ),
            _ => format!("CROSS JOIN {}", table),
        }
    }

    fn condition_sql(
        condition: &Condition,
        resolve: Resolver<'_>,
        params: &mut Params,
    ) -> Result<String, QueryError> {
        match condition {
            Condition::All => Ok("1=1".to_string()),
            Condition::And(left, right) => Ok(format!(
                "({} AND {})",
                Self::condition_sql(left, resolve, params)?,
                Self::condition_sql(right, resolve, params)?
            )),
            Condition::Or(left, right) => Ok(format!(
                "({} OR {})",
                Self::condition_sql(left, resolve, params)?,
                Self::condition_sql(right, resolve, params)?
            )),
            Condition::Predicate {
                column,
                operator,
                operand,
            } => {
                let (field, storage) = resolve(column)?;
                Self::predicate_sql(&field, &storage, *operator, operand, params)
            }
        }
    }

    fn predicate_sql(
        field: &str,
        storage: &StorageType,
        operator: Operator,
        operand: &Operand,
        params: &mut Params,
    ) -> Result<String, QueryError> {
        let malformed = || {
            QueryError::MalformedCondition(format!("{:?} on {} cannot take {:?}", operator, field, operand))
        };

        let sql = match (operator, operand) {
            (Operator::IsNull, _) => format!("{} IS NULL", field),
            (Operator::IsNotNull, _) => format!("{} IS NOT NULL", field),
            (Operator::Between, Operand::Range(low, high)) => format!(
                "{} BETWEEN {} AND {}",
                field,
                params.bind(low, storage),
                params.bind(high, storage)
            ),
            (Operator::Like, Operand::Pattern(p)) => {
                format!("{} LIKE {}", field, params.bind(&StoreValue::from(p.as_str()), &StorageType::Text))
            }
            (Operator::NotLike, Operand::Pattern(p)) => format!(
                "{} NOT LIKE {}",
                field,
                params.bind(&StoreValue::from(p.as_str()), &StorageType::Text)
            ),
            (Operator::RegexMatch, Operand::Pattern(p)) => {
                format!("{} ~ {}", field, params.bind(&StoreValue::from(p.as_str()), &StorageType::Text))
            }
            (Operator::InList, Operand::List(values)) => {
                if values.is_empty() {
                    return Ok("1=0".to_string()); // Empty IN clause
                }
                let placeholders: Vec<String> = values.iter().map(|v| params.bind(v, storage)).collect();
                format!("{} IN ({})", field, placeholders.join(", "))
            }
            (Operator::NotInList, Operand::List(values)) => {
                if values.is_empty() {
                    return Ok("1=1".to_string()); // Empty NOT IN clause
                }
                let placeholders: Vec<String> = values.iter().map(|v| params.bind(v, storage)).collect();
                format!("{} NOT IN ({})", field, placeholders.join(", "))
            }
            (op, Operand::Value(value)) => {
                let symbol = op.comparison_sql().ok_or_else(malformed)?;
                format!("{} {} {}", field, symbol, params.bind(value, storage))
            }
            _ => return Err(malformed()),
        };
        Ok(sql)
    }

    fn expr_sql(
        schema: &Schema,
        expr: &Expr,
        target: &StorageType,
        params: &mut Params,
    ) -> Result<String, QueryError> {
        let column_ref = |name: &str| -> Result<(), QueryError> {
            if schema.has_column(name) {
                Ok(())
            } else {
                Err(QueryError::UnknownColumn {
                    table: schema.table_name().to_string(),
                    column: name.to_string(),
                })
            }
        };
        let binary = |symbol: &str, l: &Expr, r: &Expr, params: &mut Params| -> Result<String, QueryError> {
            Ok(format!(
                "({} {} {})",
                Self::expr_sql(schema, l, target, params)?,
                symbol,
                Self::expr_sql(schema, r, target, params)?
            ))
        };

        match expr {
            Expr::Literal(value) => Ok(params.bind(value, target)),
            Expr::Existing(name) => {
                column_ref(name)?;
                Ok(format!(
                    "{}.{}",
                    quote_identifier(schema.table_name()),
                    quote_identifier(name)
                ))
            }
            Expr::Incoming(name) => {
                column_ref(name)?;
                Ok(format!("EXCLUDED.{}", quote_identifier(name)))
            }
            Expr::Expression(e) => Ok(e.to_sql(target).to_string()),
            Expr::Concat(parts) => {
                let rendered = parts
                    .iter()
                    .map(|p| Self::expr_sql(schema, p, target, params))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", rendered.join(" || ")))
            }
            Expr::Add(l, r) => binary("+", l, r, params),
            Expr::Subtract(l, r) => binary("-", l, r, params),
            Expr::Multiply(l, r) => binary("*", l, r, params),
            Expr::Divide(l, r) => binary("/", l, r, params),
        }
    }

    fn assignments_sql(
        schema: &Schema,
        assignments: &[(String, Expr)],
        params: &mut Params,
    ) -> Result<String, QueryError> {
        let mut parts = Vec::with_capacity(assignments.len());
        for (name, expr) in assignments {
            let column = schema.column(name).ok_or_else(|| QueryError::UnknownColumn {
                table: schema.table_name().to_string(),
                column: name.clone(),
            })?;
            parts.push(format!(
                "{} = {}",
                quote_identifier(name),
                Self::expr_sql(schema, expr, column.storage(), params)?
            ));
        }
        Ok(parts.join(", "))
    }

    fn render_insert(insert: &InsertStatement) -> Result<RenderedStatement, QueryError> {
        let schema = &insert.schema;
        if insert.rows.is_empty() {
            return Err(QueryError::InvalidQuery("insert without rows".to_string()));
        }

        let mut params = Params::default();
        let names: Vec<String> = schema.column_names().map(quote_identifier).collect();
        let mut rows = Vec::with_capacity(insert.rows.len());
        for row in &insert.rows {
            let mut values = Vec::with_capacity(schema.columns().len());
            for column in schema.columns() {
                let value = match row.get(column.name()) {
                    Some(Param::Value(v)) => params.bind(v, column.storage()),
                    Some(Param::Expression(e)) => e.to_sql(column.storage()).to_string(),
                    Some(Param::Generated) | None => "DEFAULT".to_string(),
                };
                values.push(value);
            }
            rows.push(format!("({})", values.join(", ")));
        }

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            quote_identifier(schema.table_name()),
            names.join(", "),
            rows.join(", ")
        );

        let conflict_target = quote_identifier(schema.primary_key_name());
        match &insert.on_conflict {
            OnConflict::Error => {}
            OnConflict::Ignore => {
                sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", conflict_target));
            }
            OnConflict::Update(clause) => {
                let merged = merge_assignments(schema, clause);
                if merged.is_empty() {
                    sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", conflict_target));
                } else {
                    sql.push_str(&format!(
                        " ON CONFLICT ({}) DO UPDATE SET {}",
                        conflict_target,
                        Self::assignments_sql(schema, &merged, &mut params)?
                    ));
                    if let Some(guard) = clause.guard.as_ref().filter(|g| !g.is_all()) {
                        let qualified = |name: &str| -> Result<(String, StorageType), QueryError> {
                            let column = schema.column(name).ok_or_else(|| QueryError::UnknownColumn {
                                table: schema.table_name().to_string(),
                                column: name.to_string(),
                            })?;
                            Ok((
                                format!(
                                    "{}.{}",
                                    quote_identifier(schema.table_name()),
                                    quote_identifier(name)
                                ),
                                column.storage().clone(),
                            ))
                        };
                        sql.push_str(" WHERE ");
                        sql.push_str(&Self::condition_sql(guard, &qualified, &mut params)?);
                    }
                }
            }
        }

        let shape = if insert.returning {
            let key = schema.primary_key();
            sql.push_str(&format!(
                " RETURNING {} AS {}",
                Self::select_expr(key.name(), key.storage()),
                quote_identifier(key.name())
            ));
            Some(vec![(key.name().to_string(), key.storage().clone())])
        } else {
            None
        };

        Ok(RenderedStatement {
            sql,
            params: params.values,
            shape,
        })
    }

    fn render_update(update: &UpdateStatement) -> Result<RenderedStatement, QueryError> {
        let schema = &update.schema;
        if update.assignments.is_empty() {
            return Err(QueryError::InvalidQuery("update without assignments".to_string()));
        }
        let mut params = Params::default();
        let mut sql = format!(
            "UPDATE {} SET {}",
            quote_identifier(schema.table_name()),
            Self::assignments_sql(schema, &update.assignments, &mut params)?
        );
        sql.push_str(&Self::where_clause(schema, &update.condition, &mut params)?);
        Ok(RenderedStatement {
            sql,
            params: params.values,
            shape: None,
        })
    }

    fn render_delete(delete: &DeleteStatement) -> Result<RenderedStatement, QueryError> {
        let mut params = Params::default();
        let mut sql = format!("DELETE FROM {}", quote_identifier(delete.schema.table_name()));
        sql.push_str(&Self::where_clause(&delete.schema, &delete.condition, &mut params)?);
        Ok(RenderedStatement {
            sql,
            params: params.values,
            shape: None,
        })
    }

    fn where_clause(schema: &Schema, condition: &Condition, params: &mut Params) -> Result<String, QueryError> {
        if condition.is_all() {
            return Ok(String::new());
        }
        let scope = Scope::single(schema);
        let resolve = |name: &str| -> Result<(String, StorageType), QueryError> {
            let (_, column) = scope.resolve(name)?;
            Ok((quote_identifier(name), column.storage().clone()))
        };
        Ok(format!(" WHERE {}", Self::condition_sql(condition, &resolve, params)?))
    }

    /// Build ORDER BY clause. Names matching an output column refer to it,
    /// anything else is a column reference.
    pub fn build_order_clause(order_by: &[(String, SortOrder)], outputs: &[&str]) -> String {
        if order_by.is_empty() {
            return String::new();
        }

        let order_parts: Vec<String> = order_by
            .iter()
            .map(|(field, order)| {
                let target = if outputs.contains(&field.as_str()) {
                    quote_identifier_whole(field)
                } else {
                    quote_identifier(field)
                };
                format!("{} {}", target, order.to_sql())
            })
            .collect();

        format!(" ORDER BY {}", order_parts.join(", "))
    }

    /// Build LIMIT/OFFSET clause
    pub fn build_limit_clause(limit: Option<i64>, offset: Option<i64>) -> String {
        let mut clause = String::new();
        if let Some(limit) = limit {
            clause.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = offset {
            clause.push_str(&format!(" OFFSET {}", offset));
        }
        clause
    }
}

/// Quote an output name as one identifier, dots included (`"books.id"`)
fn quote_identifier_whole(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
