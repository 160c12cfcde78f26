use crate::errors::QueryError;
use crate::schema::Schema;
use std::sync::Arc;

/// Represents the type of SQL JOIN operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// INNER JOIN - returns records that have matching values in both tables
    Inner,
    /// LEFT JOIN - returns all records from the left table and matched records from the right table
    Left,
    /// RIGHT JOIN - returns all records from the right table and matched records from the left table
    Right,
    /// FULL OUTER JOIN - returns all records when there is a match in either left or right table
    Full,
    /// CROSS JOIN - returns Cartesian product of both tables
    Cross,
}

impl JoinType {
    /// Convert JoinType to SQL string
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
        }
    }
}

/// Equality between a column of the base table and one of the joined table.
/// Both sides are qualified `table.column` references.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinCondition {
    pub left_field: String,
    pub right_field: String,
}

/// A join against another registered table
#[derive(Debug, Clone)]
pub struct JoinClause {
    pub join_type: JoinType,
    /// Schema of the joined table
    pub schema: Arc<Schema>,
    /// Absent for cross joins
    pub condition: Option<JoinCondition>,
}

impl JoinClause {
    /// Join on `left_field = right_field`. Unqualified fields are taken to
    /// belong to the base table (left) and the joined table (right).
    pub fn new_on(
        join_type: JoinType,
        schema: Arc<Schema>,
        left_field: impl Into<String>,
        right_field: impl Into<String>,
    ) -> Self {
        let right_field = right_field.into();
        let right_field = if right_field.contains('.') {
            right_field
        } else {
            format!("{}.{}", schema.table_name(), right_field)
        };
        Self {
            join_type,
            schema,
            condition: Some(JoinCondition {
                left_field: left_field.into(),
                right_field,
            }),
        }
    }

    pub fn cross(schema: Arc<Schema>) -> Self {
        Self {
            join_type: JoinType::Cross,
            schema,
            condition: None,
        }
    }

    /// Derive the join condition from a foreign key declared by either
    /// table. A cross join ignores the relation.
    pub fn from_relation(
        join_type: JoinType,
        base: &Schema,
        other: Arc<Schema>,
    ) -> Result<Self, QueryError> {
        if join_type == JoinType::Cross {
            return Ok(Self::cross(other));
        }

        let qualify = |table: &str, column: &str| format!("{}.{}", table, column);

        if let Some((column, fk)) = base
            .foreign_keys()
            .find(|(_, fk)| fk.table == other.table_name())
        {
            let left = qualify(base.table_name(), column.name());
            let right = qualify(other.table_name(), &fk.column);
            return Ok(Self::new_on(join_type, other, left, right));
        }

        let reverse = other
            .foreign_keys()
            .find(|(_, fk)| fk.table == base.table_name())
            .map(|(column, fk)| {
                (
                    qualify(base.table_name(), &fk.column),
                    qualify(other.table_name(), column.name()),
                )
            });

        match reverse {
            Some((left, right)) => Ok(Self::new_on(join_type, other, left, right)),
            None => Err(QueryError::InvalidQuery(format!(
                "no foreign key relates '{}' and '{}'",
                base.table_name(),
                other.table_name()
            ))),
        }
    }

    pub fn table(&self) -> &str {
        self.schema.table_name()
    }
}
