use type_mapping::StorageType;

/// Represents SQL aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    /// COUNT(*) or COUNT(field)
    Count,
    /// SUM(field)
    Sum,
    /// AVG(field)
    Avg,
    /// MIN(field)
    Min,
    /// MAX(field)
    Max,
    /// COUNT(DISTINCT field)
    CountDistinct,
}

impl AggregateFunction {
    /// Convert aggregate function to SQL string
    pub fn to_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
            AggregateFunction::CountDistinct => "COUNT",
        }
    }

    /// Check if this is a DISTINCT aggregate
    pub fn is_distinct(&self) -> bool {
        matches!(self, AggregateFunction::CountDistinct)
    }

    fn alias_prefix(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::CountDistinct => "count_distinct",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }

    /// Type of the aggregate's result given the input column type. Counts
    /// are 64-bit, sums and averages are read as double precision, MIN and
    /// MAX keep the column type.
    pub fn result_type(&self, input: Option<&StorageType>) -> StorageType {
        match self {
            AggregateFunction::Count | AggregateFunction::CountDistinct => StorageType::BigInt,
            AggregateFunction::Sum | AggregateFunction::Avg => StorageType::DoublePrecision,
            AggregateFunction::Min | AggregateFunction::Max => {
                input.cloned().unwrap_or(StorageType::Text)
            }
        }
    }
}

/// Represents a field selection in a SELECT clause
#[derive(Debug, Clone, PartialEq)]
pub enum SelectField {
    /// Select all fields: SELECT *
    All,
    /// Select specific field: SELECT field_name
    Field(String),
    /// Select field with alias: SELECT field_name AS alias
    FieldWithAlias { field: String, alias: String },
    /// Select aggregate function: SELECT COUNT(field)
    Aggregate {
        function: AggregateFunction,
        field: Option<String>, // None for COUNT(*)
        alias: Option<String>,
    },
}

impl SelectField {
    /// Create a simple field selection
    pub fn field(field: impl Into<String>) -> Self {
        SelectField::Field(field.into())
    }

    /// Create a field with alias
    pub fn field_as(field: impl Into<String>, alias: impl Into<String>) -> Self {
        SelectField::FieldWithAlias {
            field: field.into(),
            alias: alias.into(),
        }
    }

    fn aggregate(function: AggregateFunction, field: Option<String>) -> Self {
        SelectField::Aggregate {
            function,
            field,
            alias: None,
        }
    }

    /// Create COUNT(*) aggregate
    pub fn count_all() -> Self {
        Self::aggregate(AggregateFunction::Count, None)
    }

    /// Create COUNT(field) aggregate
    pub fn count(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::Count, Some(field.into()))
    }

    /// Create COUNT(DISTINCT field) aggregate
    pub fn count_distinct(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::CountDistinct, Some(field.into()))
    }

    pub fn sum(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::Sum, Some(field.into()))
    }

    pub fn avg(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::Avg, Some(field.into()))
    }

    pub fn min(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::Min, Some(field.into()))
    }

    pub fn max(field: impl Into<String>) -> Self {
        Self::aggregate(AggregateFunction::Max, Some(field.into()))
    }

    /// Add an alias to this select field
    pub fn with_alias(self, alias: impl Into<String>) -> Self {
        match self {
            SelectField::Field(field) => SelectField::FieldWithAlias {
                field,
                alias: alias.into(),
            },
            SelectField::Aggregate {
                function, field, ..
            } => SelectField::Aggregate {
                function,
                field,
                alias: Some(alias.into()),
            },
            other => other,
        }
    }

    /// Key under which this field appears in result records. Aggregates
    /// without an alias are named after the function and column, e.g.
    /// `count` for COUNT(*) or `sum_duration_in_minutes`.
    pub fn output_name(&self) -> Option<String> {
        match self {
            SelectField::All => None,
            SelectField::Field(field) => Some(field.clone()),
            SelectField::FieldWithAlias { alias, .. } => Some(alias.clone()),
            SelectField::Aggregate {
                function,
                field,
                alias,
            } => Some(match (alias, field) {
                (Some(alias), _) => alias.clone(),
                (None, None) => function.alias_prefix().to_string(),
                (None, Some(field)) => {
                    format!("{}_{}", function.alias_prefix(), field.replace('.', "_"))
                }
            }),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, SelectField::Aggregate { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_function_to_sql() {
        assert_eq!(AggregateFunction::Count.to_sql(), "COUNT");
        assert_eq!(AggregateFunction::Sum.to_sql(), "SUM");
        assert_eq!(AggregateFunction::Avg.to_sql(), "AVG");
        assert_eq!(AggregateFunction::Min.to_sql(), "MIN");
        assert_eq!(AggregateFunction::Max.to_sql(), "MAX");
        assert_eq!(AggregateFunction::CountDistinct.to_sql(), "COUNT");
        assert!(AggregateFunction::CountDistinct.is_distinct());
    }

    #[test]
    fn test_select_field_with_alias_chaining() {
        assert_eq!(
            SelectField::field("title").with_alias("name"),
            SelectField::field_as("title", "name")
        );
        assert_eq!(
            SelectField::count("id").with_alias("total"),
            SelectField::Aggregate {
                function: AggregateFunction::Count,
                field: Some("id".to_string()),
                alias: Some("total".to_string()),
            }
        );
    }

    #[test]
    fn test_output_names() {
        assert_eq!(SelectField::count_all().output_name().as_deref(), Some("count"));
        assert_eq!(
            SelectField::count_distinct("genre").output_name().as_deref(),
            Some("count_distinct_genre")
        );
        assert_eq!(
            SelectField::sum("duration_in_minutes").output_name().as_deref(),
            Some("sum_duration_in_minutes")
        );
        assert_eq!(
            SelectField::max("books.id").output_name().as_deref(),
            Some("max_books_id")
        );
        assert_eq!(SelectField::All.output_name(), None);
    }

    #[test]
    fn test_result_types() {
        assert_eq!(AggregateFunction::Count.result_type(None), StorageType::BigInt);
        assert_eq!(
            AggregateFunction::Avg.result_type(Some(&StorageType::Integer)),
            StorageType::DoublePrecision
        );
        assert_eq!(
            AggregateFunction::Min.result_type(Some(&StorageType::Varchar(100))),
            StorageType::Varchar(100)
        );
    }
}
