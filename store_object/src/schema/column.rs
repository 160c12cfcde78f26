//! Column descriptors

use chrono::Utc;
use type_mapping::{resolve, Domain, ResolvedType, StorageType, StoreValue};

/// Expression evaluated by the store when a row is written without a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultExpression {
    CurrentDate,
    CurrentTime,
    CurrentDateTime,
    CurrentTimestamp,
}

impl DefaultExpression {
    /// SQL for a column stored as `storage`. A zone-less timestamp column
    /// holds instants as UTC wall-clock time.
    pub fn to_sql(&self, storage: &StorageType) -> &'static str {
        match self {
            DefaultExpression::CurrentDate => "CURRENT_DATE",
            DefaultExpression::CurrentTime => "LOCALTIME",
            DefaultExpression::CurrentDateTime => "LOCALTIMESTAMP",
            DefaultExpression::CurrentTimestamp if *storage == StorageType::Timestamp => {
                "(CURRENT_TIMESTAMP AT TIME ZONE 'UTC')"
            }
            DefaultExpression::CurrentTimestamp => "CURRENT_TIMESTAMP",
        }
    }

    /// Evaluate against the local clock, for stores without SQL functions
    pub fn evaluate(&self) -> StoreValue {
        let now = Utc::now();
        match self {
            DefaultExpression::CurrentDate => StoreValue::Date(now.date_naive()),
            DefaultExpression::CurrentTime => StoreValue::Time(now.time()),
            DefaultExpression::CurrentDateTime => StoreValue::DateTime(now.naive_utc()),
            DefaultExpression::CurrentTimestamp => StoreValue::Timestamp(now),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    /// Literal default, held in storage form once the schema is defined
    Value(StoreValue),
    Expression(DefaultExpression),
}

/// Reference from a column to the primary key of another table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

/// A named, typed column. The storage type and validator are resolved from
/// the domain when the column is created and never change.
#[derive(Debug, Clone)]
pub struct Column {
    pub(crate) name: String,
    pub(crate) nullable: bool,
    pub(crate) default: Option<ColumnDefault>,
    pub(crate) auto_increment: bool,
    pub(crate) references: Option<ForeignKey>,
    pub(crate) resolved: ResolvedType,
}

impl Column {
    pub fn new(name: impl Into<String>, domain: Domain) -> Self {
        Self {
            name: name.into(),
            nullable: false,
            default: None,
            auto_increment: false,
            references: None,
            resolved: resolve(&domain),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Literal used when a row is written without a value for this column
    pub fn default_value(mut self, value: impl Into<StoreValue>) -> Self {
        self.default = Some(ColumnDefault::Value(value.into()));
        self
    }

    pub fn default_expression(mut self, expression: DefaultExpression) -> Self {
        self.default = Some(ColumnDefault::Expression(expression));
        self
    }

    /// Let the store generate values (integer primary keys only)
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignKey {
            table: table.into(),
            column: column.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &Domain {
        &self.resolved.domain
    }

    pub fn storage(&self) -> &StorageType {
        &self.resolved.storage
    }

    pub fn resolved(&self) -> &ResolvedType {
        &self.resolved
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn column_default(&self) -> Option<&ColumnDefault> {
        self.default.as_ref()
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        self.references.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_builder() {
        let column = Column::new("bio", Domain::Text).nullable();
        assert!(column.is_nullable());
        assert_eq!(column.storage(), &StorageType::Text);

        let column = Column::new("author_id", Domain::Integer)
            .nullable()
            .references("authors", "id");
        assert_eq!(
            column.foreign_key(),
            Some(&ForeignKey {
                table: "authors".to_string(),
                column: "id".to_string()
            })
        );
    }

    #[test]
    fn test_default_expressions_evaluate_to_matching_types() {
        assert!(matches!(DefaultExpression::CurrentDate.evaluate(), StoreValue::Date(_)));
        assert!(matches!(DefaultExpression::CurrentDateTime.evaluate(), StoreValue::DateTime(_)));
        assert!(matches!(DefaultExpression::CurrentTimestamp.evaluate(), StoreValue::Timestamp(_)));
    }

    #[test]
    fn test_current_timestamp_follows_column_zone() {
        let now = DefaultExpression::CurrentTimestamp;
        assert_eq!(now.to_sql(&StorageType::TimestampTz), "CURRENT_TIMESTAMP");
        assert_eq!(
            now.to_sql(&StorageType::Timestamp),
            "(CURRENT_TIMESTAMP AT TIME ZONE 'UTC')"
        );
        assert_eq!(DefaultExpression::CurrentDate.to_sql(&StorageType::Date), "CURRENT_DATE");
    }
}
