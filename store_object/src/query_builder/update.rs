//! Assignment expressions for UPDATE statements and upsert merges

use super::condition::Condition;
use crate::schema::DefaultExpression;
use type_mapping::StoreValue;

/// Right-hand side of a column assignment.
///
/// `Incoming` names the value proposed by the row being inserted and is only
/// meaningful inside an upsert merge. `Existing` names the value currently
/// stored in the row being updated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(StoreValue),
    Incoming(String),
    Existing(String),
    Expression(DefaultExpression),
    /// String concatenation (`||`)
    Concat(Vec<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Subtract(Box<Expr>, Box<Expr>),
    Multiply(Box<Expr>, Box<Expr>),
    Divide(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn value(value: impl Into<StoreValue>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn incoming(column: impl Into<String>) -> Self {
        Expr::Incoming(column.into())
    }

    pub fn existing(column: impl Into<String>) -> Self {
        Expr::Existing(column.into())
    }

    pub fn concat(parts: Vec<Expr>) -> Self {
        Expr::Concat(parts)
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(other))
    }

    pub fn subtract(self, other: Expr) -> Self {
        Expr::Subtract(Box::new(self), Box::new(other))
    }

    pub fn multiply(self, other: Expr) -> Self {
        Expr::Multiply(Box::new(self), Box::new(other))
    }

    pub fn divide(self, other: Expr) -> Self {
        Expr::Divide(Box::new(self), Box::new(other))
    }

    /// Whether the expression reads the incoming row anywhere
    pub fn uses_incoming(&self) -> bool {
        match self {
            Expr::Incoming(_) => true,
            Expr::Literal(_) | Expr::Existing(_) | Expr::Expression(_) => false,
            Expr::Concat(parts) => parts.iter().any(Expr::uses_incoming),
            Expr::Add(l, r) | Expr::Subtract(l, r) | Expr::Multiply(l, r) | Expr::Divide(l, r) => {
                l.uses_incoming() || r.uses_incoming()
            }
        }
    }
}

/// Type of update operation to perform on a field
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperation {
    /// field = value
    Set(StoreValue),
    /// field = field + value
    Increment(StoreValue),
    /// field = field - value
    Decrement(StoreValue),
    /// field = field * value
    Multiply(StoreValue),
    /// field = field / value
    Divide(StoreValue),
    /// field = field || value
    Concat(StoreValue),
}

impl UpdateOperation {
    /// The assignment expression for `column`
    pub fn to_expr(&self, column: &str) -> Expr {
        let existing = || Expr::existing(column);
        match self {
            UpdateOperation::Set(v) => Expr::value(v.clone()),
            UpdateOperation::Increment(v) => existing().add(Expr::value(v.clone())),
            UpdateOperation::Decrement(v) => existing().subtract(Expr::value(v.clone())),
            UpdateOperation::Multiply(v) => existing().multiply(Expr::value(v.clone())),
            UpdateOperation::Divide(v) => existing().divide(Expr::value(v.clone())),
            UpdateOperation::Concat(v) => Expr::concat(vec![existing(), Expr::value(v.clone())]),
        }
    }

    /// Get the value to bind as a parameter
    pub fn value(&self) -> &StoreValue {
        match self {
            UpdateOperation::Set(v)
            | UpdateOperation::Increment(v)
            | UpdateOperation::Decrement(v)
            | UpdateOperation::Multiply(v)
            | UpdateOperation::Divide(v)
            | UpdateOperation::Concat(v) => v,
        }
    }
}

/// Ordered column assignments for `update_where`. Assigning the same field
/// twice keeps the last operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    operations: Vec<(String, UpdateOperation)>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, field: impl Into<String>, operation: UpdateOperation) -> Self {
        let field = field.into();
        match self.operations.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => *slot = operation,
            None => self.operations.push((field, operation)),
        }
        self
    }

    /// Set a field to a specific value
    pub fn set(self, field: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        self.push(field, UpdateOperation::Set(value.into()))
    }

    pub fn increment(self, field: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        self.push(field, UpdateOperation::Increment(value.into()))
    }

    pub fn decrement(self, field: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        self.push(field, UpdateOperation::Decrement(value.into()))
    }

    pub fn multiply(self, field: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        self.push(field, UpdateOperation::Multiply(value.into()))
    }

    pub fn divide(self, field: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        self.push(field, UpdateOperation::Divide(value.into()))
    }

    /// Append text to a string column
    pub fn concat(self, field: impl Into<String>, value: impl Into<StoreValue>) -> Self {
        self.push(field, UpdateOperation::Concat(value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UpdateOperation)> {
        self.operations.iter().map(|(field, op)| (field.as_str(), op))
    }

    /// Assignments in the order they were added
    pub fn assignments(&self) -> Vec<(String, Expr)> {
        self.operations
            .iter()
            .map(|(field, op)| (field.clone(), op.to_expr(field)))
            .collect()
    }
}

/// Merge rule applied when an upsert hits an existing primary key.
///
/// Every non-key column is written on conflict: with its explicit assignment
/// if one is given, otherwise with the incoming value. Excluded columns keep
/// their stored value. The optional guard limits which existing rows are
/// updated; rows failing it are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertClause {
    pub assignments: Vec<(String, Expr)>,
    pub exclude: Vec<String>,
    pub guard: Option<Condition>,
}

impl UpsertClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: impl Into<String>, expr: Expr) -> Self {
        let column = column.into();
        self.assignments.retain(|(name, _)| *name != column);
        self.assignments.push((column, expr));
        self
    }

    /// Keep the stored value of `column` on conflict
    pub fn exclude(mut self, column: impl Into<String>) -> Self {
        self.exclude.push(column.into());
        self
    }

    pub fn guard(mut self, condition: Condition) -> Self {
        self.guard = Some(condition);
        self
    }

    pub fn assignment(&self, column: &str) -> Option<&Expr> {
        self.assignments
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, expr)| expr)
    }

    pub fn is_excluded(&self, column: &str) -> bool {
        self.exclude.iter().any(|c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_set_keeps_order_and_last_write() {
        let set = UpdateSet::new()
            .increment("duration_in_minutes", 10)
            .set("genre", "Drama")
            .set("duration_in_minutes", 90);
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.assignments(),
            vec![
                ("duration_in_minutes".to_string(), Expr::value(90)),
                ("genre".to_string(), Expr::value("Drama")),
            ]
        );
    }

    #[test]
    fn test_operations_reference_existing_value() {
        assert_eq!(
            UpdateOperation::Increment(StoreValue::Integer(5)).to_expr("duration_in_minutes"),
            Expr::existing("duration_in_minutes").add(Expr::value(5))
        );
        assert_eq!(
            UpdateOperation::Concat(StoreValue::from("!")).to_expr("title"),
            Expr::concat(vec![Expr::existing("title"), Expr::value("!")])
        );
    }

    #[test]
    fn test_upsert_clause_builder() {
        let clause = UpsertClause::new()
            .set(
                "genre",
                Expr::concat(vec![Expr::incoming("genre"), Expr::value(" | "), Expr::existing("genre")]),
            )
            .exclude("tags")
            .guard(Condition::eq("id", 1));

        assert!(clause.assignment("genre").is_some_and(Expr::uses_incoming));
        assert!(clause.assignment("title").is_none());
        assert!(clause.is_excluded("tags"));
        assert!(!clause.is_excluded("title"));
        assert_eq!(clause.guard, Some(Condition::eq("id", 1)));
    }
}
