//! Incremental query construction
//!
//! `QueryBuilder` collects a condition, ordering, grouping, projection and
//! limits for one read. Conditions added with `and_where` / `or_where` are
//! combined left to right in call order, so
//!
//! ```text
//! QueryBuilder::new().and_where(a).or_where(b).and_where(c)
//! ```
//!
//! filters on `(a OR b) AND c`. The first predicate added to an empty
//! builder is installed as is, whichever method adds it. When two optional
//! filters must both hold, add both with `and_where_if`; mixing in
//! `or_where_if` widens the result instead of narrowing it.

use super::aggregation::SelectField;
use super::condition::Condition;
use super::grouping::GroupBy;
use super::ordering::SortOrder;
use super::pagination::Page;

/// Query builder for constructing database reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    pub(crate) condition: Option<Condition>,
    pub(crate) order_by: Vec<(String, SortOrder)>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
    pub(crate) group_by: Option<GroupBy>,
    pub(crate) select: Vec<SelectField>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter condition (combined with AND)
    pub fn filter(self, condition: Condition) -> Self {
        self.and_where(condition)
    }

    pub fn and_where(mut self, condition: Condition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn or_where(mut self, condition: Condition) -> Self {
        self.condition = Some(match self.condition.take() {
            Some(existing) => existing.or(condition),
            None => condition,
        });
        self
    }

    /// `and_where` when a condition is given, no-op otherwise
    pub fn and_where_if(self, condition: Option<Condition>) -> Self {
        match condition {
            Some(condition) => self.and_where(condition),
            None => self,
        }
    }

    /// `or_where` when a condition is given, no-op otherwise
    pub fn or_where_if(self, condition: Option<Condition>) -> Self {
        match condition {
            Some(condition) => self.or_where(condition),
            None => self,
        }
    }

    /// Add ordering
    pub fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by.push((field.to_string(), order));
        self
    }

    /// Add limit
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Add offset
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn page(self, page: Page) -> Self {
        self.limit(page.limit()).offset(page.offset())
    }

    pub fn group_by(mut self, group_by: GroupBy) -> Self {
        self.group_by = Some(group_by);
        self
    }

    /// Replace the projection. An empty projection selects every column.
    pub fn select(mut self, fields: Vec<SelectField>) -> Self {
        self.select = fields;
        self
    }

    /// The combined condition, `Condition::All` when none was added
    pub fn condition(&self) -> Condition {
        self.condition.clone().unwrap_or(Condition::All)
    }

    pub fn order(&self) -> &[(String, SortOrder)] {
        &self.order_by
    }

    pub fn limit_value(&self) -> Option<i64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<i64> {
        self.offset
    }

    pub fn grouping(&self) -> Option<&GroupBy> {
        self.group_by.as_ref()
    }

    pub fn projection(&self) -> &[SelectField] {
        &self.select
    }

    /// Whether the projection or grouping turns this into an aggregate read
    pub fn is_aggregate(&self) -> bool {
        self.group_by.is_some() || self.select.iter().any(SelectField::is_aggregate)
    }
}
