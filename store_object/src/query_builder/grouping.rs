use super::condition::Condition;

/// A GROUP BY clause with an optional HAVING condition. HAVING columns name
/// either grouped columns or aggregate aliases.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy {
    /// Fields to group by
    pub fields: Vec<String>,
    pub having: Option<Condition>,
}

impl GroupBy {
    pub fn new(fields: Vec<String>) -> Self {
        Self {
            fields,
            having: None,
        }
    }

    /// Create a GROUP BY clause with a single field
    pub fn single(field: impl Into<String>) -> Self {
        Self::new(vec![field.into()])
    }

    /// Add a HAVING condition. Repeated calls are ANDed together.
    pub fn having(mut self, condition: Condition) -> Self {
        self.having = Some(match self.having.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn has_having(&self) -> bool {
        self.having.as_ref().is_some_and(|h| !h.is_all())
    }
}
