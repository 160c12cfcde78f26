//! Sort order for `ORDER BY` clauses.
//!
//! Ascending order puts nulls last, descending order puts them first, which
//! matches PostgreSQL's default.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}
