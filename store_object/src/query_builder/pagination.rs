//! Page-number pagination

use crate::errors::QueryError;

/// A 1-indexed page of `size` rows. The offset is computed once, so a page
/// whose offset does not fit an `i64` cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: i64,
    size: i64,
    offset: i64,
}

impl Page {
    pub fn new(number: i64, size: i64) -> Result<Self, QueryError> {
        if number < 1 {
            return Err(QueryError::InvalidPage(number));
        }
        if size < 1 {
            return Err(QueryError::InvalidPageSize(size));
        }
        let offset = (number - 1)
            .checked_mul(size)
            .ok_or(QueryError::InvalidPage(number))?;
        Ok(Self {
            number,
            size,
            offset,
        })
    }

    pub fn number(&self) -> i64 {
        self.number
    }

    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }
}
