//! Authors, books, and the joins between them

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use store_object::prelude::*;

use crate::core::RowKeeper;
use crate::errors::RowKeeperError;

pub const AUTHORS_TABLE: &str = "authors";
pub const BOOKS_TABLE: &str = "books";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: Option<i32>,
    pub name: String,
}

impl Entity for Author {
    type Key = i32;

    fn key(&self) -> Option<i32> {
        self.id
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
    }

    fn from_record(record: &Record) -> Result<Self, DecodeError> {
        Ok(Self {
            id: record.get_as("id")?,
            name: record.get_as("name")?,
        })
    }
}

/// A book, possibly without a known author
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Option<i32>,
    pub title: String,
    pub author_id: Option<i32>,
}

impl Entity for Book {
    type Key = i32;

    fn key(&self) -> Option<i32> {
        self.id
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("title", self.title.as_str())
            .with("author_id", self.author_id)
    }

    fn from_record(record: &Record) -> Result<Self, DecodeError> {
        Ok(Self {
            id: record.get_as("id")?,
            title: record.get_as("title")?,
            author_id: record.get_as("author_id")?,
        })
    }
}

pub fn authors_schema() -> Result<Schema, SchemaError> {
    Schema::define(
        AUTHORS_TABLE,
        vec![
            Column::new("id", Domain::Integer).auto_increment(),
            Column::new("name", Domain::Varchar(100)),
        ],
        "id",
    )
}

pub fn books_schema() -> Result<Schema, SchemaError> {
    Schema::define(
        BOOKS_TABLE,
        vec![
            Column::new("id", Domain::Integer).auto_increment(),
            Column::new("title", Domain::Varchar(150)),
            Column::new("author_id", Domain::Integer)
                .nullable()
                .references(AUTHORS_TABLE, "id"),
        ],
        "id",
    )
}

/// One row of an authors/books join: either side may be missing in outer
/// joins
pub type AuthorBook = (Option<String>, Option<String>);

#[derive(Debug, Clone)]
pub struct BookDataSource {
    authors: GenericStore<Author>,
    books: GenericStore<Book>,
}

impl BookDataSource {
    pub async fn new(keeper: &mut RowKeeper) -> Result<Self, RowKeeperError> {
        keeper.register_schema(authors_schema()?)?;
        keeper.register_schema(books_schema()?)?;

        let source = Self {
            authors: keeper.store(AUTHORS_TABLE)?,
            books: keeper.store(BOOKS_TABLE)?,
        };
        source.authors.ensure_exists().await?;
        source.books.ensure_exists().await?;
        Ok(source)
    }

    pub fn authors(&self) -> &GenericStore<Author> {
        &self.authors
    }

    pub fn books(&self) -> &GenericStore<Book> {
        &self.books
    }

    /// Three authors and four books; Author3 wrote nothing and Book4 has no
    /// author.
    pub async fn seed(&self) -> Result<(), DataError> {
        let mut ids = Vec::with_capacity(3);
        for name in ["Author1", "Author2", "Author3"] {
            let author = Author {
                id: None,
                name: name.to_string(),
            };
            ids.push(self.authors.insert_returning_key(&author).await?);
        }

        let books = [
            ("Book1", Some(ids[0])),
            ("Book2", Some(ids[0])),
            ("Book3", Some(ids[1])),
            ("Book4", None),
        ];
        for (title, author_id) in books {
            let book = Book {
                id: None,
                title: title.to_string(),
                author_id,
            };
            self.books.insert(&book).await?;
        }
        Ok(())
    }

    /// Authors with the books they wrote
    pub async fn inner_join(&self) -> Result<Vec<AuthorBook>, DataError> {
        self.joined(JoinType::Inner).await
    }

    /// Every author, with a missing title for authors without books
    pub async fn left_join(&self) -> Result<Vec<AuthorBook>, DataError> {
        self.joined(JoinType::Left).await
    }

    /// Every book, with a missing name for books without an author
    pub async fn right_join(&self) -> Result<Vec<AuthorBook>, DataError> {
        self.joined(JoinType::Right).await
    }

    pub async fn full_join(&self) -> Result<Vec<AuthorBook>, DataError> {
        self.joined(JoinType::Full).await
    }

    /// Every author paired with every book
    pub async fn cross_join(&self) -> Result<Vec<AuthorBook>, DataError> {
        self.joined(JoinType::Cross).await
    }

    async fn joined(&self, join_type: JoinType) -> Result<Vec<AuthorBook>, DataError> {
        let books: Arc<Schema> = self.books.schema().clone();
        let join = JoinClause::from_relation(join_type, self.authors.schema(), books)?;
        let query = QueryBuilder::new()
            .order_by("authors.name", SortOrder::Asc)
            .order_by("books.title", SortOrder::Asc);

        let rows = self.authors.fetch_joined(join, query).await?;
        let pairs = rows
            .iter()
            .map(|row| {
                Ok((
                    row.get_as::<Option<String>>("authors.name")?,
                    row.get_as::<Option<String>>("books.title")?,
                ))
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        for (author, title) in &pairs {
            tracing::debug!(
                "[{:?}] {} - {}",
                join_type,
                author.as_deref().unwrap_or("null"),
                title.as_deref().unwrap_or("null")
            );
        }
        Ok(pairs)
    }
}
