//! Application data sources built on typed stores

pub mod books;
pub mod movies;
pub mod users;

pub use books::{Author, AuthorBook, Book, BookDataSource};
pub use movies::{Actor, Movie, MoviesDataSource};
pub use users::{Role, SimpleData, User, UserDataSource};
