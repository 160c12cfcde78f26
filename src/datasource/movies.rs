//! Movies and their actors

use serde::{Deserialize, Serialize};
use store_object::prelude::*;
use type_mapping::FromStoreValue;

use crate::core::RowKeeper;
use crate::errors::RowKeeperError;

pub const MOVIES_TABLE: &str = "movies";
pub const ACTORS_TABLE: &str = "actors";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: Option<i32>,
    pub title: String,
    pub genre: String,
    pub description: Option<String>,
    pub duration: i32,
    pub tags: Vec<String>,
}

impl Movie {
    pub fn new(title: &str, genre: &str, description: &str, duration: i32, tags: &[&str]) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            genre: genre.to_string(),
            description: Some(description.to_string()),
            duration,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    fn clone_without_id(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }
}

impl Entity for Movie {
    type Key = i32;

    fn key(&self) -> Option<i32> {
        self.id
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("title", self.title.as_str())
            .with("genre", self.genre.as_str())
            .with("description", self.description.clone())
            .with("duration_in_minutes", self.duration)
            .with("tags", self.tags.clone())
    }

    fn from_record(record: &Record) -> Result<Self, DecodeError> {
        Ok(Self {
            id: record.get_as("id")?,
            title: record.get_as("title")?,
            genre: record.get_as("genre")?,
            description: record.get_as("description")?,
            duration: record.get_as("duration_in_minutes")?,
            tags: record.get_as("tags")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<i32>,
    pub movie_id: i32,
    pub name: String,
}

impl Actor {
    pub fn new(movie_id: i32, name: &str) -> Self {
        Self {
            id: None,
            movie_id,
            name: name.to_string(),
        }
    }
}

impl Entity for Actor {
    type Key = i32;

    fn key(&self) -> Option<i32> {
        self.id
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("movie_id", self.movie_id)
            .with("name", self.name.as_str())
    }

    fn from_record(record: &Record) -> Result<Self, DecodeError> {
        Ok(Self {
            id: record.get_as("id")?,
            movie_id: record.get_as("movie_id")?,
            name: record.get_as("name")?,
        })
    }
}

pub fn movies_schema() -> Result<Schema, SchemaError> {
    Schema::define(
        MOVIES_TABLE,
        vec![
            Column::new("id", Domain::Integer).auto_increment(),
            Column::new("title", Domain::Varchar(100)),
            Column::new("genre", Domain::Varchar(100)),
            Column::new("description", Domain::Text).nullable(),
            Column::new("duration_in_minutes", Domain::Integer),
            Column::new("tags", Domain::array(Domain::Varchar(70))),
        ],
        "id",
    )
}

pub fn actors_schema() -> Result<Schema, SchemaError> {
    Schema::define(
        ACTORS_TABLE,
        vec![
            Column::new("id", Domain::Integer).auto_increment(),
            Column::new("movie_id", Domain::Integer).references(MOVIES_TABLE, "id"),
            Column::new("name", Domain::Varchar(100)),
        ],
        "id",
    )
}

/// Every movie query the application runs
#[derive(Debug, Clone)]
pub struct MoviesDataSource {
    movies: GenericStore<Movie>,
    actors: GenericStore<Actor>,
    default_page_size: i64,
    max_page_size: i64,
}

impl MoviesDataSource {
    /// Register the movie tables with `keeper` and create them
    pub async fn new(keeper: &mut RowKeeper) -> Result<Self, RowKeeperError> {
        keeper.register_schema(movies_schema()?)?;
        keeper.register_schema(actors_schema()?)?;

        let source = Self {
            movies: keeper.store(MOVIES_TABLE)?,
            actors: keeper.store(ACTORS_TABLE)?,
            default_page_size: keeper.query_config().default_page_size,
            max_page_size: keeper.query_config().max_page_size,
        };
        source.movies.ensure_exists().await?;
        source.actors.ensure_exists().await?;
        Ok(source)
    }

    pub fn movies(&self) -> &GenericStore<Movie> {
        &self.movies
    }

    pub fn actors(&self) -> &GenericStore<Actor> {
        &self.actors
    }

    // ========================================
    // INSERT
    // ========================================

    pub async fn insert(&self, movie: &Movie) -> Result<(), DataError> {
        self.movies.insert(&movie.clone_without_id()).await
    }

    pub async fn insert_and_get_id(&self, movie: &Movie) -> Result<i32, DataError> {
        self.movies
            .insert_returning_key(&movie.clone_without_id())
            .await
    }

    /// Insert unless a movie with the same id exists
    pub async fn insert_ignore(&self, movie: &Movie) -> Result<(), DataError> {
        self.movies.insert_ignore(movie).await
    }

    /// The new id, or `None` when a movie with the same id exists
    pub async fn insert_ignore_and_get_id(&self, movie: &Movie) -> Result<Option<i32>, DataError> {
        self.movies.insert_ignore_returning_key(movie).await
    }

    pub async fn batch_insert(&self, movies: &[Movie]) -> Result<u64, DataError> {
        let movies: Vec<Movie> = movies.iter().map(Movie::clone_without_id).collect();
        self.movies.batch_insert(&movies).await
    }

    pub async fn add_actor(&self, actor: &Actor) -> Result<i32, DataError> {
        self.actors.insert_returning_key(actor).await
    }

    // ========================================
    // READ
    // ========================================

    pub async fn all_movies(&self) -> Result<Vec<Movie>, DataError> {
        self.movies.list_all().await
    }

    pub async fn movie_by_id(&self, id: i32) -> Result<Option<Movie>, DataError> {
        self.movies.fetch_by_id(&id).await
    }

    pub async fn movies_not_in_genre(&self, genre: &str) -> Result<Vec<Movie>, DataError> {
        self.filtered(Condition::neq("genre", genre)).await
    }

    pub async fn movies_with_null_description(&self) -> Result<Vec<Movie>, DataError> {
        self.filtered(Condition::is_null("description")).await
    }

    pub async fn movies_with_description(&self) -> Result<Vec<Movie>, DataError> {
        self.filtered(Condition::is_not_null("description")).await
    }

    /// Shorter than two hours
    pub async fn short_movies(&self) -> Result<Vec<Movie>, DataError> {
        self.filtered(Condition::less("duration_in_minutes", 120)).await
    }

    pub async fn long_movies(&self) -> Result<Vec<Movie>, DataError> {
        self.filtered(Condition::greater_eq("duration_in_minutes", 120))
            .await
    }

    pub async fn short_action_movies(&self) -> Result<Vec<Movie>, DataError> {
        self.filtered(
            Condition::eq("genre", "Action").and(Condition::less("duration_in_minutes", 120)),
        )
        .await
    }

    pub async fn short_or_action_movies(&self) -> Result<Vec<Movie>, DataError> {
        self.filtered(
            Condition::eq("genre", "Action").or(Condition::less("duration_in_minutes", 120)),
        )
        .await
    }

    /// Titles whose first word is `prefix`
    pub async fn titles_starting_with(&self, prefix: &str) -> Result<Vec<Movie>, DataError> {
        self.filtered(Condition::like("title", &format!("{} %", prefix)))
            .await
    }

    pub async fn titles_not_starting_with(&self, prefix: &str) -> Result<Vec<Movie>, DataError> {
        self.filtered(Condition::not_like("title", &format!("{} %", prefix)))
            .await
    }

    pub async fn titles_matching(&self, pattern: &str) -> Result<Vec<Movie>, DataError> {
        self.filtered(Condition::regex_match("title", pattern)).await
    }

    /// Duration in `min..=max`
    pub async fn within_duration(&self, min: i32, max: i32) -> Result<Vec<Movie>, DataError> {
        self.filtered(Condition::between("duration_in_minutes", min, max))
            .await
    }

    pub async fn by_genres(&self, genres: &[&str]) -> Result<Vec<Movie>, DataError> {
        self.filtered(Condition::in_list("genre", genres.to_vec()))
            .await
    }

    pub async fn not_in_genres(&self, genres: &[&str]) -> Result<Vec<Movie>, DataError> {
        self.filtered(Condition::not_in_list("genre", genres.to_vec()))
            .await
    }

    /// Movies matching every filter given. A blank genre or a non-positive
    /// duration is no filter.
    pub async fn find_conditionally(
        &self,
        genre: Option<&str>,
        max_duration: Option<i32>,
    ) -> Result<Vec<Movie>, DataError> {
        let query = QueryBuilder::new()
            .and_where_if(
                genre
                    .filter(|g| !g.trim().is_empty())
                    .map(|g| Condition::eq("genre", g)),
            )
            .and_where_if(
                max_duration
                    .filter(|d| *d > 0)
                    .map(|d| Condition::less_eq("duration_in_minutes", d)),
            );
        self.movies.fetch_all(query).await
    }

    /// Genres by number of movies, most common first
    pub async fn top_genres(&self) -> Result<Vec<(String, i64)>, DataError> {
        self.movies
            .count_grouped_by("genre")
            .await?
            .into_iter()
            .map(|(genre, count)| Ok((String::from_store_value(&genre)?, count)))
            .collect()
    }

    /// One page of movies, numbered from 1. The page size defaults to the
    /// configured size and is capped at the configured maximum.
    pub async fn paged(&self, page: i64, size: Option<i64>) -> Result<Vec<Movie>, DataError> {
        let size = size.unwrap_or(self.default_page_size).min(self.max_page_size);
        self.movies.page(page, size).await
    }

    async fn filtered(&self, condition: Condition) -> Result<Vec<Movie>, DataError> {
        self.movies.fetch_all(QueryBuilder::new().filter(condition)).await
    }

    // ========================================
    // UPDATE
    // ========================================

    /// Overwrite the movie with the same id. Movies without an id match
    /// nothing.
    pub async fn update_by_id(&self, movie: &Movie) -> Result<u64, DataError> {
        self.movies.update(movie).await
    }

    /// Insert the movie, or merge it into the stored one: the genre becomes
    /// `new | old`, durations add up, the description is replaced and the
    /// stored tags are kept. Movies without an id are not written.
    pub async fn upsert(&self, movie: &Movie) -> Result<(), DataError> {
        let Some(id) = movie.id else {
            return Ok(());
        };
        let merge = UpsertClause::new()
            .set("description", Expr::value(movie.description.clone()))
            .set(
                "genre",
                Expr::concat(vec![
                    Expr::incoming("genre"),
                    Expr::value(" | "),
                    Expr::existing("genre"),
                ]),
            )
            .set(
                "duration_in_minutes",
                Expr::existing("duration_in_minutes").add(Expr::value(movie.duration)),
            )
            .exclude("tags")
            .guard(Condition::eq("id", id));
        self.movies.upsert(movie, merge).await
    }

    pub async fn update_duration_by_genre(&self, duration: i32, genre: &str) -> Result<u64, DataError> {
        self.movies
            .update_where(
                Condition::eq("genre", genre),
                UpdateSet::new().set("duration_in_minutes", duration),
            )
            .await
    }

    // ========================================
    // DELETE
    // ========================================

    pub async fn delete_by_id(&self, id: i32) -> Result<u64, DataError> {
        self.movies.delete_by_id(&id).await
    }

    pub async fn delete_by_genre(&self, genre: &str) -> Result<u64, DataError> {
        self.movies.delete_where(Condition::eq("genre", genre)).await
    }

    /// Remove the cast of one movie
    pub async fn delete_actors_by_movie(&self, movie_id: i32) -> Result<u64, DataError> {
        self.actors
            .delete_where(Condition::eq("movie_id", movie_id))
            .await
    }

    pub async fn delete_all(&self) -> Result<u64, DataError> {
        self.movies.delete_all().await
    }
}
