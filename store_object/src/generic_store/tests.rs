use super::GenericStore;
use crate::errors::{DataError, QueryError};
use crate::executor::MemoryExecutor;
use crate::query_builder::{Condition, QueryBuilder, SortOrder, UpdateSet};
use crate::record::Record;
use crate::schema::{Column, Schema};
use crate::traits::{Entity, StoreObject};
use std::sync::Arc;
use type_mapping::{DecodeError, Domain, StoreValue};

#[derive(Debug, Clone, PartialEq)]
struct Film {
    id: Option<i32>,
    title: String,
    genre: String,
    minutes: i32,
}

impl Film {
    fn new(title: &str, genre: &str, minutes: i32) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            genre: genre.to_string(),
            minutes,
        }
    }
}

impl Entity for Film {
    type Key = i32;

    fn key(&self) -> Option<i32> {
        self.id
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("title", self.title.as_str())
            .with("genre", self.genre.as_str())
            .with("minutes", self.minutes)
    }

    fn from_record(record: &Record) -> Result<Self, DecodeError> {
        Ok(Self {
            id: record.get_as("id")?,
            title: record.get_as("title")?,
            genre: record.get_as("genre")?,
            minutes: record.get_as("minutes")?,
        })
    }
}

async fn store() -> GenericStore<Film> {
    let schema = Schema::define(
        "films",
        vec![
            Column::new("id", Domain::Integer).auto_increment(),
            Column::new("title", Domain::Varchar(20)),
            Column::new("genre", Domain::Varchar(20)),
            Column::new("minutes", Domain::Integer),
        ],
        "id",
    )
    .unwrap();
    let store = GenericStore::new(Arc::new(MemoryExecutor::new()), Arc::new(schema));
    store.ensure_exists().await.unwrap();
    store
}

#[tokio::test]
async fn test_insert_returning_key_and_fetch_by_id() {
    let store = store().await;
    let first = store
        .insert_returning_key(&Film::new("Alien", "Horror", 117))
        .await
        .unwrap();
    let second = store
        .insert_returning_key(&Film::new("Heat", "Crime", 170))
        .await
        .unwrap();
    assert_eq!((first, second), (1, 2));

    let heat = store.fetch_by_id(&2).await.unwrap().unwrap();
    assert_eq!(heat.title, "Heat");
    assert_eq!(heat.id, Some(2));
    assert!(store.fetch_by_id(&9).await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_ignore_returning_key_skips_existing() {
    let store = store().await;
    let id = store
        .insert_returning_key(&Film::new("Alien", "Horror", 117))
        .await
        .unwrap();

    let mut again = Film::new("Aliens", "Action", 137);
    again.id = Some(id);
    assert_eq!(store.insert_ignore_returning_key(&again).await.unwrap(), None);

    let err = store.insert(&again).await.unwrap_err();
    assert!(matches!(&err, DataError::Executor(e) if e.is_unique_violation()));
    assert_eq!(store.fetch_by_id(&id).await.unwrap().unwrap().title, "Alien");
}

#[tokio::test]
async fn test_batch_insert_is_all_or_nothing() {
    let store = store().await;
    assert_eq!(store.batch_insert(&[]).await.unwrap(), 0);

    let films = vec![
        Film::new("Alien", "Horror", 117),
        Film::new("A title far too long to fit", "Drama", 90),
    ];
    let err = store.batch_insert(&films).await.unwrap_err();
    assert!(err.as_validation().is_some());
    assert!(store.list_all().await.unwrap().is_empty());

    let films = vec![
        Film::new("Alien", "Horror", 117),
        Film::new("Heat", "Crime", 170),
    ];
    assert_eq!(store.batch_insert(&films).await.unwrap(), 2);
}

#[tokio::test]
async fn test_update_by_entity_and_where() {
    let store = store().await;
    let id = store
        .insert_returning_key(&Film::new("Alien", "Horror", 117))
        .await
        .unwrap();

    assert_eq!(store.update(&Film::new("Ghost", "Drama", 1)).await.unwrap(), 0);

    let mut film = store.fetch_by_id(&id).await.unwrap().unwrap();
    film.minutes = 116;
    assert_eq!(store.update(&film).await.unwrap(), 1);

    let changed = store
        .update_where(
            Condition::eq("genre", "Horror"),
            UpdateSet::new().increment("minutes", 10),
        )
        .await
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(
        store
            .update_where(Condition::all(), UpdateSet::new())
            .await
            .unwrap(),
        0
    );
    assert_eq!(store.fetch_by_id(&id).await.unwrap().unwrap().minutes, 126);
}

#[tokio::test]
async fn test_counts_and_pages() {
    let store = store().await;
    let films = vec![
        Film::new("Alien", "Horror", 117),
        Film::new("Heat", "Crime", 170),
        Film::new("Ronin", "Crime", 122),
        Film::new("Saw", "Horror", 103),
        Film::new("Up", "Family", 96),
    ];
    store.batch_insert(&films).await.unwrap();

    let grouped = store.count_grouped_by("genre").await.unwrap();
    assert_eq!(
        grouped,
        vec![
            (StoreValue::from("Crime"), 2),
            (StoreValue::from("Horror"), 2),
            (StoreValue::from("Family"), 1),
        ]
    );

    assert_eq!(
        store.count_where(Condition::less("minutes", 120)).await.unwrap(),
        3
    );
    assert_eq!(store.count_where(Condition::eq("genre", "Noir")).await.unwrap(), 0);

    let page: Vec<i32> = store
        .page(2, 2)
        .await
        .unwrap()
        .into_iter()
        .filter_map(|f| f.id)
        .collect();
    assert_eq!(page, vec![3, 4]);
    assert!(store.page(4, 2).await.unwrap().is_empty());
    assert!(matches!(
        store.page(0, 2).await,
        Err(DataError::Query(QueryError::InvalidPage(0)))
    ));
}

#[tokio::test]
async fn test_fetch_all_rejects_grouping() {
    let store = store().await;
    let query = QueryBuilder::new().group_by(crate::query_builder::GroupBy::single("genre"));
    assert!(matches!(
        store.fetch_all(query).await,
        Err(DataError::Query(QueryError::InvalidQuery(_)))
    ));
}

#[tokio::test]
async fn test_fetch_one_and_deletes() {
    let store = store().await;
    store
        .batch_insert(&[
            Film::new("Alien", "Horror", 117),
            Film::new("Heat", "Crime", 170),
            Film::new("Up", "Family", 96),
        ])
        .await
        .unwrap();

    let longest = store
        .fetch_one(QueryBuilder::new().order_by("minutes", SortOrder::Desc))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(longest.title, "Heat");

    assert_eq!(store.delete_by_id(&1).await.unwrap(), 1);
    assert_eq!(store.delete_by_id(&1).await.unwrap(), 0);
    assert_eq!(store.delete_all().await.unwrap(), 2);
    assert!(store.list_all().await.unwrap().is_empty());
}
