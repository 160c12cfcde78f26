//! Movies data source against the in-memory store

use rowkeeper::datasource::{Actor, Movie, MoviesDataSource};
use rowkeeper::prelude::*;
use store_object::ConstraintKind;

async fn source() -> MoviesDataSource {
    let mut keeper = RowKeeper::in_memory();
    MoviesDataSource::new(&mut keeper).await.unwrap()
}

fn catalogue() -> Vec<Movie> {
    vec![
        Movie::new("The Dark Knight", "Action", "Batman faces the Joker", 152, &["dc", "crime"]),
        Movie::new("Up", "Family", "", 96, &["adventure"]),
        Movie::new("The Raid", "Action", "A tower block siege", 101, &["martial arts"]),
        Movie::new("Heat", "Crime", "A heist in Los Angeles", 170, &["heist"]),
        Movie::new("Amelie", "Romance", "Paris and a garden gnome", 122, &[]),
    ]
}

async fn seeded() -> MoviesDataSource {
    let source = source().await;
    assert_eq!(source.batch_insert(&catalogue()).await.unwrap(), 5);
    source
}

fn titles(movies: &[Movie]) -> Vec<&str> {
    let mut titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
    titles.sort_unstable();
    titles
}

#[tokio::test]
async fn test_up_scenario() {
    let source = source().await;
    let up = Movie::new("Up", "Family", "", 96, &["adventure"]);
    source.insert(&up).await.unwrap();

    let all = source.all_movies().await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].id.is_some());
    assert_eq!(all[0], up.clone().with_id(all[0].id.unwrap()));

    let short = source
        .movies()
        .fetch_all(QueryBuilder::new().filter(Condition::less("duration_in_minutes", 120)))
        .await
        .unwrap();
    assert_eq!(short.len(), 1);

    let action = source
        .movies()
        .fetch_all(QueryBuilder::new().filter(Condition::eq("genre", "Action")))
        .await
        .unwrap();
    assert!(action.is_empty());
}

#[tokio::test]
async fn test_insert_then_fetch_by_generated_key() {
    let source = source().await;
    let heat = Movie::new("Heat", "Crime", "A heist", 170, &["heist", "la"]);
    let id = source.insert_and_get_id(&heat).await.unwrap();
    let stored = source.movie_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored, heat.with_id(id));
    assert!(source.movie_by_id(id + 1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_ignore_keeps_existing_row() {
    let source = seeded().await;
    let clash = Movie::new("Other", "Drama", "x", 90, &[]).with_id(1);
    assert_eq!(source.insert_ignore_and_get_id(&clash).await.unwrap(), None);
    source.insert_ignore(&clash).await.unwrap();
    assert_eq!(
        source.movie_by_id(1).await.unwrap().unwrap().title,
        "The Dark Knight"
    );

    let fresh = Movie::new("Other", "Drama", "x", 90, &[]).with_id(50);
    assert_eq!(source.insert_ignore_and_get_id(&fresh).await.unwrap(), Some(50));
    assert_eq!(source.movie_by_id(50).await.unwrap().unwrap(), fresh);
}

#[tokio::test]
async fn test_invalid_values_are_rejected_before_writing() {
    let source = seeded().await;
    let long_title = Movie::new(&"x".repeat(101), "Drama", "", 90, &[]);
    let err = source.insert(&long_title).await.unwrap_err();
    assert!(err.as_validation().is_some());

    let long_tag = Movie::new("Tagged", "Drama", "", 90, &[&"t".repeat(71)]);
    assert!(source.insert(&long_tag).await.unwrap_err().as_validation().is_some());

    let batch = vec![
        Movie::new("Fine", "Drama", "", 90, &[]),
        Movie::new("Fine too", &"g".repeat(101), "", 90, &[]),
    ];
    assert!(source.batch_insert(&batch).await.is_err());
    assert_eq!(source.all_movies().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_basic_conditions() {
    let source = seeded().await;
    let mut untold = Movie::new("Untold", "Drama", "", 80, &[]);
    untold.description = None;
    source.insert(&untold).await.unwrap();

    assert_eq!(
        titles(&source.movies_not_in_genre("Action").await.unwrap()),
        vec!["Amelie", "Heat", "Untold", "Up"]
    );
    assert_eq!(
        titles(&source.movies_with_null_description().await.unwrap()),
        vec!["Untold"]
    );
    assert_eq!(source.movies_with_description().await.unwrap().len(), 5);
    assert_eq!(
        titles(&source.short_movies().await.unwrap()),
        vec!["The Raid", "Untold", "Up"]
    );
    assert_eq!(
        titles(&source.long_movies().await.unwrap()),
        vec!["Amelie", "Heat", "The Dark Knight"]
    );
}

#[tokio::test]
async fn test_logical_and_pattern_conditions() {
    let source = seeded().await;

    assert_eq!(
        titles(&source.short_action_movies().await.unwrap()),
        vec!["The Raid"]
    );
    assert_eq!(
        titles(&source.short_or_action_movies().await.unwrap()),
        vec!["The Dark Knight", "The Raid", "Up"]
    );
    assert_eq!(
        titles(&source.titles_starting_with("The").await.unwrap()),
        vec!["The Dark Knight", "The Raid"]
    );
    assert_eq!(
        titles(&source.titles_not_starting_with("The").await.unwrap()),
        vec!["Amelie", "Heat", "Up"]
    );
    assert_eq!(
        titles(&source.titles_matching("^[AU]").await.unwrap()),
        vec!["Amelie", "Up"]
    );
}

#[tokio::test]
async fn test_range_and_collection_conditions() {
    let source = seeded().await;

    assert_eq!(
        titles(&source.within_duration(100, 125).await.unwrap()),
        vec!["Amelie", "The Raid"]
    );
    assert_eq!(
        titles(&source.within_duration(96, 96).await.unwrap()),
        vec!["Up"]
    );
    assert_eq!(source.by_genres(&["Action", "Crime"]).await.unwrap().len(), 3);
    assert_eq!(
        titles(&source.not_in_genres(&["Action", "Crime"]).await.unwrap()),
        vec!["Amelie", "Up"]
    );
    assert!(source.by_genres(&[]).await.unwrap().is_empty());
    assert_eq!(source.not_in_genres(&[]).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_conditional_filters_are_combined_with_and() {
    let source = seeded().await;

    assert_eq!(
        titles(&source.find_conditionally(Some("Action"), Some(120)).await.unwrap()),
        vec!["The Raid"]
    );
    assert_eq!(
        titles(&source.find_conditionally(None, Some(100)).await.unwrap()),
        vec!["Up"]
    );
    assert_eq!(
        source.find_conditionally(Some("  "), Some(0)).await.unwrap().len(),
        5
    );
    assert_eq!(
        source.find_conditionally(Some("Action"), None).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_top_genres_and_paging() {
    let source = seeded().await;

    assert_eq!(
        source.top_genres().await.unwrap(),
        vec![
            ("Action".to_string(), 2),
            ("Crime".to_string(), 1),
            ("Family".to_string(), 1),
            ("Romance".to_string(), 1),
        ]
    );

    let ids = |movies: Vec<Movie>| movies.into_iter().filter_map(|m| m.id).collect::<Vec<_>>();
    assert_eq!(ids(source.paged(1, Some(2)).await.unwrap()), vec![1, 2]);
    assert_eq!(ids(source.paged(3, Some(2)).await.unwrap()), vec![5]);
    assert_eq!(source.paged(1, None).await.unwrap().len(), 5);
    assert!(matches!(
        source.paged(0, Some(2)).await,
        Err(DataError::Query(QueryError::InvalidPage(0)))
    ));
    assert!(matches!(
        source.paged(-1, None).await,
        Err(DataError::Query(QueryError::InvalidPage(-1)))
    ));
    assert!(matches!(
        source.paged(i64::MAX, Some(25)).await,
        Err(DataError::Query(QueryError::InvalidPage(i64::MAX)))
    ));
}

#[tokio::test]
async fn test_updates() {
    let source = seeded().await;

    let mut heat = source.movie_by_id(4).await.unwrap().unwrap();
    heat.title = "Heat (1995)".to_string();
    heat.tags.push("classic".to_string());
    assert_eq!(source.update_by_id(&heat).await.unwrap(), 1);
    assert_eq!(source.movie_by_id(4).await.unwrap().unwrap(), heat);

    let no_id = Movie::new("Nowhere", "Drama", "", 1, &[]);
    assert_eq!(source.update_by_id(&no_id).await.unwrap(), 0);

    assert_eq!(source.update_duration_by_genre(100, "Action").await.unwrap(), 2);
    assert_eq!(source.update_duration_by_genre(100, "Western").await.unwrap(), 0);
    assert_eq!(
        titles(&source.within_duration(100, 100).await.unwrap()),
        vec!["The Dark Knight", "The Raid"]
    );
}

#[tokio::test]
async fn test_upsert_merges_into_existing_row() {
    let source = seeded().await;

    let incoming = Movie {
        id: Some(1),
        title: "Knight".to_string(),
        genre: "Thriller".to_string(),
        description: Some("New".to_string()),
        duration: 10,
        tags: vec!["replaced".to_string()],
    };
    source.upsert(&incoming).await.unwrap();

    let merged = source.movie_by_id(1).await.unwrap().unwrap();
    assert_eq!(merged.title, "Knight");
    assert_eq!(merged.genre, "Thriller | Action");
    assert_eq!(merged.description.as_deref(), Some("New"));
    assert_eq!(merged.duration, 162);
    assert_eq!(merged.tags, vec!["dc".to_string(), "crime".to_string()]);

    let fresh = Movie::new("Brand New", "Drama", "d", 99, &["n"]).with_id(42);
    source.upsert(&fresh).await.unwrap();
    assert_eq!(source.movie_by_id(42).await.unwrap().unwrap(), fresh);

    source
        .upsert(&Movie::new("Ignored", "Drama", "", 1, &[]))
        .await
        .unwrap();
    assert_eq!(source.all_movies().await.unwrap().len(), 6);
}

#[tokio::test]
async fn test_deletes() {
    let source = seeded().await;

    assert_eq!(source.delete_by_genre("Action").await.unwrap(), 2);
    assert_eq!(source.delete_by_genre("Action").await.unwrap(), 0);
    assert_eq!(source.delete_by_id(4).await.unwrap(), 1);
    assert_eq!(source.delete_by_id(4).await.unwrap(), 0);
    assert_eq!(source.delete_all().await.unwrap(), 2);
    assert!(source.all_movies().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_actors_reference_movies() {
    let source = seeded().await;

    source.add_actor(&Actor::new(2, "Ed Asner")).await.unwrap();
    source.add_actor(&Actor::new(2, "Jordan Nagai")).await.unwrap();
    source.add_actor(&Actor::new(4, "Al Pacino")).await.unwrap();

    let err = source.add_actor(&Actor::new(99, "Nobody")).await.unwrap_err();
    assert!(matches!(
        err,
        DataError::Executor(ExecutorError::Constraint {
            kind: ConstraintKind::ForeignKey,
            ..
        })
    ));

    assert_eq!(source.delete_actors_by_movie(2).await.unwrap(), 2);
    assert_eq!(source.delete_actors_by_movie(2).await.unwrap(), 0);
    assert_eq!(source.actors().list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_merged_values_must_fit_their_columns() {
    let source = source().await;
    let long_genre = Movie::new("Loop", &"G".repeat(60), "", 90, &[]).with_id(1);

    source.upsert(&long_genre).await.unwrap();
    let err = source.upsert(&long_genre).await.unwrap_err();
    assert!(matches!(
        err.as_validation(),
        Some(ValidationError::TooLong { max: 100, .. })
    ));
    let stored = source.movie_by_id(1).await.unwrap().unwrap();
    assert_eq!(stored.genre.len(), 60);
    assert_eq!(stored.duration, 90);
}

#[tokio::test]
async fn test_updated_values_must_fit_their_columns() {
    let source = seeded().await;
    let err = source
        .movies()
        .update_where(
            Condition::eq("genre", "Action"),
            UpdateSet::new().concat("title", "!".repeat(90)),
        )
        .await
        .unwrap_err();
    assert!(err.as_validation().is_some());
    assert_eq!(
        titles(&source.by_genres(&["Action"]).await.unwrap()),
        vec!["The Dark Knight", "The Raid"]
    );
}
