//! Joins between authors and books

use rowkeeper::datasource::{AuthorBook, BookDataSource};
use rowkeeper::prelude::*;

async fn seeded() -> BookDataSource {
    let mut keeper = RowKeeper::in_memory();
    let source = BookDataSource::new(&mut keeper).await.unwrap();
    source.seed().await.unwrap();
    source
}

fn pair(author: Option<&str>, title: Option<&str>) -> AuthorBook {
    (author.map(str::to_string), title.map(str::to_string))
}

fn matched() -> Vec<AuthorBook> {
    vec![
        pair(Some("Author1"), Some("Book1")),
        pair(Some("Author1"), Some("Book2")),
        pair(Some("Author2"), Some("Book3")),
    ]
}

#[tokio::test]
async fn test_inner_join_keeps_matched_pairs() {
    let source = seeded().await;
    assert_eq!(source.inner_join().await.unwrap(), matched());
}

#[tokio::test]
async fn test_left_join_keeps_authors_without_books() {
    let source = seeded().await;
    let mut expected = matched();
    expected.push(pair(Some("Author3"), None));
    assert_eq!(source.left_join().await.unwrap(), expected);
}

#[tokio::test]
async fn test_right_join_keeps_books_without_author() {
    let source = seeded().await;
    let mut expected = matched();
    expected.push(pair(None, Some("Book4")));
    assert_eq!(source.right_join().await.unwrap(), expected);
}

#[tokio::test]
async fn test_full_join_keeps_both_sides() {
    let source = seeded().await;
    let rows = source.full_join().await.unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows.contains(&pair(Some("Author3"), None)));
    assert!(rows.contains(&pair(None, Some("Book4"))));
    for row in matched() {
        assert!(rows.contains(&row));
    }
}

#[tokio::test]
async fn test_cross_join_pairs_everything() {
    let source = seeded().await;
    let rows = source.cross_join().await.unwrap();
    assert_eq!(rows.len(), 12);
    assert!(rows.iter().all(|(a, b)| a.is_some() && b.is_some()));
    assert_eq!(rows[0], pair(Some("Author1"), Some("Book1")));
    assert_eq!(rows[11], pair(Some("Author3"), Some("Book4")));
}

#[tokio::test]
async fn test_books_require_known_author() {
    let source = seeded().await;
    let orphan = rowkeeper::datasource::Book {
        id: None,
        title: "Book5".to_string(),
        author_id: Some(99),
    };
    assert!(source.books().insert(&orphan).await.is_err());
    assert_eq!(source.books().list_all().await.unwrap().len(), 4);
}
