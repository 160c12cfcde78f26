//! Every supported column type through the users table

use chrono::{FixedOffset, TimeZone};
use rowkeeper::datasource::{Role, User, UserDataSource};
use rowkeeper::prelude::*;

async fn source() -> UserDataSource {
    let mut keeper = RowKeeper::in_memory();
    UserDataSource::new(&mut keeper).await.unwrap()
}

fn sample() -> User {
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    User::sample(offset.with_ymd_and_hms(2024, 5, 17, 14, 30, 0).unwrap())
}

#[tokio::test]
async fn test_all_types_round_trip() {
    let source = source().await;
    let user = sample();
    let id = source.insert(&user).await.unwrap();

    let stored = source.user_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.id, Some(id));
    assert_eq!(stored.account_balance, "12345.67");
    assert_eq!(stored.array_3d[1][0], vec!["e".to_string(), "f".to_string()]);
    assert_eq!(stored.profile_img, b"Simple binary data".to_vec());
    assert_eq!(stored.enum_ordinal, Role::User);
    assert_eq!(stored.enum_by_name, Role::Admin);
    assert_eq!(stored.json_array_data[1].int_value, 123);

    // defaults filled by the store
    assert!(stored.date_time.is_some());
    assert!(stored.timestamp.is_some());

    let expected = User {
        id: Some(id),
        date_time: stored.date_time,
        timestamp: stored.timestamp,
        ..user
    };
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn test_seed_writes_sample_user() {
    let source = source().await;
    let first = source.seed().await.unwrap();
    let second = source.seed().await.unwrap();
    assert_eq!(second, first + 1);
    assert_eq!(source.all_users().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_email_is_validated_on_insert() {
    let source = source().await;
    let mut user = sample();
    user.email = "not-an-email".to_string();

    let err = source.insert(&user).await.unwrap_err();
    assert!(err.as_validation().is_some());

    user.email = "jürgen@bücher.de".to_string();
    let err = source.insert(&user).await.unwrap_err();
    assert!(err.as_validation().is_some());
    assert!(source.all_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_email_is_validated_on_lookup_and_update() {
    let source = source().await;
    let id = source.insert(&sample()).await.unwrap();

    let err = source.user_by_email("not-an-email").await.unwrap_err();
    assert!(err.as_validation().is_some());
    let err = source.update_email(id, "not-an-email").await.unwrap_err();
    assert!(err.as_validation().is_some());

    assert!(source.user_by_email("user@example.com").await.unwrap().is_none());
    assert_eq!(source.update_email(id, "user@example.com").await.unwrap(), 1);
    let found = source.user_by_email("user@example.com").await.unwrap().unwrap();
    assert_eq!(found.id, Some(id));
}

#[tokio::test]
async fn test_value_limits_are_enforced() {
    let source = source().await;

    let mut user = sample();
    user.gender = "MF".to_string();
    assert!(source.insert(&user).await.unwrap_err().as_validation().is_some());

    let mut user = sample();
    user.binary_with_size = vec![0u8; 1025];
    assert!(source.insert(&user).await.unwrap_err().as_validation().is_some());

    let mut user = sample();
    user.array_2d = vec![vec![1, 2], vec![3]];
    assert!(source.insert(&user).await.unwrap_err().as_validation().is_some());

    let mut user = sample();
    user.account_balance = "1234567890123.5".to_string();
    assert!(source.insert(&user).await.unwrap_err().as_validation().is_some());

    assert!(source.all_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_nullable_columns_accept_missing_values() {
    let source = source().await;
    let mut user = sample();
    user.bio = None;
    user.doubles = None;
    let id = source.insert(&user).await.unwrap();

    let stored = source.user_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.bio, None);
    assert_eq!(stored.doubles, None);
}
