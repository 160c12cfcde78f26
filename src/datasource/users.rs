//! The all-types `users` table
//!
//! One column per supported domain: integers of every width, real and
//! decimal numbers, fixed and bounded strings, one to three dimensional
//! arrays, binary blobs, enums stored by ordinal and by name, date/time
//! values with store-side defaults, JSON documents and a validated email.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use store_object::prelude::*;
use type_mapping::{bytes_from_store_value, from_json_value, to_json_value, PatternValidator};

use crate::core::RowKeeper;
use crate::errors::RowKeeperError;

pub const USERS_TABLE: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub const VARIANTS: [&'static str; 2] = ["USER", "ADMIN"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    fn from_value(value: &StoreValue) -> Result<Self, DecodeError> {
        match value.as_str() {
            Some("USER") => Ok(Role::User),
            Some("ADMIN") => Ok(Role::Admin),
            _ => Err(DecodeError::TypeMismatch {
                domain: "role".to_string(),
                found: format!("{:?}", value),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleData {
    pub string_value: String,
    pub int_value: i32,
    pub array_value: Vec<String>,
}

impl SimpleData {
    pub fn new(string_value: &str, int_value: i32, array_value: &[&str]) -> Self {
        Self {
            string_value: string_value.to_string(),
            int_value,
            array_value: array_value.iter().map(|v| v.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Option<i32>,
    pub age: i32,
    pub height_in_cm: i16,
    pub follower_count: i64,
    pub rating: f32,
    /// Exact decimal text with two fractional digits
    pub account_balance: String,
    pub is_active: bool,
    pub gender: String,
    pub name: String,
    pub bio: Option<String>,
    pub tags: Vec<String>,
    pub skills: Vec<String>,
    pub doubles: Option<Vec<f64>>,
    pub array_2d: Vec<Vec<i32>>,
    pub array_3d: Vec<Vec<Vec<String>>>,
    pub profile_img: Vec<u8>,
    pub binary: Vec<u8>,
    pub binary_with_size: Vec<u8>,
    pub large_obj: Vec<u8>,
    pub enum_ordinal: Role,
    pub enum_by_name: Role,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Set by the store when absent
    pub date_time: Option<NaiveDateTime>,
    /// Set by the store when absent
    pub timestamp: Option<DateTime<Utc>>,
    pub timestamp_with_time_zone: DateTime<FixedOffset>,
    pub json_data: SimpleData,
    pub json_array_data: Vec<SimpleData>,
    pub email: String,
}

impl User {
    /// The sample user written by `UserDataSource::seed`
    pub fn sample(timestamp_with_time_zone: DateTime<FixedOffset>) -> Self {
        let bytes = b"Simple binary data".to_vec();
        let grid = |rows: &[&[&str]]| -> Vec<Vec<String>> {
            rows.iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect()
        };
        Self {
            id: None,
            age: 25,
            height_in_cm: 175,
            follower_count: 100_000,
            rating: 4.77,
            account_balance: "12345.67".to_string(),
            is_active: true,
            gender: "M".to_string(),
            name: "Test".to_string(),
            bio: Some("This is some random text".to_string()),
            tags: vec!["tag1".into(), "tag2".into(), "tag3".into()],
            skills: vec!["Rust".into(), "sqlx".into(), "Postgres".into()],
            doubles: Some(vec![3.5, 2.5, 1.8]),
            array_2d: vec![vec![1, 2], vec![3, 4]],
            array_3d: vec![grid(&[&["a", "b"], &["c", "d"]]), grid(&[&["e", "f"], &["g", "h"]])],
            profile_img: bytes.clone(),
            binary: bytes.clone(),
            binary_with_size: bytes.clone(),
            large_obj: bytes,
            enum_ordinal: Role::User,
            enum_by_name: Role::Admin,
            date: NaiveDate::from_ymd_opt(1999, 10, 26).unwrap_or_default(),
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            date_time: None,
            timestamp: None,
            timestamp_with_time_zone,
            json_data: SimpleData::new("test", 12, &["val1", "val2"]),
            json_array_data: vec![
                SimpleData::new("test1", 12, &["val1", "val2"]),
                SimpleData::new("test2", 123, &["val11", "val22"]),
            ],
            email: "test@example.com".to_string(),
        }
    }
}

fn required<'r>(record: &'r Record, column: &str) -> Result<&'r StoreValue, DecodeError> {
    record
        .get(column)
        .ok_or_else(|| DecodeError::MissingColumn(column.to_string()))
}

fn json_or_null<T: Serialize>(data: &T) -> StoreValue {
    // a null is rejected by the non-null json columns on encode
    to_json_value(data).unwrap_or(StoreValue::Null)
}

impl Entity for User {
    type Key = i32;

    fn key(&self) -> Option<i32> {
        self.id
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("age", self.age)
            .with("height_in_cm", self.height_in_cm)
            .with("follower_count", self.follower_count)
            .with("rating", self.rating)
            .with("account_balance", StoreValue::decimal(self.account_balance.as_str()))
            .with("is_active", self.is_active)
            .with("gender", self.gender.as_str())
            .with("name", self.name.as_str())
            .with("bio", self.bio.clone())
            .with("tags", self.tags.clone())
            .with("skills", self.skills.clone())
            .with("doubles_column", self.doubles.clone())
            .with("array_2d", self.array_2d.clone())
            .with("array_3d", self.array_3d.clone())
            .with("profile_img", StoreValue::bytes(self.profile_img.clone()))
            .with("binary", StoreValue::bytes(self.binary.clone()))
            .with("binary_with_size", StoreValue::bytes(self.binary_with_size.clone()))
            .with("large_obj", StoreValue::bytes(self.large_obj.clone()))
            .with("enum_ordinal", self.enum_ordinal.as_str())
            .with("enum_by_name", self.enum_by_name.as_str())
            .with("date", self.date)
            .with("time", self.time)
            .with("date_time", self.date_time)
            .with("timestamp", self.timestamp)
            .with("timestamp_with_time_zone", self.timestamp_with_time_zone)
            .with("json_data", json_or_null(&self.json_data))
            .with("json_array_data", json_or_null(&self.json_array_data))
            .with("email", self.email.as_str())
    }

    fn from_record(record: &Record) -> Result<Self, DecodeError> {
        Ok(Self {
            id: record.get_as("id")?,
            age: record.get_as("age")?,
            height_in_cm: record.get_as("height_in_cm")?,
            follower_count: record.get_as("follower_count")?,
            rating: record.get_as("rating")?,
            account_balance: record.get_as("account_balance")?,
            is_active: record.get_as("is_active")?,
            gender: record.get_as("gender")?,
            name: record.get_as("name")?,
            bio: record.get_as("bio")?,
            tags: record.get_as("tags")?,
            skills: record.get_as("skills")?,
            doubles: record.get_as("doubles_column")?,
            array_2d: record.get_as("array_2d")?,
            array_3d: record.get_as("array_3d")?,
            profile_img: bytes_from_store_value(required(record, "profile_img")?)?,
            binary: bytes_from_store_value(required(record, "binary")?)?,
            binary_with_size: bytes_from_store_value(required(record, "binary_with_size")?)?,
            large_obj: bytes_from_store_value(required(record, "large_obj")?)?,
            enum_ordinal: Role::from_value(required(record, "enum_ordinal")?)?,
            enum_by_name: Role::from_value(required(record, "enum_by_name")?)?,
            date: record.get_as("date")?,
            time: record.get_as("time")?,
            date_time: record.get_as("date_time")?,
            timestamp: record.get_as("timestamp")?,
            timestamp_with_time_zone: record.get_as("timestamp_with_time_zone")?,
            json_data: from_json_value(required(record, "json_data")?)?,
            json_array_data: from_json_value(required(record, "json_array_data")?)?,
            email: record.get_as("email")?,
        })
    }
}

pub fn users_schema() -> Result<Schema, SchemaError> {
    let email = Domain::custom(
        "email",
        Domain::Varchar(100),
        Arc::new(PatternValidator::email()),
    );
    Schema::define(
        USERS_TABLE,
        vec![
            Column::new("id", Domain::Integer).auto_increment(),
            // numbers
            Column::new("age", Domain::Integer),
            Column::new("height_in_cm", Domain::SmallInt),
            Column::new("follower_count", Domain::BigInt),
            Column::new("rating", Domain::Real),
            Column::new("account_balance", Domain::decimal(12, 2)),
            Column::new("is_active", Domain::Boolean).default_value(false),
            // strings
            Column::new("gender", Domain::Char(1)),
            Column::new("name", Domain::Varchar(50)),
            Column::new("bio", Domain::Text).nullable(),
            // arrays
            Column::new("tags", Domain::array(Domain::Text)).default_value(Vec::<String>::new()),
            Column::new("skills", Domain::array(Domain::Varchar(50))),
            Column::new("doubles_column", Domain::array(Domain::Double)).nullable(),
            Column::new("array_2d", Domain::array_with_dimensions(Domain::Integer, 2)),
            Column::new("array_3d", Domain::array_with_dimensions(Domain::Text, 3)),
            // binary
            Column::new("profile_img", Domain::LargeBinary),
            Column::new("binary", Domain::Binary(None)),
            Column::new("binary_with_size", Domain::Binary(Some(1024))),
            Column::new("large_obj", Domain::LargeBinary),
            // enums
            Column::new("enum_ordinal", Domain::enum_by_ordinal(&Role::VARIANTS)),
            Column::new("enum_by_name", Domain::enum_by_name(10, &Role::VARIANTS)),
            // date and time
            Column::new("date", Domain::Date),
            Column::new("time", Domain::Time),
            Column::new("date_time", Domain::DateTime)
                .default_expression(DefaultExpression::CurrentDateTime),
            Column::new("timestamp", Domain::Timestamp)
                .default_expression(DefaultExpression::CurrentTimestamp),
            Column::new("timestamp_with_time_zone", Domain::TimestampTz),
            // json
            Column::new("json_data", Domain::Json),
            Column::new("json_array_data", Domain::Json),
            Column::new("email", email),
        ],
        "id",
    )
}

#[derive(Debug, Clone)]
pub struct UserDataSource {
    users: GenericStore<User>,
}

impl UserDataSource {
    pub async fn new(keeper: &mut RowKeeper) -> Result<Self, RowKeeperError> {
        keeper.register_schema(users_schema()?)?;
        let users: GenericStore<User> = keeper.store(USERS_TABLE)?;
        users.ensure_exists().await?;
        Ok(Self { users })
    }

    pub fn users(&self) -> &GenericStore<User> {
        &self.users
    }

    /// Write the sample user and return its id
    pub async fn seed(&self) -> Result<i32, DataError> {
        self.insert(&User::sample(Utc::now().fixed_offset())).await
    }

    pub async fn insert(&self, user: &User) -> Result<i32, DataError> {
        self.users.insert_returning_key(user).await
    }

    pub async fn user_by_id(&self, id: i32) -> Result<Option<User>, DataError> {
        self.users.fetch_by_id(&id).await
    }

    pub async fn all_users(&self) -> Result<Vec<User>, DataError> {
        self.users.list_all().await
    }

    /// The email is validated before the lookup runs
    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>, DataError> {
        self.users
            .fetch_one(QueryBuilder::new().filter(Condition::eq("email", email)))
            .await
    }

    pub async fn update_email(&self, id: i32, email: &str) -> Result<u64, DataError> {
        self.users
            .update_where(Condition::eq("id", id), UpdateSet::new().set("email", email))
            .await
    }
}
