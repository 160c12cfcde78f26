//! Traits for database operations
//!
//! `Entity` maps application types to records and `StoreObject` is the
//! interface every store implements.

pub mod core;
pub mod entity;

pub use self::core::StoreObject;
pub use entity::{Entity, PrimaryKey};
