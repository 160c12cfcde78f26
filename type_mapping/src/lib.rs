//! Value and column-type mapping for the rowkeeper ecosystem
//!
//! Domains describe what an application stores, the registry derives how it
//! is stored and validated, and the array module implements the literal
//! encoding used for array columns.

pub mod array;
pub mod convert;
pub mod domain;
pub mod errors;
pub mod registry;
pub mod serialize;
pub mod sql;
pub mod types;
pub mod validate;

pub use array::{decode_array, encode_array};
pub use convert::{bytes_from_store_value, FromStoreValue};
pub use domain::{CustomDomain, Domain, EnumRepr};
pub use errors::{DecodeError, ValidationError};
pub use registry::{normalize_decimal, resolve, ColumnTypeRegistry, ResolvedType};
pub use serialize::{from_json_value, to_json_value};
pub use sql::{sql_literal, StorageType};
pub use types::StoreValue;
pub use validate::{PatternValidator, TemporalKind, Validator, ValueValidator};
