//! Logical column domains
//!
//! A domain is the value type of a column as the application sees it. The
//! storage encoding and validation rule of a column are derived from its
//! domain by the registry and never change afterwards.

use crate::validate::ValueValidator;
use std::fmt;
use std::sync::Arc;

/// How an enumeration is persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumRepr {
    /// Zero-based position of the variant, stored as an integer
    Ordinal,
    /// Variant name, stored as a bounded string
    Name { max_length: u32 },
}

/// A domain whose values pass an application-supplied validator on top of
/// the validation of their base domain
#[derive(Debug, Clone)]
pub struct CustomDomain {
    pub name: String,
    pub base: Box<Domain>,
    pub validator: Arc<dyn ValueValidator>,
}

impl PartialEq for CustomDomain {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.base == other.base
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal { precision: u8, scale: u8 },
    Boolean,
    Char(u32),
    Varchar(u32),
    Text,
    Array { element: Box<Domain>, dimensions: u8 },
    Binary(Option<u32>),
    LargeBinary,
    Enum { variants: Vec<String>, repr: EnumRepr },
    Date,
    Time,
    DateTime,
    Timestamp,
    TimestampTz,
    Json,
    Custom(CustomDomain),
}

impl Domain {
    pub fn decimal(precision: u8, scale: u8) -> Self {
        Domain::Decimal { precision, scale }
    }

    /// One-dimensional array of `element`
    pub fn array(element: Domain) -> Self {
        Self::array_with_dimensions(element, 1)
    }

    pub fn array_with_dimensions(element: Domain, dimensions: u8) -> Self {
        Domain::Array {
            element: Box::new(element),
            dimensions,
        }
    }

    pub fn enum_by_ordinal<S: AsRef<str>>(variants: &[S]) -> Self {
        Domain::Enum {
            variants: variants.iter().map(|v| v.as_ref().to_string()).collect(),
            repr: EnumRepr::Ordinal,
        }
    }

    pub fn enum_by_name<S: AsRef<str>>(max_length: u32, variants: &[S]) -> Self {
        Domain::Enum {
            variants: variants.iter().map(|v| v.as_ref().to_string()).collect(),
            repr: EnumRepr::Name { max_length },
        }
    }

    pub fn custom(name: impl Into<String>, base: Domain, validator: Arc<dyn ValueValidator>) -> Self {
        Domain::Custom(CustomDomain {
            name: name.into(),
            base: Box::new(base),
            validator,
        })
    }

    /// Integer domains, the only ones that may auto-increment
    pub fn is_integer(&self) -> bool {
        match self {
            Domain::SmallInt | Domain::Integer | Domain::BigInt => true,
            Domain::Custom(custom) => custom.base.is_integer(),
            _ => false,
        }
    }

    /// Whether values of this domain can be written inside an array literal
    pub fn supports_array_element(&self) -> bool {
        match self {
            Domain::SmallInt
            | Domain::Integer
            | Domain::BigInt
            | Domain::Real
            | Domain::Double
            | Domain::Decimal { .. }
            | Domain::Boolean
            | Domain::Char(_)
            | Domain::Varchar(_)
            | Domain::Text
            | Domain::Date
            | Domain::Time
            | Domain::DateTime => true,
            Domain::Enum { repr, .. } => matches!(repr, EnumRepr::Name { .. }),
            Domain::Custom(custom) => custom.base.supports_array_element(),
            _ => false,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::SmallInt => write!(f, "int16"),
            Domain::Integer => write!(f, "int32"),
            Domain::BigInt => write!(f, "int64"),
            Domain::Real => write!(f, "float32"),
            Domain::Double => write!(f, "float64"),
            Domain::Decimal { precision, scale } => write!(f, "decimal({}, {})", precision, scale),
            Domain::Boolean => write!(f, "boolean"),
            Domain::Char(n) => write!(f, "char({})", n),
            Domain::Varchar(n) => write!(f, "varchar({})", n),
            Domain::Text => write!(f, "text"),
            Domain::Array {
                element,
                dimensions,
            } => write!(f, "array<{}>[{}]", element, dimensions),
            Domain::Binary(Some(n)) => write!(f, "binary({})", n),
            Domain::Binary(None) => write!(f, "binary"),
            Domain::LargeBinary => write!(f, "large-binary"),
            Domain::Enum { repr, .. } => match repr {
                EnumRepr::Ordinal => write!(f, "enum(ordinal)"),
                EnumRepr::Name { .. } => write!(f, "enum(name)"),
            },
            Domain::Date => write!(f, "date"),
            Domain::Time => write!(f, "time"),
            Domain::DateTime => write!(f, "datetime"),
            Domain::Timestamp => write!(f, "timestamp"),
            Domain::TimestampTz => write!(f, "timestamp+tz"),
            Domain::Json => write!(f, "json"),
            Domain::Custom(custom) => write!(f, "{}", custom.name),
        }
    }
}
