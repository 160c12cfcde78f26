//! Identifier validation
//!
//! Table and column names are interpolated into SQL, so they are checked once
//! when a schema is defined and always written double-quoted afterwards.

use std::fmt;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum IdentifierError {
    /// Name contains invalid characters (only alphanumeric and underscore allowed)
    InvalidCharacters(String),
    /// Name is too long (PostgreSQL limit is 63 characters)
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },
    Empty,
    /// Name starts with invalid character (must start with letter or underscore)
    InvalidStartCharacter(String),
    /// Name is a reserved SQL keyword
    ReservedKeyword(String),
}

impl fmt::Display for IdentifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierError::InvalidCharacters(name) => {
                write!(f, "Invalid characters in name '{}': only alphanumeric characters and underscores are allowed", name)
            }
            IdentifierError::TooLong {
                name,
                length,
                max_length,
            } => {
                write!(
                    f,
                    "Name '{}' is too long: {} characters (max {})",
                    name, length, max_length
                )
            }
            IdentifierError::Empty => {
                write!(f, "Name cannot be empty")
            }
            IdentifierError::InvalidStartCharacter(name) => {
                write!(f, "Name '{}' must start with a letter or underscore", name)
            }
            IdentifierError::ReservedKeyword(name) => {
                write!(f, "Name '{}' is a reserved SQL keyword", name)
            }
        }
    }
}

impl std::error::Error for IdentifierError {}

/// PostgreSQL identifier length limit
const MAX_LENGTH: usize = 63;

/// Keywords that shape a statement. Type names such as `date` or `time` are
/// allowed since every identifier is quoted.
const RESERVED_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "JOIN", "INNER", "LEFT", "RIGHT",
    "FULL", "OUTER", "CROSS", "ON", "AS", "AND", "OR", "NOT", "NULL", "TRUE", "FALSE", "CASE",
    "WHEN", "THEN", "ELSE", "END", "IN", "LIKE", "BETWEEN", "ORDER", "BY", "GROUP", "HAVING",
    "LIMIT", "OFFSET", "UNION", "ALL", "DISTINCT", "CREATE", "DROP", "ALTER", "TABLE",
    "PRIMARY", "FOREIGN", "REFERENCES", "UNIQUE", "CHECK", "DEFAULT", "CONSTRAINT", "RETURNING",
    "CONFLICT", "EXCLUDED", "DO", "NOTHING", "SET", "VALUES", "INTO",
];

/// Check a table or column name
pub fn validate_identifier(name: &str) -> Result<(), IdentifierError> {
    if name.is_empty() {
        return Err(IdentifierError::Empty);
    }

    if name.len() > MAX_LENGTH {
        return Err(IdentifierError::TooLong {
            name: name.to_string(),
            length: name.len(),
            max_length: MAX_LENGTH,
        });
    }

    let first_char = name.chars().next().ok_or(IdentifierError::Empty)?;
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(IdentifierError::InvalidStartCharacter(name.to_string()));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(IdentifierError::InvalidCharacters(name.to_string()));
    }

    if RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str()) {
        return Err(IdentifierError::ReservedKeyword(name.to_string()));
    }

    Ok(())
}

/// Double-quote an identifier. A qualified `table.column` reference is
/// quoted part by part.
pub fn quote_identifier(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        let long_name = "a".repeat(63);
        let valid_names = [
            "users",
            "user_profiles",
            "array2D",
            "_private_table",
            "date",
            "timestamp",
            long_name.as_str(),
        ];

        for name in valid_names {
            assert!(
                validate_identifier(name).is_ok(),
                "Should accept valid name: {}",
                name
            );
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        let test_cases = [
            ("", IdentifierError::Empty),
            (
                "123table",
                IdentifierError::InvalidStartCharacter("123table".to_string()),
            ),
            (
                "user-name",
                IdentifierError::InvalidCharacters("user-name".to_string()),
            ),
            (
                "movies; DROP TABLE movies",
                IdentifierError::InvalidCharacters("movies; DROP TABLE movies".to_string()),
            ),
            (
                "select",
                IdentifierError::ReservedKeyword("select".to_string()),
            ),
        ];

        for (name, expected) in test_cases {
            assert_eq!(validate_identifier(name), Err(expected));
        }

        assert!(matches!(
            validate_identifier(&"a".repeat(64)),
            Err(IdentifierError::TooLong { length: 64, .. })
        ));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("title"), "\"title\"");
        assert_eq!(quote_identifier("books.author_id"), "\"books\".\"author_id\"");
    }
}
