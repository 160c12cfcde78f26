//! Table schemas

use super::column::{Column, ColumnDefault, ForeignKey};
use crate::errors::SchemaError;
use crate::validation::{quote_identifier, validate_identifier};
use std::collections::HashMap;
use type_mapping::{sql_literal, Domain};

/// An ordered set of columns plus exactly one primary key column.
/// Immutable once defined; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Schema {
    table: String,
    columns: Vec<Column>,
    primary_key: usize,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn define(
        table: impl Into<String>,
        columns: Vec<Column>,
        primary_key: &str,
    ) -> Result<Self, SchemaError> {
        let table = table.into();
        validate_identifier(&table)?;

        let mut index = HashMap::with_capacity(columns.len());
        let mut columns = columns;
        for (position, column) in columns.iter_mut().enumerate() {
            validate_identifier(&column.name)?;
            if index.insert(column.name.clone(), position).is_some() {
                return Err(SchemaError::DuplicateColumnName {
                    table: table.clone(),
                    column: column.name.clone(),
                });
            }
            check_array_domain(&column.name, column.domain())?;
            normalize_default(column)?;
        }

        let primary_key = *index
            .get(primary_key)
            .ok_or_else(|| SchemaError::MissingPrimaryKey {
                table: table.clone(),
                column: primary_key.to_string(),
            })?;
        columns[primary_key].nullable = false;

        for (position, column) in columns.iter().enumerate() {
            if !column.auto_increment {
                continue;
            }
            if position != primary_key {
                return Err(SchemaError::InvalidAutoIncrement {
                    column: column.name.clone(),
                    reason: "only the primary key can auto-increment".to_string(),
                });
            }
            if !column.domain().is_integer() {
                return Err(SchemaError::InvalidAutoIncrement {
                    column: column.name.clone(),
                    reason: format!("{} is not an integer domain", column.domain()),
                });
            }
        }

        for fk in columns.iter().filter_map(|c| c.references.as_ref()) {
            validate_identifier(&fk.table)?;
            validate_identifier(&fk.column)?;
        }

        Ok(Self {
            table,
            columns,
            primary_key,
            index,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn primary_key(&self) -> &Column {
        &self.columns[self.primary_key]
    }

    pub fn primary_key_name(&self) -> &str {
        &self.columns[self.primary_key].name
    }

    /// Columns that reference other tables
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&Column, &ForeignKey)> {
        self.columns
            .iter()
            .filter_map(|c| c.references.as_ref().map(|fk| (c, fk)))
    }

    /// Names of the tables this one references, itself excluded
    pub fn dependencies(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self
            .foreign_keys()
            .map(|(_, fk)| fk.table.as_str())
            .filter(|t| *t != self.table)
            .collect();
        tables.sort_unstable();
        tables.dedup();
        tables
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this schema
    pub fn create_table_sql(&self) -> String {
        let definitions: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(position, column)| self.column_definition(column, position == self.primary_key))
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&self.table),
            definitions.join(", ")
        )
    }

    fn column_definition(&self, column: &Column, is_primary_key: bool) -> String {
        let serial = if column.auto_increment {
            column.storage().serial_sql()
        } else {
            None
        };
        let mut definition = format!(
            "{} {}",
            quote_identifier(&column.name),
            serial.map(str::to_string).unwrap_or_else(|| column.storage().to_sql())
        );

        if is_primary_key {
            definition.push_str(" PRIMARY KEY");
        } else if !column.nullable {
            definition.push_str(" NOT NULL");
        }

        match &column.default {
            Some(ColumnDefault::Value(value)) => {
                definition.push_str(" DEFAULT ");
                definition.push_str(&sql_literal(value));
            }
            Some(ColumnDefault::Expression(expression)) => {
                definition.push_str(" DEFAULT ");
                definition.push_str(expression.to_sql(column.storage()));
            }
            None => {}
        }

        if let Some(fk) = &column.references {
            definition.push_str(&format!(
                " REFERENCES {} ({})",
                quote_identifier(&fk.table),
                quote_identifier(&fk.column)
            ));
        }

        definition
    }
}

fn check_array_domain(column: &str, domain: &Domain) -> Result<(), SchemaError> {
    match domain {
        Domain::Array { element, dimensions } => {
            if *dimensions == 0 || !element.supports_array_element() {
                return Err(SchemaError::UnsupportedArrayElement {
                    column: column.to_string(),
                    domain: domain.to_string(),
                });
            }
            Ok(())
        }
        Domain::Custom(custom) => check_array_domain(column, &custom.base),
        _ => Ok(()),
    }
}

/// Validate a literal default and keep it in storage form
fn normalize_default(column: &mut Column) -> Result<(), SchemaError> {
    if let Some(ColumnDefault::Value(value)) = &column.default {
        let stored = column
            .resolved
            .encode(&column.name, value)
            .map_err(|source| SchemaError::InvalidDefault {
                column: column.name.clone(),
                source,
            })?;
        column.default = Some(ColumnDefault::Value(stored));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DefaultExpression;
    use type_mapping::StoreValue;

    fn movies() -> Schema {
        Schema::define(
            "movies",
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
        .unwrap()
    }

    #[test]
    fn test_define_preserves_column_order() {
        let schema = movies();
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(
            names,
            vec!["id", "title", "genre", "description", "duration_in_minutes", "tags"]
        );
        assert_eq!(schema.primary_key_name(), "id");
        assert!(schema.column("genre").is_some());
        assert!(schema.column("rating").is_none());
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Schema::define(
            "movies",
            vec![
                Column::new("id", Domain::Integer),
                Column::new("title", Domain::Text),
                Column::new("title", Domain::Varchar(10)),
            ],
            "id",
        );
        assert_eq!(
            result.unwrap_err(),
            SchemaError::DuplicateColumnName {
                table: "movies".to_string(),
                column: "title".to_string()
            }
        );
    }

    #[test]
    fn test_missing_primary_key_rejected() {
        let result = Schema::define("movies", vec![Column::new("title", Domain::Text)], "id");
        assert!(matches!(result, Err(SchemaError::MissingPrimaryKey { .. })));
    }

    #[test]
    fn test_invalid_identifiers_rejected() {
        let result = Schema::define("bad-table", vec![Column::new("id", Domain::Integer)], "id");
        assert!(matches!(result, Err(SchemaError::InvalidIdentifier(_))));
        let result = Schema::define("movies", vec![Column::new("select", Domain::Integer)], "select");
        assert!(matches!(result, Err(SchemaError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_auto_increment_requires_integer_key() {
        let result = Schema::define(
            "codes",
            vec![Column::new("code", Domain::Text).auto_increment()],
            "code",
        );
        assert!(matches!(result, Err(SchemaError::InvalidAutoIncrement { .. })));
    }

    #[test]
    fn test_unsupported_array_element_rejected() {
        let result = Schema::define(
            "blobs",
            vec![
                Column::new("id", Domain::Integer),
                Column::new("parts", Domain::array(Domain::Json)),
            ],
            "id",
        );
        assert!(matches!(result, Err(SchemaError::UnsupportedArrayElement { .. })));
    }

    #[test]
    fn test_invalid_default_rejected() {
        let result = Schema::define(
            "users",
            vec![
                Column::new("id", Domain::Integer),
                Column::new("gender", Domain::Char(1)).default_value("MF"),
            ],
            "id",
        );
        assert!(matches!(result, Err(SchemaError::InvalidDefault { .. })));
    }

    #[test]
    fn test_create_table_sql() {
        assert_eq!(
            movies().create_table_sql(),
            "CREATE TABLE IF NOT EXISTS \"movies\" (\"id\" SERIAL PRIMARY KEY, \
             \"title\" VARCHAR(100) NOT NULL, \"genre\" VARCHAR(100) NOT NULL, \
             \"description\" TEXT, \"duration_in_minutes\" INTEGER NOT NULL, \
             \"tags\" VARCHAR(70)[] NOT NULL)"
        );
    }

    #[test]
    fn test_create_table_sql_defaults_and_references() {
        let schema = Schema::define(
            "books",
            vec![
                Column::new("id", Domain::Integer).auto_increment(),
                Column::new("author_id", Domain::Integer)
                    .nullable()
                    .references("authors", "id"),
                Column::new("is_active", Domain::Boolean).default_value(false),
                Column::new("created", Domain::DateTime)
                    .default_expression(DefaultExpression::CurrentDateTime),
            ],
            "id",
        )
        .unwrap();
        let sql = schema.create_table_sql();
        assert!(sql.contains("\"author_id\" INTEGER REFERENCES \"authors\" (\"id\")"));
        assert!(sql.contains("\"is_active\" BOOLEAN NOT NULL DEFAULT FALSE"));
        assert!(sql.contains("\"created\" TIMESTAMP NOT NULL DEFAULT LOCALTIMESTAMP"));
        assert_eq!(schema.dependencies(), vec!["authors"]);
        assert_eq!(
            schema.column("is_active").and_then(|c| c.column_default()),
            Some(&ColumnDefault::Value(StoreValue::Boolean(false)))
        );
    }
}
