//! Query conditions
//!
//! A `Condition` is an immutable predicate tree. Leaves compare one column
//! against literal operands; internal nodes combine two conditions with AND
//! or OR. `Condition::All` matches every row.

use type_mapping::StoreValue;

/// Predicate operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,        // =
    Neq,       // <>
    Less,      // <
    LessEq,    // <=
    Greater,   // >
    GreaterEq, // >=
    Between,   // BETWEEN
    Like,      // LIKE
    NotLike,   // NOT LIKE
    RegexMatch, // ~
    InList,    // IN
    NotInList, // NOT IN
    IsNull,    // IS NULL
    IsNotNull, // IS NOT NULL
}

impl Operator {
    /// SQL comparison operator for the binary comparisons
    pub fn comparison_sql(&self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some("="),
            Operator::Neq => Some("<>"),
            Operator::Less => Some("<"),
            Operator::LessEq => Some("<="),
            Operator::Greater => Some(">"),
            Operator::GreaterEq => Some(">="),
            _ => None,
        }
    }
}

/// Right-hand side of a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Value(StoreValue),
    Range(StoreValue, StoreValue),
    List(Vec<StoreValue>),
    /// LIKE or regex pattern; never passed through column validation
    Pattern(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    All,
    Predicate {
        column: String,
        operator: Operator,
        operand: Operand,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    fn predicate(column: &str, operator: Operator, operand: Operand) -> Self {
        Condition::Predicate {
            column: column.to_string(),
            operator,
            operand,
        }
    }

    /// Match every row
    pub fn all() -> Self {
        Condition::All
    }

    pub fn eq(column: &str, value: impl Into<StoreValue>) -> Self {
        Self::predicate(column, Operator::Eq, Operand::Value(value.into()))
    }

    pub fn neq(column: &str, value: impl Into<StoreValue>) -> Self {
        Self::predicate(column, Operator::Neq, Operand::Value(value.into()))
    }

    pub fn less(column: &str, value: impl Into<StoreValue>) -> Self {
        Self::predicate(column, Operator::Less, Operand::Value(value.into()))
    }

    pub fn less_eq(column: &str, value: impl Into<StoreValue>) -> Self {
        Self::predicate(column, Operator::LessEq, Operand::Value(value.into()))
    }

    pub fn greater(column: &str, value: impl Into<StoreValue>) -> Self {
        Self::predicate(column, Operator::Greater, Operand::Value(value.into()))
    }

    pub fn greater_eq(column: &str, value: impl Into<StoreValue>) -> Self {
        Self::predicate(column, Operator::GreaterEq, Operand::Value(value.into()))
    }

    /// Inclusive range
    pub fn between(column: &str, low: impl Into<StoreValue>, high: impl Into<StoreValue>) -> Self {
        Self::predicate(
            column,
            Operator::Between,
            Operand::Range(low.into(), high.into()),
        )
    }

    /// `%` matches any run of characters, `_` exactly one
    pub fn like(column: &str, pattern: &str) -> Self {
        Self::predicate(column, Operator::Like, Operand::Pattern(pattern.to_string()))
    }

    pub fn not_like(column: &str, pattern: &str) -> Self {
        Self::predicate(column, Operator::NotLike, Operand::Pattern(pattern.to_string()))
    }

    /// POSIX regular expression match
    pub fn regex_match(column: &str, pattern: &str) -> Self {
        Self::predicate(column, Operator::RegexMatch, Operand::Pattern(pattern.to_string()))
    }

    /// An empty list matches nothing
    pub fn in_list<V: Into<StoreValue>>(column: &str, values: Vec<V>) -> Self {
        Self::predicate(
            column,
            Operator::InList,
            Operand::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// An empty list matches everything
    pub fn not_in_list<V: Into<StoreValue>>(column: &str, values: Vec<V>) -> Self {
        Self::predicate(
            column,
            Operator::NotInList,
            Operand::List(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn is_null(column: &str) -> Self {
        Self::predicate(column, Operator::IsNull, Operand::None)
    }

    pub fn is_not_null(column: &str) -> Self {
        Self::predicate(column, Operator::IsNotNull, Operand::None)
    }

    /// Conjunction. `All` is the neutral element.
    pub fn and(self, other: Condition) -> Self {
        match (self, other) {
            (Condition::All, other) | (other, Condition::All) => other,
            (left, right) => Condition::And(Box::new(left), Box::new(right)),
        }
    }

    /// Disjunction. `All` absorbs the other side.
    pub fn or(self, other: Condition) -> Self {
        match (self, other) {
            (Condition::All, _) | (_, Condition::All) => Condition::All,
            (left, right) => Condition::Or(Box::new(left), Box::new(right)),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Condition::All)
    }

    /// Every column referenced by the tree, in visiting order
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::All => {}
            Condition::Predicate { column, .. } => out.push(column),
            Condition::And(left, right) | Condition::Or(left, right) => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
        }
    }

    /// Check that each operator carries the operand shape it needs
    pub fn check_shape(&self) -> Result<(), String> {
        match self {
            Condition::All => Ok(()),
            Condition::And(left, right) | Condition::Or(left, right) => {
                left.check_shape()?;
                right.check_shape()
            }
            Condition::Predicate {
                column,
                operator,
                operand,
            } => {
                let ok = match operator {
                    Operator::Eq
                    | Operator::Neq
                    | Operator::Less
                    | Operator::LessEq
                    | Operator::Greater
                    | Operator::GreaterEq => matches!(operand, Operand::Value(_)),
                    Operator::Between => matches!(operand, Operand::Range(..)),
                    Operator::Like | Operator::NotLike | Operator::RegexMatch => {
                        matches!(operand, Operand::Pattern(_))
                    }
                    Operator::InList | Operator::NotInList => matches!(operand, Operand::List(_)),
                    Operator::IsNull | Operator::IsNotNull => matches!(operand, Operand::None),
                };
                if ok {
                    Ok(())
                } else {
                    Err(format!("{:?} on '{}' cannot take {:?}", operator, column, operand))
                }
            }
        }
    }
}

/// Standalone conjunction
pub fn and(left: Condition, right: Condition) -> Condition {
    left.and(right)
}

/// Standalone disjunction
pub fn or(left: Condition, right: Condition) -> Condition {
    left.or(right)
}
