//! Array literal encoding
//!
//! Arrays of any dimensionality are stored through the PostgreSQL array
//! literal syntax (`{{1,2},{3,4}}`). Elements are parsed back according to
//! the element domain, so `decode_array(encode_array(x)) == x` for every
//! normalized nested sequence `x`.

use crate::domain::Domain;
use crate::errors::DecodeError;
use crate::types::StoreValue;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Render a nested `StoreValue::Array` as an array literal
pub fn encode_array(value: &StoreValue) -> String {
    let mut out = String::new();
    write_element(&mut out, value);
    out
}

fn write_element(out: &mut String, value: &StoreValue) {
    match value {
        StoreValue::Array(items) => {
            out.push('{');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_element(out, item);
            }
            out.push('}');
        }
        StoreValue::Null => out.push_str("NULL"),
        StoreValue::SmallInt(v) => out.push_str(&v.to_string()),
        StoreValue::Integer(v) => out.push_str(&v.to_string()),
        StoreValue::BigInt(v) => out.push_str(&v.to_string()),
        StoreValue::Real(v) => out.push_str(&v.to_string()),
        StoreValue::Float(v) => out.push_str(&v.to_string()),
        StoreValue::Decimal(v) => out.push_str(v),
        StoreValue::Boolean(v) => out.push_str(if *v { "true" } else { "false" }),
        StoreValue::Text(s) => write_text(out, s),
        StoreValue::Date(d) => out.push_str(&d.format(DATE_FORMAT).to_string()),
        StoreValue::Time(t) => out.push_str(&t.format(TIME_FORMAT).to_string()),
        StoreValue::DateTime(dt) => write_text(out, &dt.format(DATETIME_FORMAT).to_string()),
        StoreValue::Timestamp(ts) => write_text(out, &ts.to_rfc3339()),
        StoreValue::TimestampTz(ts) => write_text(out, &ts.to_rfc3339()),
        StoreValue::Json(json) => write_text(out, &json.to_string()),
        StoreValue::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
            write_text(out, &format!("\\x{}", hex));
        }
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty()
        || s.eq_ignore_ascii_case("NULL")
        || s.chars()
            .any(|c| matches!(c, '{' | '}' | ',' | '"' | '\\') || c.is_whitespace())
}

fn write_text(out: &mut String, s: &str) {
    if !needs_quotes(s) {
        out.push_str(s);
        return;
    }
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

/// Parse an array literal whose leaves belong to `element`
pub fn decode_array(literal: &str, element: &Domain, dimensions: u8) -> Result<StoreValue, DecodeError> {
    let mut parser = Parser {
        literal,
        chars: literal.char_indices().peekable(),
        element,
        dimensions,
    };
    let value = parser.parse_array(1)?;
    parser.skip_whitespace();
    if parser.chars.peek().is_some() {
        return Err(parser.error("trailing characters after array"));
    }
    Ok(value)
}

struct Parser<'a> {
    literal: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    element: &'a Domain,
    dimensions: u8,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: &str) -> DecodeError {
        DecodeError::MalformedArray {
            literal: self.literal.to_string(),
            reason: reason.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), DecodeError> {
        self.skip_whitespace();
        match self.chars.next() {
            Some((_, c)) if c == expected => Ok(()),
            _ => Err(self.error(&format!("expected '{}'", expected))),
        }
    }

    fn parse_array(&mut self, depth: u8) -> Result<StoreValue, DecodeError> {
        self.expect('{')?;
        let mut items = Vec::new();

        self.skip_whitespace();
        if let Some((_, '}')) = self.chars.peek() {
            self.chars.next();
            return Ok(StoreValue::Array(items));
        }

        loop {
            self.skip_whitespace();
            let item = match self.chars.peek() {
                Some((_, '{')) => {
                    if depth >= self.dimensions {
                        return Err(self.error("more dimensions than declared"));
                    }
                    self.parse_array(depth + 1)?
                }
                Some((_, '"')) => {
                    let token = self.quoted()?;
                    self.convert(&token)?
                }
                Some(_) => {
                    let token = self.unquoted();
                    if token.is_empty() {
                        return Err(self.error("empty element"));
                    }
                    if token.eq_ignore_ascii_case("NULL") {
                        StoreValue::Null
                    } else {
                        self.convert(&token)?
                    }
                }
                None => return Err(self.error("unterminated array")),
            };
            items.push(item);

            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, '}')) => break,
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }

        Ok(StoreValue::Array(items))
    }

    fn quoted(&mut self) -> Result<String, DecodeError> {
        self.chars.next();
        let mut token = String::new();
        loop {
            match self.chars.next() {
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c)) => token.push(c),
                    None => return Err(self.error("dangling escape")),
                },
                Some((_, '"')) => return Ok(token),
                Some((_, c)) => token.push(c),
                None => return Err(self.error("unterminated quoted element")),
            }
        }
    }

    fn unquoted(&mut self) -> String {
        let mut token = String::new();
        while let Some((_, c)) = self.chars.peek() {
            if *c == ',' || *c == '}' {
                break;
            }
            token.push(*c);
            self.chars.next();
        }
        token.trim_end().to_string()
    }

    fn convert(&self, token: &str) -> Result<StoreValue, DecodeError> {
        parse_element(token, self.element)
    }
}

fn parse_element(token: &str, element: &Domain) -> Result<StoreValue, DecodeError> {
    let mismatch = || DecodeError::TypeMismatch {
        domain: element.to_string(),
        found: format!("'{}'", token),
    };

    match element {
        Domain::SmallInt => token.parse().map(StoreValue::SmallInt).map_err(|_| mismatch()),
        Domain::Integer => token.parse().map(StoreValue::Integer).map_err(|_| mismatch()),
        Domain::BigInt => token.parse().map(StoreValue::BigInt).map_err(|_| mismatch()),
        Domain::Real => token.parse().map(StoreValue::Real).map_err(|_| mismatch()),
        Domain::Double => token.parse().map(StoreValue::Float).map_err(|_| mismatch()),
        Domain::Decimal { .. } => Ok(StoreValue::Decimal(token.to_string())),
        Domain::Boolean => match token.to_ascii_lowercase().as_str() {
            "t" | "true" => Ok(StoreValue::Boolean(true)),
            "f" | "false" => Ok(StoreValue::Boolean(false)),
            _ => Err(mismatch()),
        },
        Domain::Char(_) | Domain::Varchar(_) | Domain::Text | Domain::Enum { .. } => {
            Ok(StoreValue::Text(token.to_string()))
        }
        Domain::Date => NaiveDate::parse_from_str(token, DATE_FORMAT)
            .map(StoreValue::Date)
            .map_err(|_| mismatch()),
        Domain::Time => NaiveTime::parse_from_str(token, TIME_FORMAT)
            .map(StoreValue::Time)
            .map_err(|_| mismatch()),
        Domain::DateTime => NaiveDateTime::parse_from_str(token, DATETIME_FORMAT)
            .map(StoreValue::DateTime)
            .map_err(|_| mismatch()),
        Domain::Custom(custom) => parse_element(token, &custom.base),
        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: StoreValue, element: Domain, dimensions: u8) {
        let literal = encode_array(&value);
        let decoded = decode_array(&literal, &element, dimensions).unwrap();
        assert_eq!(decoded, value, "literal was {}", literal);
    }

    #[test]
    fn test_encode_simple_arrays() {
        assert_eq!(encode_array(&StoreValue::from(vec![1, 2, 3])), "{1,2,3}");
        assert_eq!(
            encode_array(&StoreValue::from(vec![vec![1, 2], vec![3, 4]])),
            "{{1,2},{3,4}}"
        );
        assert_eq!(encode_array(&StoreValue::Array(vec![])), "{}");
    }

    #[test]
    fn test_text_quoting() {
        let value = StoreValue::from(vec!["plain", "two words", "", "NULL", "a,b", "say \"hi\"", "back\\slash"]);
        assert_eq!(
            encode_array(&value),
            r#"{plain,"two words","","NULL","a,b","say \"hi\"","back\\slash"}"#
        );
        round_trip(value, Domain::Varchar(70), 1);
    }

    #[test]
    fn test_round_trip_multi_dimensional() {
        round_trip(StoreValue::from(vec![vec![1, 2], vec![3, 4]]), Domain::Integer, 2);
        round_trip(
            StoreValue::from(vec![
                vec![vec!["a", "b"], vec!["c", "d"]],
                vec![vec!["e", "f"], vec!["g", "h"]],
            ]),
            Domain::Text,
            3,
        );
        round_trip(StoreValue::Array(vec![StoreValue::Array(vec![])]), Domain::Integer, 2);
    }

    #[test]
    fn test_round_trip_nulls_and_floats() {
        round_trip(
            StoreValue::Array(vec![StoreValue::Float(3.5), StoreValue::Null, StoreValue::Float(1.8)]),
            Domain::Double,
            1,
        );
        round_trip(
            StoreValue::Array(vec![StoreValue::Text("x".into()), StoreValue::Null]),
            Domain::Varchar(50),
            1,
        );
    }

    #[test]
    fn test_round_trip_temporal_elements() {
        let date = NaiveDate::from_ymd_opt(1999, 10, 26).unwrap();
        let datetime = date.and_hms_opt(9, 30, 0).unwrap();
        round_trip(StoreValue::Array(vec![StoreValue::Date(date)]), Domain::Date, 1);
        round_trip(StoreValue::Array(vec![StoreValue::DateTime(datetime)]), Domain::DateTime, 1);
    }

    #[test]
    fn test_decode_store_output() {
        // PostgreSQL prints booleans as t/f and tolerates whitespace
        let decoded = decode_array("{ t , f }", &Domain::Boolean, 1).unwrap();
        assert_eq!(decoded, StoreValue::from(vec![true, false]));
    }

    #[test]
    fn test_decode_rejects_malformed_literals() {
        assert!(decode_array("{1,2", &Domain::Integer, 1).is_err());
        assert!(decode_array("{1,,2}", &Domain::Integer, 1).is_err());
        assert!(decode_array("{{1}}", &Domain::Integer, 1).is_err());
        assert!(decode_array("{x}", &Domain::Integer, 1).is_err());
        assert!(decode_array("{1} trailing", &Domain::Integer, 1).is_err());
    }
}
