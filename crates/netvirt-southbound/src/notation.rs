//! OVSDB JSON notation decoding.
//!
//! Rows delivered by the southbound library are maps from column name to an
//! OVSDB-JSON value (RFC 7047 section 5.1):
//!
//! - a bare atom: string, integer, real or boolean
//! - `["uuid", "<uuid>"]` or `["named-uuid", "<id>"]`
//! - `["set", [atom, ...]]`
//! - `["map", [[key, value], ...]]`
//!
//! A set with exactly one element may be sent as the bare element, so column
//! readers accept both shapes.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::NotationError;

/// A raw table row: column name to OVSDB-JSON value.
pub type Row = BTreeMap<String, Value>;

const TAG_SET: &str = "set";
const TAG_MAP: &str = "map";
const TAG_UUID: &str = "uuid";
const TAG_NAMED_UUID: &str = "named-uuid";

/// A scalar OVSDB value.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Uuid(Uuid),
    NamedUuid(String),
}

impl Atom {
    /// Returns the string payload of a string atom.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atom::String(s) => Some(s),
            _ => None,
        }
    }

    fn parse(value: &Value) -> Result<Self, NotationError> {
        match value {
            Value::String(s) => Ok(Atom::String(s.clone())),
            Value::Bool(b) => Ok(Atom::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Atom::Integer(i)),
                None => n
                    .as_f64()
                    .map(Atom::Real)
                    .ok_or_else(|| NotationError::Malformed(n.to_string())),
            },
            Value::Array(items) => match tagged(items)? {
                (TAG_UUID, Value::String(s)) => Uuid::parse_str(s)
                    .map(Atom::Uuid)
                    .map_err(|e| NotationError::Malformed(format!("uuid '{}': {}", s, e))),
                (TAG_NAMED_UUID, Value::String(s)) => Ok(Atom::NamedUuid(s.clone())),
                (TAG_SET, _) | (TAG_MAP, _) => Err(NotationError::Malformed(format!(
                    "nested collection {}",
                    value
                ))),
                (tag, _) => Err(NotationError::UnknownTag(tag.to_string())),
            },
            other => Err(NotationError::Malformed(other.to_string())),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::String(s) => f.write_str(s),
            Atom::Integer(i) => write!(f, "{}", i),
            Atom::Real(r) => write!(f, "{}", r),
            Atom::Boolean(b) => write!(f, "{}", b),
            Atom::Uuid(u) => write!(f, "{}", u),
            Atom::NamedUuid(n) => f.write_str(n),
        }
    }
}

/// A decoded OVSDB column value.
#[derive(Debug, Clone, PartialEq)]
pub enum OvsdbValue {
    Atom(Atom),
    Set(Vec<Atom>),
    Map(Vec<(Atom, Atom)>),
}

impl OvsdbValue {
    /// Decodes an OVSDB-JSON value.
    pub fn parse(value: &Value) -> Result<Self, NotationError> {
        let Value::Array(items) = value else {
            return Atom::parse(value).map(OvsdbValue::Atom);
        };

        match tagged(items)? {
            (TAG_SET, Value::Array(elems)) => elems
                .iter()
                .map(Atom::parse)
                .collect::<Result<Vec<_>, _>>()
                .map(OvsdbValue::Set),
            (TAG_MAP, Value::Array(pairs)) => pairs
                .iter()
                .map(|pair| match pair {
                    Value::Array(kv) if kv.len() == 2 => {
                        Ok((Atom::parse(&kv[0])?, Atom::parse(&kv[1])?))
                    }
                    other => Err(NotationError::Malformed(format!("map pair {}", other))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(OvsdbValue::Map),
            (TAG_SET, other) | (TAG_MAP, other) => {
                Err(NotationError::Malformed(format!("collection body {}", other)))
            }
            _ => Atom::parse(value).map(OvsdbValue::Atom),
        }
    }

    /// Returns the elements as a slice, treating an atom as a one-element set.
    fn elements(&self) -> Option<&[Atom]> {
        match self {
            OvsdbValue::Atom(a) => Some(std::slice::from_ref(a)),
            OvsdbValue::Set(s) => Some(s),
            OvsdbValue::Map(_) => None,
        }
    }

    /// Returns the single element of an atom or a one-element set.
    ///
    /// An empty set yields `Some(None)` (the optional-column encoding);
    /// sets with more than one element and maps yield `None`.
    pub fn optional_atom(&self) -> Option<Option<&Atom>> {
        match self.elements()? {
            [] => Some(None),
            [a] => Some(Some(a)),
            _ => None,
        }
    }

    /// Converts a map value into string pairs.
    pub fn to_string_map(&self) -> Option<BTreeMap<String, String>> {
        match self {
            OvsdbValue::Map(pairs) => Some(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            // An empty map may arrive as an empty set.
            OvsdbValue::Set(s) if s.is_empty() => Some(BTreeMap::new()),
            _ => None,
        }
    }
}

fn tagged(items: &[Value]) -> Result<(&str, &Value), NotationError> {
    match items {
        [Value::String(tag), body] => Ok((tag.as_str(), body)),
        _ => Err(NotationError::Malformed(format!(
            "expected [tag, value], got {} elements",
            items.len()
        ))),
    }
}

/// Decodes a column, returning `None` when the row does not carry it.
pub fn column(row: &Row, name: &str) -> Result<Option<OvsdbValue>, NotationError> {
    row.get(name).map(OvsdbValue::parse).transpose()
}

/// Reads a required string column.
pub fn string_column(row: &Row, name: &str) -> Result<String, NotationError> {
    optional_string_column(row, name)?.ok_or_else(|| NotationError::MissingColumn(name.to_string()))
}

/// Reads an optional string column (absent or empty set).
pub fn optional_string_column(row: &Row, name: &str) -> Result<Option<String>, NotationError> {
    let Some(value) = column(row, name)? else {
        return Ok(None);
    };
    match value.optional_atom() {
        Some(None) => Ok(None),
        Some(Some(Atom::String(s))) => Ok(Some(s.clone())),
        _ => Err(wrong_type(name, "string")),
    }
}

/// Reads an optional integer column (absent or empty set).
pub fn optional_integer_column(row: &Row, name: &str) -> Result<Option<i64>, NotationError> {
    let Some(value) = column(row, name)? else {
        return Ok(None);
    };
    match value.optional_atom() {
        Some(None) => Ok(None),
        Some(Some(Atom::Integer(i))) => Ok(Some(*i)),
        _ => Err(wrong_type(name, "integer")),
    }
}

/// Reads a string-to-string map column; absent means empty.
pub fn map_column(row: &Row, name: &str) -> Result<BTreeMap<String, String>, NotationError> {
    match column(row, name)? {
        None => Ok(BTreeMap::new()),
        Some(value) => value.to_string_map().ok_or_else(|| wrong_type(name, "map")),
    }
}

fn wrong_type(column: &str, expected: &str) -> NotationError {
    NotationError::WrongType {
        column: column.to_string(),
        expected: expected.to_string(),
    }
}
