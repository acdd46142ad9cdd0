//! Core types for logmill-core.
//!
//! This module defines the data structures shared across every layer: the
//! structured [`AttributeTree`], the stored [`ParsedLog`], the owning [`App`],
//! identifiers, and the time primitives used by scoped queries.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifier for logs, apps and owners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(uuid::Uuid);

impl Id {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse an identifier supplied at a request boundary.
    pub fn parse(value: &str) -> Result<Self, Error> {
        uuid::Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| Error::InvalidIdentifier {
                value: value.to_string(),
            })
    }

    /// Parse every identifier in `values`, failing on the first malformed one.
    pub fn parse_all<S: AsRef<str>>(values: &[S]) -> Result<Vec<Self>, Error> {
        values.iter().map(|v| Self::parse(v.as_ref())).collect()
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AttributeTree
// ---------------------------------------------------------------------------

/// Structured representation of one parsed log line.
///
/// Serializes to and from plain JSON: `Null` is `null`, `Object` is a JSON
/// object, and so on. Object key order is not significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeTree {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<AttributeTree>),
    Object(BTreeMap<String, AttributeTree>),
}

impl AttributeTree {
    /// Build an object node from `(key, value)` pairs.
    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AttributeTree)>,
    {
        AttributeTree::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, AttributeTree>> {
        match self {
            AttributeTree::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeTree::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a top-level key of an object node.
    pub fn get(&self, key: &str) -> Option<&AttributeTree> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Walk a dot-separated path (`"request.headers.host"`) through nested
    /// objects.
    pub fn pointer(&self, path: &str) -> Option<&AttributeTree> {
        path.split('.')
            .try_fold(self, |node, segment| node.get(segment))
    }
}

impl From<serde_json::Value> for AttributeTree {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeTree::Null,
            serde_json::Value::Bool(b) => AttributeTree::Bool(b),
            serde_json::Value::Number(n) => AttributeTree::Number(n),
            serde_json::Value::String(s) => AttributeTree::String(s),
            serde_json::Value::Array(items) => {
                AttributeTree::Array(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(map) => {
                AttributeTree::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<AttributeTree> for serde_json::Value {
    fn from(tree: AttributeTree) -> Self {
        match tree {
            AttributeTree::Null => serde_json::Value::Null,
            AttributeTree::Bool(b) => serde_json::Value::Bool(b),
            AttributeTree::Number(n) => serde_json::Value::Number(n),
            AttributeTree::String(s) => serde_json::Value::String(s),
            AttributeTree::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            AttributeTree::Object(map) => {
                serde_json::Value::Object(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for AttributeTree {
    fn from(s: &str) -> Self {
        AttributeTree::String(s.to_string())
    }
}

impl From<String> for AttributeTree {
    fn from(s: String) -> Self {
        AttributeTree::String(s)
    }
}

impl From<i64> for AttributeTree {
    fn from(n: i64) -> Self {
        AttributeTree::Number(n.into())
    }
}

impl From<bool> for AttributeTree {
    fn from(b: bool) -> Self {
        AttributeTree::Bool(b)
    }
}

// ---------------------------------------------------------------------------
// Stored documents
// ---------------------------------------------------------------------------

/// A log document as handed to the Log Store.
///
/// `raw` is always the verbatim input line. `data` is `None` when the line
/// could not be parsed in the requested format; the record is still stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedLog {
    pub id: Id,
    pub app_id: Id,
    pub timestamp: DateTime<Utc>,
    pub data: Option<AttributeTree>,
    pub raw: String,
    pub level: String,
}

/// An application that owns logs. App CRUD lives outside this crate; the
/// store only needs enough of it to join logs to their owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: Id,
    pub name: String,
    pub owner_id: Id,
}

impl App {
    pub fn new(name: impl Into<String>, owner_id: Id) -> Self {
        Self {
            id: Id::new(),
            name: name.into(),
            owner_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Inclusive `[from, to]` window on `ParsedLog::timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Build a range from optional bounds. A missing bound is open-ended.
    /// Returns `None` when both bounds are missing.
    pub fn from_bounds(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Option<Self> {
        match (from, to) {
            (None, None) => None,
            (from, to) => Some(Self {
                from: from.unwrap_or(DateTime::<Utc>::MIN_UTC),
                to: to.unwrap_or(DateTime::<Utc>::MAX_UTC),
            }),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.from <= ts && ts <= self.to
    }
}

/// A calendar month, used as the `logsByPeriod` key. Serializes as `"YYYY-MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn of(ts: DateTime<Utc>) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
