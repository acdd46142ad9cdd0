//! Criteria — backend-agnostic filter / sort / pagination requests.
//!
//! A [`Criteria`] is compiled by [`compile`] into a [`QueryPlan`], an ordered
//! list of stages (`match → sort → skip → limit`). Backends turn a plan into
//! something executable by walking it with a [`PlanVisitor`]:
//!
//! - [`document::DocumentPipeline`] — document-store aggregation stages (JSON)
//! - [`sql::SqlRenderer`] — a parameterised `SELECT`
//! - [`memory::MemoryPlanner`] — an in-process evaluator over [`ParsedLog`]s
//!
//! [`ParsedLog`]: crate::types::ParsedLog

pub mod document;
pub mod memory;
pub mod plan;
pub mod sql;

pub use plan::{
    compile, compile_with, Composition, FieldClause, MatchStage, PlanVisitor, Predicate, QueryPlan,
    SortStage, Stage,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::Error;
use crate::types::Id;

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Filter operator. Parsing any other name fails with
/// [`Error::UnsupportedOperator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Operator {
    Eq,
    Ne,
    Like,
    In,
    Gte,
    Lte,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Like => "like",
            Operator::In => "in",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eq" => Ok(Operator::Eq),
            "ne" => Ok(Operator::Ne),
            "like" => Ok(Operator::Like),
            "in" => Ok(Operator::In),
            "gte" => Ok(Operator::Gte),
            "lte" => Ok(Operator::Lte),
            _ => Err(Error::UnsupportedOperator {
                operator: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Operator {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ---------------------------------------------------------------------------
// Operand values
// ---------------------------------------------------------------------------

/// Operand of a filter, and the comparable view of a stored field.
///
/// Deserializes untagged: RFC 3339 strings become [`Value::Time`], UUID
/// strings become [`Value::Id`], other strings stay [`Value::Str`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Time(DateTime<Utc>),
    Id(Id),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Text view used by `like`. `None` for non-textual values.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Str(s) => Some(Cow::Borrowed(s)),
            Value::Id(id) => Some(Cow::Owned(id.to_string())),
            Value::Time(t) => Some(Cow::Owned(t.to_rfc3339())),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Ordering between two values of compatible kinds. Numbers compare
    /// across `Int`/`Float`; strings are coerced to times or ids when compared
    /// against one. Incompatible kinds yield `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Str(a), Str(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (Time(a), Str(b)) => parse_time(b).map(|b| a.cmp(&b)),
            (Str(a), Time(b)) => parse_time(a).map(|a| a.cmp(b)),
            (Id(a), Id(b)) => Some(a.cmp(b)),
            (Id(a), Str(b)) => crate::types::Id::parse(b).ok().map(|b| a.cmp(&b)),
            (Str(a), Id(b)) => crate::types::Id::parse(a).ok().map(|a| a.cmp(b)),
            _ => None,
        }
    }

    pub fn loosely_equals(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Time(t)
    }
}

impl From<Id> for Value {
    fn from(id: Id) -> Self {
        Value::Id(id)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// One predicate on one field. Filters in a [`Criteria`] are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Build a filter from an operator name received over the wire.
    pub fn parse(field: impl Into<String>, operator: &str, value: impl Into<Value>) -> Result<Self, Error> {
        Ok(Self::new(field, operator.parse()?, value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// `"desc"` (any case) sorts descending; anything else ascends.
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

/// `limit == 0` means unbounded; `offset == 0` skips nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

/// A complete search request: ANDed filters, optional sort, optional page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Criteria {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Option<Sort>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            order,
        });
        self
    }

    pub fn paginate(mut self, limit: u64, offset: u64) -> Self {
        self.pagination = Some(Pagination { limit, offset });
        self
    }
}
