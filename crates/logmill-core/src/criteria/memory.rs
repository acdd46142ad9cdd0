//! In-memory backend: turns a [`QueryPlan`] into a [`MemoryPlan`] that
//! filters, sorts and pages a slice of [`ParsedLog`]s in process.
//!
//! Field paths resolve against the log document: `id`, `appId`, `timestamp`,
//! `raw`, `level`, `data`, and `data.<a>.<b>…` into the attribute tree.
//! `ne` matches documents where the field is absent; range and `like`
//! predicates never match an absent field.
//!
//! [`QueryPlan`]: super::QueryPlan

use regex::{Regex, RegexBuilder};
use std::cmp::Ordering;

use super::plan::{MatchStage, PlanVisitor, Predicate, SortStage};
use super::{SortOrder, Value};
use crate::types::{AttributeTree, ParsedLog};

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryPlanner {
    plan: MemoryPlan,
}

impl MemoryPlanner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlanVisitor for MemoryPlanner {
    type Output = MemoryPlan;

    fn visit_match(&mut self, stage: &MatchStage) {
        for clause in &stage.clauses {
            for predicate in &clause.predicates {
                self.plan.conditions.push(Condition {
                    field: clause.field.clone(),
                    test: Test::from(predicate),
                });
            }
        }
    }

    fn visit_sort(&mut self, stage: &SortStage) {
        self.plan.sort = Some(stage.clone());
    }

    fn visit_skip(&mut self, n: u64) {
        self.plan.skip = usize::try_from(n).unwrap_or(usize::MAX);
    }

    fn visit_limit(&mut self, n: u64) {
        self.plan.limit = Some(usize::try_from(n).unwrap_or(usize::MAX));
    }

    fn finish(self) -> MemoryPlan {
        self.plan
    }
}

// ---------------------------------------------------------------------------
// Executable plan
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryPlan {
    conditions: Vec<Condition>,
    sort: Option<SortStage>,
    skip: usize,
    limit: Option<usize>,
}

#[derive(Debug)]
struct Condition {
    field: String,
    test: Test,
}

#[derive(Debug)]
enum Test {
    Eq(Value),
    Ne(Value),
    Like { pattern: String, regex: Option<Regex> },
    In(Vec<Value>),
    Gte(Value),
    Lte(Value),
}

impl From<&Predicate> for Test {
    fn from(predicate: &Predicate) -> Self {
        match predicate {
            Predicate::Eq(v) => Test::Eq(v.clone()),
            Predicate::Ne(v) => Test::Ne(v.clone()),
            Predicate::Like(pattern) => Test::Like {
                pattern: pattern.to_lowercase(),
                regex: RegexBuilder::new(&regex::escape(pattern))
                    .case_insensitive(true)
                    .build()
                    .ok(),
            },
            Predicate::In(vs) => Test::In(vs.clone()),
            Predicate::Gte(v) => Test::Gte(v.clone()),
            Predicate::Lte(v) => Test::Lte(v.clone()),
        }
    }
}

impl MemoryPlan {
    /// Whether `log` satisfies every condition of the match stage.
    pub fn matches(&self, log: &ParsedLog) -> bool {
        self.conditions.iter().all(|c| {
            let field = field_value(log, &c.field);
            c.test.holds(field.as_ref())
        })
    }

    /// Run the plan over `logs`: match, then sort, then skip, then limit.
    pub fn execute<'a, I>(&self, logs: I) -> Vec<ParsedLog>
    where
        I: IntoIterator<Item = &'a ParsedLog>,
    {
        let mut matched: Vec<&ParsedLog> = logs.into_iter().filter(|l| self.matches(l)).collect();

        if let Some(sort) = &self.sort {
            matched.sort_by(|a, b| {
                let ord = compare_missing_first(
                    field_value(a, &sort.field).as_ref(),
                    field_value(b, &sort.field).as_ref(),
                );
                match sort.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        matched
            .into_iter()
            .skip(self.skip)
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

impl Test {
    fn holds(&self, field: Option<&Value>) -> bool {
        match (self, field) {
            (Test::Eq(v), Some(f)) => equals(f, v),
            (Test::Eq(Value::Null), None) => true,
            (Test::Eq(_), None) => false,
            (Test::Ne(v), Some(f)) => !equals(f, v),
            (Test::Ne(Value::Null), None) => false,
            (Test::Ne(_), None) => true,
            (Test::In(vs), Some(f)) => vs.iter().any(|v| equals(f, v)),
            (Test::In(_), None) => false,
            (Test::Gte(v), Some(f)) => matches!(f.compare(v), Some(Ordering::Greater | Ordering::Equal)),
            (Test::Lte(v), Some(f)) => matches!(f.compare(v), Some(Ordering::Less | Ordering::Equal)),
            (Test::Gte(_) | Test::Lte(_), None) => false,
            (Test::Like { pattern, regex }, Some(f)) => match f.as_text() {
                Some(text) => match regex {
                    Some(re) => re.is_match(&text),
                    None => text.to_lowercase().contains(pattern.as_str()),
                },
                None => false,
            },
            (Test::Like { .. }, None) => false,
        }
    }
}

/// Equality with array fields matching when any element matches.
fn equals(field: &Value, operand: &Value) -> bool {
    match field {
        Value::List(items) if !operand.is_list() => items.iter().any(|i| i.loosely_equals(operand)),
        _ => field.loosely_equals(operand) || field == operand,
    }
}

fn compare_missing_first(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

// ---------------------------------------------------------------------------
// Field resolution
// ---------------------------------------------------------------------------

/// Comparable value of `path` on `log`, or `None` when absent.
pub fn field_value(log: &ParsedLog, path: &str) -> Option<Value> {
    match path {
        "id" | "_id" => Some(Value::Id(log.id)),
        "appId" | "app_id" => Some(Value::Id(log.app_id)),
        "timestamp" => Some(Value::Time(log.timestamp)),
        "raw" => Some(Value::Str(log.raw.clone())),
        "level" => Some(Value::Str(log.level.clone())),
        "data" => log.data.as_ref().and_then(tree_value),
        _ => {
            let rest = path.strip_prefix("data.")?;
            log.data.as_ref()?.pointer(rest).and_then(tree_value)
        }
    }
}

/// Scalars and arrays of scalars are comparable; objects are not.
fn tree_value(tree: &AttributeTree) -> Option<Value> {
    match tree {
        AttributeTree::Null => Some(Value::Null),
        AttributeTree::Bool(b) => Some(Value::Bool(*b)),
        AttributeTree::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float)),
        AttributeTree::String(s) => Some(Value::Str(s.clone())),
        AttributeTree::Array(items) => Some(Value::List(items.iter().filter_map(tree_value).collect())),
        AttributeTree::Object(_) => None,
    }
}
