//! Query plan IR and the criteria compiler.

use serde::{Deserialize, Serialize};

use super::{Criteria, Filter, Operator, SortOrder, Value};
use crate::error::Error;

// ---------------------------------------------------------------------------
// IR
// ---------------------------------------------------------------------------

/// A typed per-field predicate, one variant per filter operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Value),
    Ne(Value),
    /// Case-insensitive substring match on the literal pattern.
    Like(String),
    In(Vec<Value>),
    Gte(Value),
    Lte(Value),
}

impl Predicate {
    pub fn operator(&self) -> Operator {
        match self {
            Predicate::Eq(_) => Operator::Eq,
            Predicate::Ne(_) => Operator::Ne,
            Predicate::Like(_) => Operator::Like,
            Predicate::In(_) => Operator::In,
            Predicate::Gte(_) => Operator::Gte,
            Predicate::Lte(_) => Operator::Lte,
        }
    }
}

/// Every predicate compiled for one field. All of them must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldClause {
    pub field: String,
    pub predicates: Vec<Predicate>,
}

/// Conjunction of field clauses, in order of each field's first appearance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchStage {
    pub clauses: Vec<FieldClause>,
}

impl MatchStage {
    pub fn clause(&self, field: &str) -> Option<&FieldClause> {
        self.clauses.iter().find(|c| c.field == field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortStage {
    pub field: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(MatchStage),
    Sort(SortStage),
    Skip(u64),
    Limit(u64),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Match(_) => "match",
            Stage::Sort(_) => "sort",
            Stage::Skip(_) => "skip",
            Stage::Limit(_) => "limit",
        }
    }
}

/// Ordered, backend-agnostic plan. Stages always appear in the order
/// `match → sort → skip → limit`, each at most once.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPlan {
    stages: Vec<Stage>,
}

impl QueryPlan {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn match_stage(&self) -> Option<&MatchStage> {
        self.stages.iter().find_map(|s| match s {
            Stage::Match(m) => Some(m),
            _ => None,
        })
    }

    /// Walk the plan in stage order and return what the visitor builds.
    pub fn accept<V: PlanVisitor>(&self, mut visitor: V) -> V::Output {
        for stage in &self.stages {
            match stage {
                Stage::Match(m) => visitor.visit_match(m),
                Stage::Sort(s) => visitor.visit_sort(s),
                Stage::Skip(n) => visitor.visit_skip(*n),
                Stage::Limit(n) => visitor.visit_limit(*n),
            }
        }
        visitor.finish()
    }
}

/// One implementation per storage backend.
pub trait PlanVisitor {
    type Output;

    fn visit_match(&mut self, stage: &MatchStage);
    fn visit_sort(&mut self, stage: &SortStage);
    fn visit_skip(&mut self, n: u64);
    fn visit_limit(&mut self, n: u64);
    fn finish(self) -> Self::Output;
}

// ---------------------------------------------------------------------------
// Compiler
// ---------------------------------------------------------------------------

/// How several filters on the same field combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Composition {
    /// Every predicate on the field must hold (`gte` + `lte` is a range).
    #[default]
    #[serde(rename = "and")]
    All,
    /// Legacy behaviour: the last filter on a field replaces earlier ones.
    #[serde(rename = "last_wins")]
    LastWins,
}

/// Compile with per-field AND composition.
pub fn compile(criteria: &Criteria) -> Result<QueryPlan, Error> {
    compile_with(criteria, Composition::All)
}

pub fn compile_with(criteria: &Criteria, composition: Composition) -> Result<QueryPlan, Error> {
    let mut stages = Vec::with_capacity(4);

    if !criteria.filters.is_empty() {
        let mut stage = MatchStage::default();
        for filter in &criteria.filters {
            let predicate = lower(filter)?;
            match stage.clauses.iter_mut().find(|c| c.field == filter.field) {
                Some(clause) => match composition {
                    Composition::All => clause.predicates.push(predicate),
                    Composition::LastWins => clause.predicates = vec![predicate],
                },
                None => stage.clauses.push(FieldClause {
                    field: filter.field.clone(),
                    predicates: vec![predicate],
                }),
            }
        }
        stages.push(Stage::Match(stage));
    }

    if let Some(sort) = criteria.sort.as_ref().filter(|s| !s.field.is_empty()) {
        stages.push(Stage::Sort(SortStage {
            field: sort.field.clone(),
            order: sort.order,
        }));
    }

    if let Some(page) = criteria.pagination {
        if page.offset > 0 {
            stages.push(Stage::Skip(page.offset));
        }
        if page.limit > 0 {
            stages.push(Stage::Limit(page.limit));
        }
    }

    tracing::trace!(stages = ?stages.iter().map(Stage::name).collect::<Vec<_>>(), "criteria compiled");
    Ok(QueryPlan { stages })
}

fn lower(filter: &Filter) -> Result<Predicate, Error> {
    let invalid = |reason: &str| Error::InvalidOperand {
        field: filter.field.clone(),
        operator: filter.operator.to_string(),
        reason: reason.to_string(),
    };

    let value = filter.value.clone();
    match filter.operator {
        Operator::In => match value {
            Value::List(items) => Ok(Predicate::In(items)),
            _ => Err(invalid("expects a list of values")),
        },
        Operator::Like => value
            .as_text()
            .map(|t| Predicate::Like(t.into_owned()))
            .ok_or_else(|| invalid("expects a text pattern")),
        _ if value.is_list() => Err(invalid("expects a single value")),
        Operator::Eq => Ok(Predicate::Eq(value)),
        Operator::Ne => Ok(Predicate::Ne(value)),
        Operator::Gte | Operator::Lte if matches!(value, Value::Null) => {
            Err(invalid("cannot bound a range by null"))
        }
        Operator::Gte => Ok(Predicate::Gte(value)),
        Operator::Lte => Ok(Predicate::Lte(value)),
    }
}
