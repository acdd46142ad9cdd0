//! Document-store backend: renders a [`QueryPlan`] as aggregation stages
//! (`$match`, `$sort`, `$skip`, `$limit`) in JSON.
//!
//! Predicates on the same field merge into one operator object
//! (`{"timestamp": {"$gte": .., "$lte": ..}}`). When an operator repeats on a
//! field, the clause is emitted under `$and` instead so no predicate is lost.
//!
//! [`QueryPlan`]: super::QueryPlan

use serde_json::{json, Map, Value as Json};

use super::plan::{FieldClause, MatchStage, PlanVisitor, Predicate, SortStage};
use super::{SortOrder, Value};

#[derive(Debug, Default)]
pub struct DocumentPipeline {
    stages: Vec<Json>,
}

impl DocumentPipeline {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlanVisitor for DocumentPipeline {
    type Output = Vec<Json>;

    fn visit_match(&mut self, stage: &MatchStage) {
        let mut filter = Map::new();
        let mut conjuncts = Vec::new();

        for clause in &stage.clauses {
            match merge_clause(clause) {
                Some(ops) => {
                    filter.insert(clause.field.clone(), Json::Object(ops));
                }
                None => conjuncts.extend(clause.predicates.iter().map(|p| {
                    json!({ clause.field.clone(): Json::Object(operator_object(p)) })
                })),
            }
        }
        if !conjuncts.is_empty() {
            filter.insert("$and".to_string(), Json::Array(conjuncts));
        }
        self.stages.push(json!({ "$match": filter }));
    }

    fn visit_sort(&mut self, stage: &SortStage) {
        let direction = match stage.order {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        };
        self.stages
            .push(json!({ "$sort": { stage.field.clone(): direction } }));
    }

    fn visit_skip(&mut self, n: u64) {
        self.stages.push(json!({ "$skip": n }));
    }

    fn visit_limit(&mut self, n: u64) {
        self.stages.push(json!({ "$limit": n }));
    }

    fn finish(self) -> Self::Output {
        self.stages
    }
}

/// Merge a clause's predicates into one operator object, or `None` if two
/// predicates share an operator key.
fn merge_clause(clause: &FieldClause) -> Option<Map<String, Json>> {
    let mut merged = Map::new();
    for predicate in &clause.predicates {
        for (op, value) in operator_object(predicate) {
            if merged.insert(op, value).is_some() {
                return None;
            }
        }
    }
    Some(merged)
}

fn operator_object(predicate: &Predicate) -> Map<String, Json> {
    let mut ops = Map::new();
    match predicate {
        Predicate::Eq(v) => {
            ops.insert("$eq".into(), render(v));
        }
        Predicate::Ne(v) => {
            ops.insert("$ne".into(), render(v));
        }
        Predicate::Like(pattern) => {
            ops.insert("$regex".into(), Json::String(regex::escape(pattern)));
            ops.insert("$options".into(), Json::String("i".into()));
        }
        Predicate::In(values) => {
            ops.insert("$in".into(), Json::Array(values.iter().map(render).collect()));
        }
        Predicate::Gte(v) => {
            ops.insert("$gte".into(), render(v));
        }
        Predicate::Lte(v) => {
            ops.insert("$lte".into(), render(v));
        }
    }
    ops
}

/// Extended-JSON rendering of an operand.
fn render(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => json!(b),
        Value::Int(n) => json!(n),
        Value::Float(n) => json!(n),
        Value::Time(t) => json!({ "$date": t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true) }),
        Value::Id(id) => json!(id.to_string()),
        Value::Str(s) => json!(s),
        Value::List(items) => Json::Array(items.iter().map(render).collect()),
    }
}
