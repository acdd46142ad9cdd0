//! SQL backend: renders a [`QueryPlan`] as a parameterised `SELECT` over a
//! `logs` table (PostgreSQL dialect, `$n` placeholders).
//!
//! Top-level log fields map to columns (`appId` → `app_id`). Paths under
//! `data.` are read from the JSON `data` column with `#>>`.
//!
//! [`QueryPlan`]: super::QueryPlan

use super::plan::{MatchStage, PlanVisitor, Predicate, SortStage};
use super::{SortOrder, Value};

/// Rendered statement plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug)]
pub struct SqlRenderer {
    table: String,
    conditions: Vec<String>,
    order_by: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
    params: Vec<Value>,
}

impl SqlRenderer {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            conditions: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
            params: Vec::new(),
        }
    }

    fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn condition(&mut self, column: &str, predicate: &Predicate) -> String {
        match predicate {
            Predicate::Eq(Value::Null) => format!("{column} IS NULL"),
            Predicate::Eq(v) => format!("{column} = {}", self.bind(v.clone())),
            Predicate::Ne(v) => format!("{column} IS DISTINCT FROM {}", self.bind(v.clone())),
            Predicate::Like(pattern) => {
                let p = self.bind(Value::Str(format!("%{}%", escape_like(pattern))));
                format!("{column} ILIKE {p}")
            }
            Predicate::In(values) if values.is_empty() => "FALSE".to_string(),
            Predicate::In(values) => {
                let slots: Vec<String> = values.iter().map(|v| self.bind(v.clone())).collect();
                format!("{column} IN ({})", slots.join(", "))
            }
            Predicate::Gte(v) => format!("{column} >= {}", self.bind(v.clone())),
            Predicate::Lte(v) => format!("{column} <= {}", self.bind(v.clone())),
        }
    }
}

impl Default for SqlRenderer {
    fn default() -> Self {
        Self::new("logs")
    }
}

impl PlanVisitor for SqlRenderer {
    type Output = SqlQuery;

    fn visit_match(&mut self, stage: &MatchStage) {
        for clause in &stage.clauses {
            let column = column(&clause.field);
            for predicate in &clause.predicates {
                let cond = self.condition(&column, predicate);
                self.conditions.push(cond);
            }
        }
    }

    fn visit_sort(&mut self, stage: &SortStage) {
        let direction = match stage.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        self.order_by = Some(format!("{} {direction}", column(&stage.field)));
    }

    fn visit_skip(&mut self, n: u64) {
        self.offset = Some(self.bind(bigint(n)));
    }

    fn visit_limit(&mut self, n: u64) {
        self.limit = Some(self.bind(bigint(n)));
    }

    fn finish(self) -> SqlQuery {
        let mut sql = format!("SELECT * FROM {}", quote_ident(&self.table));
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        if let Some(order) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        if let Some(limit) = &self.limit {
            sql.push_str(" LIMIT ");
            sql.push_str(limit);
        }
        if let Some(offset) = &self.offset {
            sql.push_str(" OFFSET ");
            sql.push_str(offset);
        }
        SqlQuery {
            sql,
            params: self.params,
        }
    }
}

fn column(field: &str) -> String {
    match field {
        "id" | "_id" => quote_ident("id"),
        "appId" | "app_id" => quote_ident("app_id"),
        "data" => quote_ident("data"),
        _ => match field.strip_prefix("data.") {
            Some(path) => {
                let segments: Vec<String> = path.split('.').map(|s| s.replace(['{', '}', ',', '\''], "")).collect();
                format!("{} #>> '{{{}}}'", quote_ident("data"), segments.join(","))
            }
            None => quote_ident(field),
        },
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// `BIGINT` is signed; counts past `i64::MAX` clamp to it.
fn bigint(n: u64) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}
