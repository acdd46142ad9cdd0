//! Store — the Log Store collaborator contract and an in-memory implementation.
//!
//! The analytics engines never talk to a database directly. They describe what
//! they need as a [`QueryPlan`] (search) or a [`FacetRequest`] (schema and
//! dashboard) and hand it to a [`LogStore`]. A facet request is answered in one
//! round trip: every branch is computed from the same scoped snapshot.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::criteria::QueryPlan;
use crate::error::{Error, StoreError};
use crate::types::{App, Id, ParsedLog, Period, TimeRange};

// ---------------------------------------------------------------------------
// Capability surface
// ---------------------------------------------------------------------------

#[async_trait]
pub trait LogStore: Send + Sync {
    /// Insert a batch in order. All-or-nothing: on error nothing is stored.
    async fn insert_logs(&self, logs: Vec<ParsedLog>) -> Result<usize, StoreError>;

    /// Execute a compiled plan honouring its stage order.
    async fn find_logs(&self, plan: &QueryPlan) -> Result<Vec<ParsedLog>, StoreError>;

    /// Apps whose `owner_id` is `owner_id`.
    async fn apps_owned_by(&self, owner_id: Id) -> Result<Vec<App>, StoreError>;

    /// Join logs to their owning app, restrict to `request.scope`, and compute
    /// every facet over that one matched set.
    async fn aggregate(&self, request: &FacetRequest) -> Result<FacetResult, StoreError>;
}

/// Await a store call unless `cancel` fires first. On cancellation the store
/// future is dropped, releasing whatever it held, and [`Error::Cancelled`] is
/// returned in place of any partial result.
pub async fn guarded<T, F>(cancel: &CancellationToken, call: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, StoreError>>,
{
    if cancel.is_cancelled() {
        tracing::warn!("store call skipped: request already cancelled");
        return Err(Error::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::warn!("store call cancelled");
            Err(Error::Cancelled)
        }
        result = call => result.map_err(Error::from),
    }
}

// ---------------------------------------------------------------------------
// Facets
// ---------------------------------------------------------------------------

/// Which logs an aggregation sees. A non-empty `app_ids` selects exactly those
/// apps; otherwise logs are restricted to apps owned by `owner_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub owner_id: Id,
    pub app_ids: Vec<Id>,
    pub range: Option<TimeRange>,
}

impl Scope {
    pub fn owner(owner_id: Id) -> Self {
        Self {
            owner_id,
            app_ids: Vec::new(),
            range: None,
        }
    }

    pub fn apps(mut self, app_ids: Vec<Id>) -> Self {
        self.app_ids = app_ids;
        self
    }

    pub fn within(mut self, range: Option<TimeRange>) -> Self {
        self.range = range;
        self
    }

    /// Whether a log, already joined to `app`, falls in this scope.
    pub fn admits(&self, log: &ParsedLog, app: &App) -> bool {
        let in_scope = if self.app_ids.is_empty() {
            app.owner_id == self.owner_id
        } else {
            self.app_ids.contains(&log.app_id)
        };
        in_scope
            && self.range.map_or(true, |r| r.contains(log.timestamp))
    }
}

/// Computed grouping key of a facet branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    /// The log's `level` string.
    Level,
    /// The owning app (id and name).
    App,
    /// `(year, month)` of the log's timestamp.
    YearMonth,
    /// Each two-level flattened path of the log's `data`, once per document.
    FlattenedPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacetKind {
    Count,
    GroupBy(GroupKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    pub name: String,
    pub kind: FacetKind,
}

impl Facet {
    pub fn count(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FacetKind::Count,
        }
    }

    pub fn group_by(name: impl Into<String>, key: GroupKey) -> Self {
        Self {
            name: name.into(),
            kind: FacetKind::GroupBy(key),
        }
    }
}

/// A multi-branch aggregation over one scoped log set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetRequest {
    pub scope: Scope,
    pub facets: Vec<Facet>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupValue {
    Text(String),
    App { id: Id, name: String },
    Period(Period),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: GroupValue,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetOutput {
    Count(u64),
    Groups(Vec<Group>),
}

/// Branch outputs keyed by facet name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FacetResult {
    branches: BTreeMap<String, FacetOutput>,
}

impl FacetResult {
    pub fn insert(&mut self, name: impl Into<String>, output: FacetOutput) {
        self.branches.insert(name.into(), output);
    }

    /// Count of a `Count` branch; zero when the branch is missing.
    pub fn count(&self, name: &str) -> u64 {
        match self.branches.get(name) {
            Some(FacetOutput::Count(n)) => *n,
            _ => 0,
        }
    }

    /// Groups of a `GroupBy` branch; empty when the branch is missing.
    pub fn groups(&self, name: &str) -> &[Group] {
        match self.branches.get(name) {
            Some(FacetOutput::Groups(groups)) => groups,
            _ => &[],
        }
    }
}
