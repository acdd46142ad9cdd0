//! In-memory [`LogStore`]: a vector of logs plus an app table, behind one
//! `RwLock`. Every aggregate runs under a single read guard, so concurrent
//! inserts can never skew one facet against another.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{
    FacetKind, FacetOutput, FacetRequest, FacetResult, Group, GroupKey, GroupValue, LogStore,
};
use crate::criteria::memory::MemoryPlanner;
use crate::criteria::QueryPlan;
use crate::error::StoreError;
use crate::schema::flatten_paths;
use crate::types::{App, Id, ParsedLog, Period};

#[derive(Debug, Default)]
struct Inner {
    logs: Vec<ParsedLog>,
    apps: HashMap<Id, App>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an app. App management proper lives outside this crate.
    pub async fn register_app(&self, app: App) {
        self.inner.write().await.apps.insert(app.id, app);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.logs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every stored log in insertion order.
    pub async fn snapshot(&self) -> Vec<ParsedLog> {
        self.inner.read().await.logs.clone()
    }

    /// Simulate an outage: while offline every call fails with
    /// [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::unavailable("in-memory store is offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn insert_logs(&self, logs: Vec<ParsedLog>) -> Result<usize, StoreError> {
        self.check_online()?;
        let n = logs.len();
        self.inner.write().await.logs.extend(logs);
        Ok(n)
    }

    async fn find_logs(&self, plan: &QueryPlan) -> Result<Vec<ParsedLog>, StoreError> {
        self.check_online()?;
        let executable = plan.accept(MemoryPlanner::new());
        let inner = self.inner.read().await;
        Ok(executable.execute(inner.logs.iter()))
    }

    async fn apps_owned_by(&self, owner_id: Id) -> Result<Vec<App>, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().await;
        let mut apps: Vec<App> = inner
            .apps
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        apps.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(apps)
    }

    async fn aggregate(&self, request: &FacetRequest) -> Result<FacetResult, StoreError> {
        self.check_online()?;
        let inner = self.inner.read().await;

        let matched: Vec<(&ParsedLog, &App)> = inner
            .logs
            .iter()
            .filter_map(|log| inner.apps.get(&log.app_id).map(|app| (log, app)))
            .filter(|(log, app)| request.scope.admits(log, app))
            .collect();

        let mut result = FacetResult::default();
        for facet in &request.facets {
            let output = match facet.kind {
                FacetKind::Count => FacetOutput::Count(matched.len() as u64),
                FacetKind::GroupBy(key) => FacetOutput::Groups(group(&matched, key)),
            };
            result.insert(facet.name.clone(), output);
        }
        Ok(result)
    }
}

fn group(matched: &[(&ParsedLog, &App)], key: GroupKey) -> Vec<Group> {
    let mut counts: BTreeMap<GroupValue, u64> = BTreeMap::new();
    for (log, app) in matched {
        match key {
            GroupKey::Level => *counts.entry(GroupValue::Text(log.level.clone())).or_default() += 1,
            GroupKey::App => {
                *counts
                    .entry(GroupValue::App {
                        id: app.id,
                        name: app.name.clone(),
                    })
                    .or_default() += 1
            }
            GroupKey::YearMonth => {
                *counts
                    .entry(GroupValue::Period(Period::of(log.timestamp)))
                    .or_default() += 1
            }
            GroupKey::FlattenedPath => {
                if let Some(data) = &log.data {
                    for path in flatten_paths(data) {
                        *counts.entry(GroupValue::Text(path)).or_default() += 1;
                    }
                }
            }
        }
    }
    counts
        .into_iter()
        .map(|(key, count)| Group { key, count })
        .collect()
}
