//! A local analytics session: one in-memory store, one owner, one app per
//! loaded source. This is what the `logmill` binary drives.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use logmill_core::clock::{Clock, SystemClock};
use logmill_core::config::Config;
use logmill_core::dashboard::{DashboardEngine, DashboardOverview, DashboardQuery};
use logmill_core::ingest::{IngestAck, Ingestor};
use logmill_core::normalizer::LogFormat;
use logmill_core::schema::{SchemaEngine, SchemaQuery, SchemaReport};
use logmill_core::search::{LogSearch, SearchRequest};
use logmill_core::store::MemoryStore;
use logmill_core::{App, Error, Id, ParsedLog, TimeRange};
use logmill_feeds::LineFeed;

/// Lines handed to the ingestor per call while draining a feed.
const LOAD_BATCH: usize = 4096;

pub struct Session {
    owner_id: Id,
    store: Arc<MemoryStore>,
    apps: BTreeMap<String, Id>,
    ingestor: Ingestor,
    schema: SchemaEngine,
    dashboard: DashboardEngine,
    search: LogSearch,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            owner_id: Id::new(),
            ingestor: Ingestor::new(store.clone(), clock, config.ingest.clone()),
            schema: SchemaEngine::new(store.clone()),
            dashboard: DashboardEngine::new(store.clone()),
            search: LogSearch::new(store.clone(), config.query.same_field_filters),
            apps: BTreeMap::new(),
            store,
        }
    }

    pub fn owner_id(&self) -> Id {
        self.owner_id
    }

    /// Id of the app registered for source `name`, if loaded.
    pub fn app_id(&self, name: &str) -> Option<Id> {
        self.apps.get(name).copied()
    }

    /// Register an app named after the feed and ingest everything it yields.
    pub async fn load(
        &mut self,
        feed: &mut dyn LineFeed,
        format: Option<LogFormat>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<IngestAck> {
        let name = feed.name().to_string();
        let app_id = match self.apps.get(&name) {
            Some(id) => *id,
            None => {
                let app = App::new(name.clone(), self.owner_id);
                let id = app.id;
                self.store.register_app(app).await;
                self.apps.insert(name.clone(), id);
                id
            }
        };

        let mut total = IngestAck::default();
        while let Some(lines) = feed.next_batch(LOAD_BATCH).await? {
            let ack = self
                .ingestor
                .ingest_lines(&app_id.to_string(), lines, format, cancel)
                .await?;
            total.stored += ack.stored;
            total.parse_failures += ack.parse_failures;
        }
        tracing::info!(source = %name, stored = total.stored, parse_failures = total.parse_failures, "source loaded");
        Ok(total)
    }

    pub async fn schema(
        &self,
        apps: &[String],
        range: Option<TimeRange>,
        cancel: &CancellationToken,
    ) -> Result<SchemaReport, Error> {
        let query = SchemaQuery {
            owner_id: self.owner_id.to_string(),
            app_ids: apps.iter().map(|name| self.app_ref(name)).collect(),
            range,
        };
        self.schema.infer_schema(&query, cancel).await
    }

    pub async fn dashboard(
        &self,
        range: Option<TimeRange>,
        cancel: &CancellationToken,
    ) -> Result<DashboardOverview, Error> {
        let query = DashboardQuery {
            owner_id: self.owner_id.to_string(),
            from: range.map(|r| r.from),
            to: range.map(|r| r.to),
        };
        self.dashboard.overview_kpis(&query, cancel).await
    }

    /// Run a search as the session owner. `request.app_id` may name a loaded
    /// source instead of carrying an id.
    pub async fn search(
        &self,
        mut request: SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<ParsedLog>, Error> {
        request.owner_id = self.owner_id.to_string();
        if !request.app_id.is_empty() {
            request.app_id = self.app_ref(&request.app_id);
        }
        self.search.search(&request, cancel).await
    }

    /// Source name to app id; anything else passes through for the engines to
    /// validate.
    fn app_ref(&self, name: &str) -> String {
        self.app_id(name)
            .map(|id| id.to_string())
            .unwrap_or_else(|| name.to_string())
    }
}
