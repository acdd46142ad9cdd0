//! Test builders — ergonomic constructors for logs, apps and seeded stores.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use chrono::{DateTime, TimeZone, Utc};
use logmill_core::clock::FixedClock;
use logmill_core::config::Config;
use logmill_core::ingest::Ingestor;
use logmill_core::store::MemoryStore;
use logmill_core::{App, AttributeTree, Id, ParsedLog};
use std::sync::Arc;

/// Midnight UTC on the given day.
pub fn day(year: i32, month: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, d, 0, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// ParsedLogBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`ParsedLog`] fixtures.
///
/// ```rust
/// let log = ParsedLogBuilder::new(app.id)
///     .level("ERROR")
///     .at(day(2024, 1, 15))
///     .data(serde_json::json!({"user": "alice"}))
///     .build();
/// ```
pub struct ParsedLogBuilder {
    app_id: Id,
    timestamp: DateTime<Utc>,
    data: Option<AttributeTree>,
    raw: Option<String>,
    level: String,
}

impl ParsedLogBuilder {
    pub fn new(app_id: Id) -> Self {
        Self {
            app_id,
            timestamp: day(2024, 1, 15),
            data: None,
            raw: None,
            level: String::new(),
        }
    }

    pub fn level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn raw(mut self, raw: &str) -> Self {
        self.raw = Some(raw.to_string());
        self
    }

    pub fn build(self) -> ParsedLog {
        let raw = self.raw.unwrap_or_else(|| match &self.data {
            Some(d) => serde_json::Value::from(d.clone()).to_string(),
            None => String::new(),
        });
        ParsedLog {
            id: Id::new(),
            app_id: self.app_id,
            timestamp: self.timestamp,
            data: self.data,
            raw,
            level: self.level,
        }
    }
}

// ---------------------------------------------------------------------------
// Seeded store
// ---------------------------------------------------------------------------

/// An in-memory store with one owner and the apps registered so far.
pub struct Seeded {
    pub store: Arc<MemoryStore>,
    pub owner: Id,
    pub apps: Vec<App>,
}

impl Seeded {
    pub async fn new(app_names: &[&str]) -> Self {
        let store = Arc::new(MemoryStore::new());
        let owner = Id::new();
        let mut apps = Vec::new();
        for name in app_names {
            let app = App::new(*name, owner);
            store.register_app(app.clone()).await;
            apps.push(app);
        }
        Self { store, owner, apps }
    }

    pub fn app(&self, name: &str) -> &App {
        self.apps
            .iter()
            .find(|a| a.name == name)
            .unwrap_or_else(|| panic!("no app named {name:?} in fixture"))
    }

    /// Register an app owned by somebody else.
    pub async fn foreign_app(&self, name: &str) -> App {
        let app = App::new(name, Id::new());
        self.store.register_app(app.clone()).await;
        app
    }

    pub async fn insert(&self, logs: Vec<ParsedLog>) {
        use logmill_core::store::LogStore;
        self.store.insert_logs(logs).await.unwrap();
    }

    /// An ingestor over this store whose clock is pinned to `now`.
    pub fn ingestor_at(&self, now: DateTime<Utc>) -> Ingestor {
        Ingestor::new(
            self.store.clone(),
            Arc::new(FixedClock(now)),
            Config::defaults().ingest,
        )
    }
}
