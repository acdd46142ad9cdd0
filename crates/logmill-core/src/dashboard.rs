//! Dashboard KPIs: totals by level, by app and by calendar month for every
//! log an owner can see, computed in a single faceted store call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::store::{guarded, Facet, FacetRequest, GroupKey, GroupValue, LogStore, Scope};
use crate::types::{Id, Period, TimeRange};

// Facet branch names.
const TOTAL: &str = "totalCount";
const LEVELS: &str = "levelCounts";
const PER_APP: &str = "logsPerApp";
const PER_PERIOD: &str = "logsByPeriod";

pub const LEVEL_ERROR: &str = "ERROR";
pub const LEVEL_WARNING: &str = "WARNING";
pub const LEVEL_INFO: &str = "INFO";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Kpi {
    pub total: u64,
    pub percentage: f64,
}

impl Kpi {
    /// `count` as a share of `total`; zero when there is nothing to share.
    fn share(count: u64, total: u64) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / total as f64
        };
        Self {
            total: count,
            percentage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppTotal {
    pub app_name: String,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodTotal {
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub logs: Kpi,
    pub errors: Kpi,
    pub warnings: Kpi,
    pub info: Kpi,
    pub logs_per_app: BTreeMap<Id, AppTotal>,
    pub logs_by_period: BTreeMap<Period, PeriodTotal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardQuery {
    pub owner_id: String,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl DashboardQuery {
    pub fn range(&self) -> Option<TimeRange> {
        TimeRange::from_bounds(self.from, self.to)
    }
}

pub struct DashboardEngine {
    store: Arc<dyn LogStore>,
}

impl DashboardEngine {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    pub async fn overview_kpis(
        &self,
        query: &DashboardQuery,
        cancel: &CancellationToken,
    ) -> Result<DashboardOverview, Error> {
        let owner_id = Id::parse(&query.owner_id)?;

        let request = FacetRequest {
            scope: Scope::owner(owner_id).within(query.range()),
            facets: vec![
                Facet::count(TOTAL),
                Facet::group_by(LEVELS, GroupKey::Level),
                Facet::group_by(PER_APP, GroupKey::App),
                Facet::group_by(PER_PERIOD, GroupKey::YearMonth),
            ],
        };
        let result = guarded(cancel, self.store.aggregate(&request)).await?;

        let total = result.count(TOTAL);
        let level = |name: &str| {
            result
                .groups(LEVELS)
                .iter()
                .find(|g| matches!(&g.key, GroupValue::Text(l) if l == name))
                .map_or(0, |g| g.count)
        };

        let mut overview = DashboardOverview {
            // Any logs at all read as 100%.
            logs: Kpi {
                total,
                percentage: if total > 0 { 100.0 } else { 0.0 },
            },
            errors: Kpi::share(level(LEVEL_ERROR), total),
            warnings: Kpi::share(level(LEVEL_WARNING), total),
            info: Kpi::share(level(LEVEL_INFO), total),
            ..Default::default()
        };

        for group in result.groups(PER_APP) {
            if let GroupValue::App { id, name } = &group.key {
                overview.logs_per_app.insert(
                    *id,
                    AppTotal {
                        app_name: name.clone(),
                        total: group.count,
                    },
                );
            }
        }
        for group in result.groups(PER_PERIOD) {
            if let GroupValue::Period(period) = group.key {
                overview
                    .logs_by_period
                    .insert(period, PeriodTotal { total: group.count });
            }
        }

        tracing::debug!(owner_id = %owner_id, total, apps = overview.logs_per_app.len(), "dashboard computed");
        Ok(overview)
    }
}
