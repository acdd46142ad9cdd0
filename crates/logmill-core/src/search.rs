//! Log search — turns a user-facing [`SearchRequest`] into a [`Criteria`],
//! compiles it, and runs the plan against the store.
//!
//! Results are always confined to the owner's apps: the plan carries an
//! `appId in [...]` filter listing either every owned app or the single
//! requested one.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::criteria::{compile_with, Composition, Criteria, Filter, Operator, SortOrder};
use crate::error::Error;
use crate::store::{guarded, LogStore};
use crate::types::{App, Id, ParsedLog};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchRequest {
    pub owner_id: String,
    /// 1-based; `0` is treated as the first page.
    pub page: u64,
    /// `0` returns every match.
    pub limit: u64,
    pub sort_order: String,
    pub search_term: String,
    pub log_level: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub app_id: String,
}

/// Build the criteria for `request` given the apps its owner holds.
///
/// `requested_app` must already be parsed; it must be one of `owned`.
pub fn criteria_for(
    request: &SearchRequest,
    owned: &[App],
    requested_app: Option<Id>,
) -> Result<Criteria, Error> {
    let mut criteria = Criteria::new();

    let term = request.search_term.trim();
    if !term.is_empty() {
        criteria = criteria.filter(Filter::new("raw", Operator::Like, term));
    }
    let level = request.log_level.trim();
    if !level.is_empty() {
        criteria = criteria.filter(Filter::new("level", Operator::Eq, level.to_ascii_uppercase()));
    }
    if let Some(from) = request.from {
        criteria = criteria.filter(Filter::new("timestamp", Operator::Gte, from));
    }
    if let Some(to) = request.to {
        criteria = criteria.filter(Filter::new("timestamp", Operator::Lte, to));
    }

    let app_ids: Vec<Id> = match requested_app {
        Some(id) if owned.iter().any(|a| a.id == id) => vec![id],
        Some(id) => {
            return Err(Error::AppNotOwned {
                app_id: id.to_string(),
            })
        }
        None => owned.iter().map(|a| a.id).collect(),
    };
    criteria = criteria.filter(Filter::new("appId", Operator::In, app_ids));

    // Pages past the addressable range land beyond the last match.
    let offset = request.page.saturating_sub(1).saturating_mul(request.limit);
    Ok(criteria
        .paginate(request.limit, offset)
        .sort("timestamp", SortOrder::from_tag(&request.sort_order)))
}

pub struct LogSearch {
    store: Arc<dyn LogStore>,
    composition: Composition,
}

impl LogSearch {
    pub fn new(store: Arc<dyn LogStore>, composition: Composition) -> Self {
        Self { store, composition }
    }

    pub async fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<ParsedLog>, Error> {
        let owner_id = Id::parse(&request.owner_id)?;
        let requested_app = match request.app_id.trim() {
            "" => None,
            id => Some(Id::parse(id)?),
        };

        let owned = guarded(cancel, self.store.apps_owned_by(owner_id)).await?;
        let criteria = criteria_for(request, &owned, requested_app)?;
        let plan = compile_with(&criteria, self.composition)?;

        let logs = guarded(cancel, self.store.find_logs(&plan)).await?;
        tracing::debug!(owner_id = %owner_id, stages = ?plan.stage_names(), hits = logs.len(), "search executed");
        Ok(logs)
    }
}
