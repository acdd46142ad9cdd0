//! Schema inference: which field paths appear in a scoped set of logs, and
//! how often.
//!
//! Paths are produced by [`flatten_paths`], which looks at most two levels
//! into a document's `data`. A top-level key holding an object yields one
//! `"key.sub"` path per nested key; any other top-level value yields the bare
//! `"key"`. Nothing below the second level is inspected.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::store::{guarded, Facet, FacetRequest, GroupKey, GroupValue, LogStore, Scope};
use crate::types::{AttributeTree, Id, TimeRange};

const TOTAL: &str = "total";
const PATHS: &str = "schema";

/// Distinct two-level paths of one document. Non-object data has no paths.
pub fn flatten_paths(data: &AttributeTree) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    let Some(top) = data.as_object() else {
        return paths;
    };
    for (key, value) in top {
        match value {
            AttributeTree::Object(nested) => {
                for sub in nested.keys() {
                    paths.insert(format!("{key}.{sub}"));
                }
            }
            _ => {
                paths.insert(key.clone());
            }
        }
    }
    paths
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SchemaReport {
    pub total: u64,
    pub schema: BTreeMap<String, u64>,
}

/// Schema query as received at the request boundary. Identifiers are still
/// strings here; [`SchemaEngine::infer_schema`] validates them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaQuery {
    pub owner_id: String,
    #[serde(default)]
    pub app_ids: Vec<String>,
    #[serde(default)]
    pub range: Option<TimeRange>,
}

pub struct SchemaEngine {
    store: Arc<dyn LogStore>,
}

impl SchemaEngine {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Count matched documents and, per flattened path, the documents that
    /// carry it. The store answers both in one faceted call.
    pub async fn infer_schema(
        &self,
        query: &SchemaQuery,
        cancel: &CancellationToken,
    ) -> Result<SchemaReport, Error> {
        let owner_id = Id::parse(&query.owner_id)?;
        let app_ids = Id::parse_all(&query.app_ids)?;

        let request = FacetRequest {
            scope: Scope::owner(owner_id).apps(app_ids).within(query.range),
            facets: vec![
                Facet::count(TOTAL),
                Facet::group_by(PATHS, GroupKey::FlattenedPath),
            ],
        };
        let result = guarded(cancel, self.store.aggregate(&request)).await?;

        let schema = result
            .groups(PATHS)
            .iter()
            .filter_map(|g| match &g.key {
                GroupValue::Text(path) => Some((path.clone(), g.count)),
                _ => None,
            })
            .collect();
        let report = SchemaReport {
            total: result.count(TOTAL),
            schema,
        };
        tracing::debug!(owner_id = %owner_id, total = report.total, paths = report.schema.len(), "schema inferred");
        Ok(report)
    }
}
