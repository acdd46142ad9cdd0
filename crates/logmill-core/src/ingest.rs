//! Ingestor — turns a batch of raw lines (or pre-structured documents) into
//! [`ParsedLog`]s and writes them to the store in one call.
//!
//! Parsing is per line and never fails the batch: a line that does not fit
//! its format is stored with `data: None` and its raw text intact. Large
//! batches are parsed on the blocking pool in chunks of
//! `ingest.parallel_chunk_size`; the chunks are joined back in input order
//! before the single insert. A store failure aborts the whole batch.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::config::IngestConfig;
use crate::error::{Error, ParseError};
use crate::normalizer::{self, LogFormat};
use crate::store::{guarded, LogStore};
use crate::types::{AttributeTree, Id, ParsedLog};

/// Acknowledgement of a stored batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAck {
    /// Records written, including those whose line did not parse.
    pub stored: usize,
    pub parse_failures: usize,
}

type Parsed = (String, Result<AttributeTree, ParseError>);

pub struct Ingestor {
    store: Arc<dyn LogStore>,
    clock: Arc<dyn Clock>,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(store: Arc<dyn LogStore>, clock: Arc<dyn Clock>, config: IngestConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Parse `lines` with one format for the whole batch and store them in
    /// order. `None` uses the configured default format.
    pub async fn ingest_lines(
        &self,
        app_id: &str,
        lines: Vec<String>,
        format: Option<LogFormat>,
        cancel: &CancellationToken,
    ) -> Result<IngestAck, Error> {
        let app_id = Id::parse(app_id)?;
        let format = format.unwrap_or(self.config.default_format);
        let count = lines.len();

        let parsed = self.parse_batch(lines, format, cancel).await?;

        let now = self.clock.now();
        let mut parse_failures = 0;
        let logs: Vec<ParsedLog> = parsed
            .into_iter()
            .map(|(raw, result)| {
                let data = match result {
                    Ok(tree) => Some(tree),
                    Err(e) => {
                        parse_failures += 1;
                        tracing::debug!(app_id = %app_id, format = %format, error = %e, "line kept unparsed");
                        None
                    }
                };
                let level = data.as_ref().map(normalizer::derive_level).unwrap_or_default();
                ParsedLog {
                    id: Id::new(),
                    app_id,
                    timestamp: now,
                    data,
                    raw,
                    level,
                }
            })
            .collect();

        let stored = guarded(cancel, self.store.insert_logs(logs)).await?;
        tracing::info!(app_id = %app_id, format = %format, lines = count, parse_failures, "batch ingested");
        Ok(IngestAck {
            stored,
            parse_failures,
        })
    }

    /// Store documents that arrive already structured. `raw` is their compact
    /// JSON serialisation.
    pub async fn ingest_documents(
        &self,
        app_id: &str,
        documents: Vec<AttributeTree>,
        cancel: &CancellationToken,
    ) -> Result<IngestAck, Error> {
        let app_id = Id::parse(app_id)?;
        let now = self.clock.now();
        let logs: Vec<ParsedLog> = documents
            .into_iter()
            .map(|doc| ParsedLog {
                id: Id::new(),
                app_id,
                timestamp: now,
                raw: serde_json::Value::from(doc.clone()).to_string(),
                level: normalizer::derive_level(&doc),
                data: Some(doc),
            })
            .collect();

        let stored = guarded(cancel, self.store.insert_logs(logs)).await?;
        tracing::info!(app_id = %app_id, documents = stored, "documents ingested");
        Ok(IngestAck {
            stored,
            parse_failures: 0,
        })
    }

    async fn parse_batch(
        &self,
        lines: Vec<String>,
        format: LogFormat,
        cancel: &CancellationToken,
    ) -> Result<Vec<Parsed>, Error> {
        let chunk_size = self.config.parallel_chunk_size.max(1);
        if lines.len() <= chunk_size {
            return Ok(parse_lines(lines, format));
        }

        let mut handles = Vec::with_capacity(lines.len().div_ceil(chunk_size));
        let mut rest = lines;
        while !rest.is_empty() {
            let tail = rest.split_off(rest.len().min(chunk_size));
            let chunk = std::mem::replace(&mut rest, tail);
            handles.push(tokio::task::spawn_blocking(move || parse_lines(chunk, format)));
        }
        tracing::debug!(chunks = handles.len(), chunk_size, "parsing batch in parallel");

        let mut parsed = Vec::new();
        let mut pending = handles.into_iter();
        while let Some(mut handle) = pending.next() {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                joined = &mut handle => Some(joined),
            };
            match joined {
                Some(Ok(chunk)) => parsed.extend(chunk),
                Some(Err(e)) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Some(Err(_)) => return Err(Error::Cancelled),
                None => {
                    // Chunks not yet picked up by the blocking pool never start.
                    handle.abort();
                    pending.by_ref().for_each(|h| h.abort());
                    tracing::warn!("ingestion cancelled while parsing");
                    return Err(Error::Cancelled);
                }
            }
        }
        Ok(parsed)
    }
}

fn parse_lines(lines: Vec<String>, format: LogFormat) -> Vec<Parsed> {
    lines
        .into_iter()
        .map(|line| {
            let result = normalizer::parse(&line, format);
            (line, result)
        })
        .collect()
}
