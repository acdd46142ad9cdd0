//! logmill-feeds — raw line sources for logmill.
//!
//! A feed yields batches of raw lines, in source order, for the ingestor to
//! parse. Feeds never interpret the lines they carry.

pub mod file;
pub mod reader;
pub mod stdin;

pub use file::FileFeed;
pub use reader::ReaderFeed;
pub use stdin::StdinFeed;

use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("cannot open {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("read failed")]
    Read {
        #[source]
        source: std::io::Error,
    },
}

/// A source of raw log lines.
#[async_trait]
pub trait LineFeed: Send {
    /// Human-readable source name (file path, `stdin`, ...).
    fn name(&self) -> &str;

    /// Up to `max` lines, or `None` once the source is exhausted. A returned
    /// batch is never empty.
    async fn next_batch(&mut self, max: usize) -> Result<Option<Vec<String>>, FeedError>;

    /// Drain the feed into one vector.
    async fn read_all(&mut self) -> Result<Vec<String>, FeedError> {
        let mut lines = Vec::new();
        while let Some(batch) = self.next_batch(usize::MAX).await? {
            lines.extend(batch);
        }
        Ok(lines)
    }
}
