//! Feed over a file on disk.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::BufReader;

use crate::{FeedError, LineFeed, ReaderFeed};

pub struct FileFeed {
    inner: ReaderFeed<BufReader<File>>,
}

impl FileFeed {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let file = File::open(path).await.map_err(|source| FeedError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "file feed opened");
        Ok(Self {
            inner: ReaderFeed::new(path.display().to_string(), BufReader::new(file)),
        })
    }
}

#[async_trait]
impl LineFeed for FileFeed {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn next_batch(&mut self, max: usize) -> Result<Option<Vec<String>>, FeedError> {
        self.inner.next_batch(max).await
    }
}
