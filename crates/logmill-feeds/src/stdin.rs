//! Feed over the process's standard input.

use async_trait::async_trait;
use tokio::io::{BufReader, Stdin};

use crate::{FeedError, LineFeed, ReaderFeed};

pub struct StdinFeed {
    inner: ReaderFeed<BufReader<Stdin>>,
}

impl StdinFeed {
    pub fn new() -> Self {
        Self {
            inner: ReaderFeed::new("stdin", BufReader::new(tokio::io::stdin())),
        }
    }
}

impl Default for StdinFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineFeed for StdinFeed {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn next_batch(&mut self, max: usize) -> Result<Option<Vec<String>>, FeedError> {
        self.inner.next_batch(max).await
    }
}
