//! Feed over any buffered async reader.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{FeedError, LineFeed};

/// Splits a reader into lines. Bytes are UTF-8 lossy converted, so a bad
/// sequence only affects its own line. Trailing `\r` is stripped; blank lines
/// are skipped.
pub struct ReaderFeed<R> {
    name: String,
    reader: R,
    buf: Vec<u8>,
    done: bool,
}

impl<R: AsyncBufRead + Unpin + Send> ReaderFeed<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            buf: Vec::new(),
            done: false,
        }
    }

    /// Next raw line without its terminator, or `None` at EOF.
    async fn next_line(&mut self) -> Result<Option<String>, FeedError> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(|source| FeedError::Read { source })?;
        if read == 0 {
            return Ok(None);
        }
        let mut line: &[u8] = &self.buf;
        line = line.strip_suffix(b"\n").unwrap_or(line);
        line = line.strip_suffix(b"\r").unwrap_or(line);
        Ok(Some(String::from_utf8_lossy(line).into_owned()))
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LineFeed for ReaderFeed<R> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_batch(&mut self, max: usize) -> Result<Option<Vec<String>>, FeedError> {
        let mut batch = Vec::new();
        while !self.done && batch.len() < max.max(1) {
            match self.next_line().await? {
                Some(line) if !line.trim().is_empty() => batch.push(line),
                Some(_) => {}
                None => self.done = true,
            }
        }
        if batch.is_empty() {
            tracing::debug!(feed = %self.name, "feed exhausted");
            return Ok(None);
        }
        Ok(Some(batch))
    }
}
