//! Write side of the disk cache transaction protocol

use super::{DiskCache, Snapshot};
use crate::error::{InternalError, Result, at_path};
use crate::key::CacheKey;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Exclusive write handle for one key
///
/// Data is staged in a private temp file. [`Editor::commit`] publishes it
/// atomically; [`Editor::abort`] (or dropping the editor) discards it and
/// releases the key.
pub struct Editor {
    cache: DiskCache,
    key: CacheKey,
    temp_path: PathBuf,
    file: Option<File>,
    written: u64,
    finished: bool,
}

impl Editor {
    pub(super) fn new(cache: DiskCache, key: CacheKey, temp_path: PathBuf) -> Self {
        Self {
            cache,
            key,
            temp_path,
            file: None,
            written: 0,
            finished: false,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Bytes staged so far
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append a buffer to the staged payload
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let file = self.staging_file().await?;
        file.write_all(data)
            .await
            .map_err(at_path(&self.temp_path))?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Drain a byte stream into the staged payload
    ///
    /// Stops at the first stream or write error; the caller is expected to
    /// abort the editor afterwards.
    pub async fn write_stream<S>(&mut self, mut stream: S) -> Result<u64>
    where
        S: Stream<Item = Result<Bytes>> + Unpin,
    {
        let start = self.written;
        while let Some(chunk) = stream.next().await {
            self.write_all(&chunk?).await?;
        }
        Ok(self.written - start)
    }

    /// Publish the staged payload and return a snapshot of it
    ///
    /// On failure the editor is dropped, which aborts it.
    pub async fn commit(mut self) -> Result<Snapshot> {
        let mut file = match self.file.take() {
            Some(file) => file,
            // Nothing written yet: publish an empty blob
            None => File::create(&self.temp_path)
                .await
                .map_err(at_path(&self.temp_path))?,
        };
        file.flush().await.map_err(at_path(&self.temp_path))?;
        file.sync_all().await.map_err(at_path(&self.temp_path))?;
        drop(file);

        let snapshot = self
            .cache
            .publish(&self.key, &self.temp_path, self.written)
            .await?;
        self.finished = true;
        Ok(snapshot)
    }

    /// Discard the staged payload and release the key
    pub fn abort(mut self) {
        self.discard();
    }

    async fn staging_file(&mut self) -> Result<&mut File> {
        if self.file.is_none() {
            let file = File::create(&self.temp_path)
                .await
                .map_err(at_path(&self.temp_path))?;
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| InternalError::assertion("staging file missing after create").into())
    }

    fn discard(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.file.take();

        if let Err(e) = std::fs::remove_file(&self.temp_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::warn!(
                "Failed to remove staged file {}: {e}",
                self.temp_path.display()
            );
        }
        self.cache.release_editor(&self.key);
        log::trace!("Aborted editor for {}", self.key);
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.discard();
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("key", &self.key)
            .field("written", &self.written)
            .finish()
    }
}
