//! Intermediate storage for per-source listing batches.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::error::BufferError;
use crate::models::{Listing, Origin};

/// Where a written batch ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLocation(pub String);

/// Read/write/list access to listing batches, keyed by source.
#[async_trait]
pub trait BufferStore: Send + Sync {
    async fn write_batch(&self, origin: Origin, listings: &[Listing]) -> Result<BatchLocation, BufferError>;

    /// Every stored batch, in a stable order.
    async fn read_all(&self) -> Result<Vec<Vec<Listing>>, BufferError>;

    async fn list(&self, origin: Origin) -> Result<Vec<BatchLocation>, BufferError>;

    async fn clear(&self) -> Result<(), BufferError>;

    /// Drops every batch of one source, leaving the others alone.
    async fn clear_source(&self, origin: Origin) -> Result<(), BufferError>;
}

/// Batches as JSON files under `<root>/<source-key>/`.
pub struct FsBufferStore {
    root: PathBuf,
    sequence: AtomicU64,
}

impl FsBufferStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All `.json` files below `dir`, depth first, sorted by path.
    async fn json_files(dir: &Path) -> Result<Vec<PathBuf>, BufferError> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| BufferError::io(&dir, e))?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| BufferError::io(&dir, e))? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| BufferError::io(&path, e))?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if path.extension().is_some_and(|ext| ext == "json") {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl BufferStore for FsBufferStore {
    async fn write_batch(&self, origin: Origin, listings: &[Listing]) -> Result<BatchLocation, BufferError> {
        let dir = self.root.join(origin.key());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| BufferError::io(&dir, e))?;

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let path = dir.join(format!(
            "{}-{}-{:04}.json",
            origin.key(),
            Utc::now().timestamp_millis(),
            sequence
        ));

        let json = serde_json::to_string(listings).map_err(|e| BufferError::json(&path, e))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| BufferError::io(&path, e))?;

        debug!("Wrote {} listings to {}", listings.len(), path.display());
        Ok(BatchLocation(path.display().to_string()))
    }

    async fn read_all(&self) -> Result<Vec<Vec<Listing>>, BufferError> {
        if !tokio::fs::try_exists(&self.root)
            .await
            .map_err(|e| BufferError::io(&self.root, e))?
        {
            return Ok(Vec::new());
        }

        let mut batches = Vec::new();
        for path in Self::json_files(&self.root).await? {
            let json = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| BufferError::io(&path, e))?;
            let batch: Vec<Listing> = serde_json::from_str(&json).map_err(|e| BufferError::json(&path, e))?;
            debug!("Read {} listings from {}", batch.len(), path.display());
            batches.push(batch);
        }
        Ok(batches)
    }

    async fn list(&self, origin: Origin) -> Result<Vec<BatchLocation>, BufferError> {
        let dir = self.root.join(origin.key());
        if !tokio::fs::try_exists(&dir).await.map_err(|e| BufferError::io(&dir, e))? {
            return Ok(Vec::new());
        }

        Ok(Self::json_files(&dir)
            .await?
            .into_iter()
            .map(|path| BatchLocation(path.display().to_string()))
            .collect())
    }

    async fn clear(&self) -> Result<(), BufferError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(BufferError::io(&self.root, e)),
        }
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| BufferError::io(&self.root, e))
    }

    async fn clear_source(&self, origin: Origin) -> Result<(), BufferError> {
        let dir = self.root.join(origin.key());
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!("Removed {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BufferError::io(&dir, e)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_listing;

    #[tokio::test]
    async fn batches_round_trip_per_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBufferStore::new(dir.path().join("buffer"));
        let olx = vec![sample_listing("https://olx/1", 1500, 40, Origin::Olx)];
        let vr = vec![
            sample_listing("https://vr/1", 1400, 50, Origin::VivaReal),
            sample_listing("https://vr/2", 1600, 60, Origin::VivaReal),
        ];

        store.write_batch(Origin::Olx, &olx).await.unwrap();
        store.write_batch(Origin::VivaReal, &vr).await.unwrap();
        store.write_batch(Origin::VivaReal, &[]).await.unwrap();

        assert_eq!(store.list(Origin::VivaReal).await.unwrap().len(), 2);
        assert!(store.list(Origin::NetImoveis).await.unwrap().is_empty());

        let batches = store.read_all().await.unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), 3);
        assert!(batches.contains(&olx));

        store.clear().await.unwrap();
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clearing_one_source_keeps_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBufferStore::new(dir.path());
        let olx = vec![sample_listing("https://olx/1", 1500, 40, Origin::Olx)];
        let vr = vec![sample_listing("https://vr/1", 1400, 50, Origin::VivaReal)];
        store.write_batch(Origin::Olx, &olx).await.unwrap();
        store.write_batch(Origin::Olx, &olx).await.unwrap();
        store.write_batch(Origin::VivaReal, &vr).await.unwrap();

        store.clear_source(Origin::Olx).await.unwrap();
        store.clear_source(Origin::NetImoveis).await.unwrap();

        assert!(store.list(Origin::Olx).await.unwrap().is_empty());
        assert_eq!(store.read_all().await.unwrap(), vec![vr]);
    }

    #[tokio::test]
    async fn nested_groupings_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let nested = root.join("olx").join("zona-leste");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        let batch = vec![sample_listing("https://olx/9", 1500, 40, Origin::Olx)];
        tokio::fs::write(nested.join("olx-1.json"), serde_json::to_string(&batch).unwrap())
            .await
            .unwrap();
        tokio::fs::write(root.join("notes.txt"), "ignored").await.unwrap();

        let store = FsBufferStore::new(root);
        let batches = store.read_all().await.unwrap();

        assert_eq!(batches, vec![batch]);
    }

    #[tokio::test]
    async fn malformed_batch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("broken.json"), "[{").await.unwrap();

        let result = FsBufferStore::new(dir.path()).read_all().await;

        assert!(matches!(result, Err(BufferError::Json { .. })));
    }

    #[tokio::test]
    async fn missing_root_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBufferStore::new(dir.path().join("missing"));

        assert!(store.read_all().await.unwrap().is_empty());
    }
}
