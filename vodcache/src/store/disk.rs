//! On-disk chunk store.
//!
//! Layout: one directory per object under the store root, holding a
//! `meta.json` record and zero-padded `NNNNNNNN.chunk` files:
//!
//! ```text
//! <root>/
//!   vid_1700000000/
//!     meta.json
//!     00000000.chunk
//!     00000001.chunk
//! ```
//!
//! Every write lands in a `.tmp` sibling first and is renamed into place, so
//! a crash mid-write never leaves a truncated chunk or metadata record
//! visible under its final name.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::meta::ObjectMeta;
use super::traits::{BoxFuture, ChunkStore, StoreError};

const META_FILE: &str = "meta.json";
const CHUNK_EXT: &str = "chunk";

/// Filesystem-backed `ChunkStore` implementation.
#[derive(Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open a disk store rooted at `root`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Total bytes and file count across all objects. Used by CLI stats.
    pub async fn disk_usage(&self) -> Result<(u64, u64), StoreError> {
        let mut files = 0u64;
        let mut bytes = 0u64;
        let mut dirs = fs::read_dir(&self.root).await?;
        while let Some(dir) = dirs.next_entry().await? {
            if !dir.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = fs::read_dir(dir.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                if metadata.is_file() {
                    files += 1;
                    bytes += metadata.len();
                }
            }
        }
        Ok((files, bytes))
    }

    fn object_dir(&self, object_id: &str) -> Result<PathBuf, StoreError> {
        if object_id.is_empty()
            || !object_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            || object_id.starts_with('.')
        {
            return Err(StoreError::Corrupt {
                object_id: object_id.to_string(),
                reason: "object id is not a valid storage key".to_string(),
            });
        }
        Ok(self.root.join(object_id))
    }

    fn chunk_path(dir: &Path, index: u32) -> PathBuf {
        dir.join(format!("{index:08}.{CHUNK_EXT}"))
    }

    /// Write `data` to `path` atomically via a `.tmp` sibling.
    ///
    /// The tmp file is fsynced before the rename, so once the final name is
    /// visible its contents are on stable storage.
    async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_meta(dir: &Path, object_id: &str) -> Result<Option<ObjectMeta>, StoreError> {
        match fs::read(dir.join(META_FILE)).await {
            Ok(raw) => {
                let meta =
                    serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupt {
                        object_id: object_id.to_string(),
                        reason: e.to_string(),
                    })?;
                Ok(Some(meta))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl ChunkStore for DiskStore {
    fn put_chunk(
        &self,
        object_id: &str,
        index: u32,
        data: Bytes,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        let dir = self.object_dir(object_id);
        Box::pin(async move {
            let dir = dir?;
            fs::create_dir_all(&dir).await?;
            let path = Self::chunk_path(&dir, index);
            Self::write_atomic(&path, &data).await?;
            debug!(path = %path.display(), len = data.len(), "chunk persisted");
            Ok(())
        })
    }

    fn get_chunk(
        &self,
        object_id: &str,
        index: u32,
    ) -> BoxFuture<'_, Result<Option<Bytes>, StoreError>> {
        let dir = self.object_dir(object_id);
        Box::pin(async move {
            let path = Self::chunk_path(&dir?, index);
            match fs::read(&path).await {
                Ok(data) => Ok(Some(Bytes::from(data))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn put_meta(&self, meta: ObjectMeta) -> BoxFuture<'_, Result<(), StoreError>> {
        let dir = self.object_dir(&meta.id);
        Box::pin(async move {
            let dir = dir?;
            fs::create_dir_all(&dir).await?;
            let raw = serde_json::to_vec_pretty(&meta).map_err(|e| StoreError::Corrupt {
                object_id: meta.id.clone(),
                reason: e.to_string(),
            })?;
            Self::write_atomic(&dir.join(META_FILE), &raw).await
        })
    }

    fn get_meta(&self, object_id: &str) -> BoxFuture<'_, Result<Option<ObjectMeta>, StoreError>> {
        let object_id = object_id.to_string();
        let dir = self.object_dir(&object_id);
        Box::pin(async move { Self::read_meta(&dir?, &object_id).await })
    }

    fn update_progress(
        &self,
        object_id: &str,
        bytes_downloaded: u64,
        total_size: Option<u64>,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        let object_id = object_id.to_string();
        let dir = self.object_dir(&object_id);
        Box::pin(async move {
            let dir = dir?;
            let Some(mut meta) = Self::read_meta(&dir, &object_id).await? else {
                return Ok(());
            };
            meta.bytes_downloaded = bytes_downloaded;
            if let Some(total) = total_size {
                meta.total_size = total;
            }
            let raw = serde_json::to_vec_pretty(&meta).map_err(|e| StoreError::Corrupt {
                object_id: object_id.clone(),
                reason: e.to_string(),
            })?;
            Self::write_atomic(&dir.join(META_FILE), &raw).await
        })
    }

    fn delete_object(&self, object_id: &str) -> BoxFuture<'_, Result<(), StoreError>> {
        let dir = self.object_dir(object_id);
        Box::pin(async move {
            match fs::remove_dir_all(dir?).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn list_objects(&self) -> BoxFuture<'_, Result<Vec<ObjectMeta>, StoreError>> {
        Box::pin(async move {
            let mut metas = Vec::new();
            let mut dirs = fs::read_dir(&self.root).await?;
            while let Some(dir) = dirs.next_entry().await? {
                if !dir.file_type().await?.is_dir() {
                    continue;
                }
                let name = dir.file_name().to_string_lossy().into_owned();
                match Self::read_meta(&dir.path(), &name).await {
                    Ok(Some(meta)) => metas.push(meta),
                    Ok(None) => {}
                    Err(e) => {
                        // A corrupt record should not hide the rest of the store.
                        warn!(object_id = %name, error = %e, "skipping unreadable metadata");
                    }
                }
            }
            metas.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(metas)
        })
    }
}
