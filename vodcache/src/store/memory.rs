//! In-memory chunk store backed by dashmap.
//!
//! Used by tests and ephemeral setups. Dashmap gives lock-free reads in the
//! common case and shard-level locking on writes, which is plenty for the
//! store's access pattern (sequential chunk writes, fan-out reads).

use bytes::Bytes;
use dashmap::DashMap;

use super::meta::ObjectMeta;
use super::traits::{BoxFuture, ChunkStore, StoreError};

/// In-memory `ChunkStore` implementation.
#[derive(Default)]
pub struct MemoryStore {
    chunks: DashMap<(String, u32), Bytes>,
    metas: DashMap<String, ObjectMeta>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks currently stored across all objects.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of chunks stored for one object.
    pub fn chunk_count_for(&self, object_id: &str) -> usize {
        self.chunks
            .iter()
            .filter(|entry| entry.key().0 == object_id)
            .count()
    }
}

impl ChunkStore for MemoryStore {
    fn put_chunk(
        &self,
        object_id: &str,
        index: u32,
        data: Bytes,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        let key = (object_id.to_string(), index);
        Box::pin(async move {
            self.chunks.insert(key, data);
            Ok(())
        })
    }

    fn get_chunk(
        &self,
        object_id: &str,
        index: u32,
    ) -> BoxFuture<'_, Result<Option<Bytes>, StoreError>> {
        let key = (object_id.to_string(), index);
        Box::pin(async move { Ok(self.chunks.get(&key).map(|entry| entry.value().clone())) })
    }

    fn put_meta(&self, meta: ObjectMeta) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.metas.insert(meta.id.clone(), meta);
            Ok(())
        })
    }

    fn get_meta(&self, object_id: &str) -> BoxFuture<'_, Result<Option<ObjectMeta>, StoreError>> {
        let object_id = object_id.to_string();
        Box::pin(async move { Ok(self.metas.get(&object_id).map(|entry| entry.value().clone())) })
    }

    fn update_progress(
        &self,
        object_id: &str,
        bytes_downloaded: u64,
        total_size: Option<u64>,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        let object_id = object_id.to_string();
        Box::pin(async move {
            if let Some(mut entry) = self.metas.get_mut(&object_id) {
                entry.bytes_downloaded = bytes_downloaded;
                if let Some(total) = total_size {
                    entry.total_size = total;
                }
            }
            Ok(())
        })
    }

    fn delete_object(&self, object_id: &str) -> BoxFuture<'_, Result<(), StoreError>> {
        let object_id = object_id.to_string();
        Box::pin(async move {
            self.metas.remove(&object_id);
            self.chunks.retain(|(id, _), _| *id != object_id);
            Ok(())
        })
    }

    fn list_objects(&self) -> BoxFuture<'_, Result<Vec<ObjectMeta>, StoreError>> {
        Box::pin(async move {
            let mut metas: Vec<ObjectMeta> =
                self.metas.iter().map(|entry| entry.value().clone()).collect();
            metas.sort_by(|a, b| a.id.cmp(&b.id));
            Ok(metas)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_get_chunk() {
        let store = MemoryStore::new();
        store
            .put_chunk("vid_1", 0, Bytes::from_static(b"abc"))
            .await
            .unwrap();

        let data = store.get_chunk("vid_1", 0).await.unwrap();
        assert_eq!(data, Some(Bytes::from_static(b"abc")));
    }

    #[tokio::test]
    async fn test_get_missing_chunk() {
        let store = MemoryStore::new();
        assert_eq!(store.get_chunk("vid_1", 7).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_chunk_replaces_existing() {
        let store = MemoryStore::new();
        store
            .put_chunk("vid_1", 0, Bytes::from_static(b"old"))
            .await
            .unwrap();
        store
            .put_chunk("vid_1", 0, Bytes::from_static(b"new"))
            .await
            .unwrap();

        assert_eq!(
            store.get_chunk("vid_1", 0).await.unwrap(),
            Some(Bytes::from_static(b"new"))
        );
        assert_eq!(store.chunk_count(), 1);
    }

    #[tokio::test]
    async fn test_update_progress() {
        let store = MemoryStore::new();
        store
            .put_meta(ObjectMeta::new("vid_1", "t", "video/mp4"))
            .await
            .unwrap();

        store.update_progress("vid_1", 100, None).await.unwrap();
        let meta = store.get_meta("vid_1").await.unwrap().unwrap();
        assert_eq!(meta.bytes_downloaded, 100);
        assert_eq!(meta.total_size, 0);

        store.update_progress("vid_1", 200, Some(200)).await.unwrap();
        let meta = store.get_meta("vid_1").await.unwrap().unwrap();
        assert_eq!(meta.bytes_downloaded, 200);
        assert_eq!(meta.total_size, 200);
        assert!(meta.is_complete());
    }

    #[tokio::test]
    async fn test_delete_object_removes_chunks_and_meta() {
        let store = MemoryStore::new();
        store
            .put_meta(ObjectMeta::new("vid_1", "t", "video/mp4"))
            .await
            .unwrap();
        store
            .put_chunk("vid_1", 0, Bytes::from_static(b"a"))
            .await
            .unwrap();
        store
            .put_chunk("vid_1", 1, Bytes::from_static(b"b"))
            .await
            .unwrap();
        store
            .put_chunk("vid_2", 0, Bytes::from_static(b"c"))
            .await
            .unwrap();

        store.delete_object("vid_1").await.unwrap();

        assert_eq!(store.get_meta("vid_1").await.unwrap(), None);
        assert_eq!(store.get_chunk("vid_1", 0).await.unwrap(), None);
        // Chunks of other objects survive.
        assert!(store.get_chunk("vid_2", 0).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_object_is_ok() {
        let store = MemoryStore::new();
        store.delete_object("nope").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_objects_sorted() {
        let store = MemoryStore::new();
        store
            .put_meta(ObjectMeta::new("vid_b", "b", "video/mp4"))
            .await
            .unwrap();
        store
            .put_meta(ObjectMeta::new("vid_a", "a", "video/mp4"))
            .await
            .unwrap();

        let metas = store.list_objects().await.unwrap();
        let ids: Vec<_> = metas.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["vid_a", "vid_b"]);
    }
}
