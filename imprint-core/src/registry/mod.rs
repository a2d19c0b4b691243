//! Fingerprint registry: content digest to ownership and licensing metadata.
//!
//! The registry is a single JSON document held by a [`SnapshotStore`]. Every
//! operation loads the whole document, changes it in memory and writes one
//! complete replacement.
//!
//! Writers in one process are serialized by an async mutex. Two processes
//! sharing a store can still lose an update when their writes interleave.
//!
//! ```no_run
//! use std::sync::Arc;
//! use imprint_core::fingerprint::digest;
//! use imprint_core::registry::{FileSnapshotStore, RecordMetadata, Registry};
//!
//! # async fn example() -> imprint_core::Result<()> {
//! let registry = Registry::new(Arc::new(FileSnapshotStore::new("registry.json")));
//! let d = digest(b"image bytes");
//! registry.add(&d, RecordMetadata::with_owner("0xA11CE")).await?;
//! assert!(registry.check_by_digest(&d).await?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod record;
pub mod store;

#[cfg(feature = "network")]
pub mod http;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub use record::{
    FingerprintRecord, LicensingInfo, MatchStats, MatchType, RecordMetadata, RegistrySnapshot,
    SNAPSHOT_VERSION,
};
pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};

#[cfg(feature = "network")]
pub use http::HttpSnapshotStore;

use crate::error::Result;
use crate::fingerprint::{is_match, similarity_percent, ContentDigest, PerceptualFingerprint};

/// Closest registered fingerprint found by a similarity scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityMatch {
    pub digest: ContentDigest,
    pub metadata: RecordMetadata,
    pub distance: u32,
    pub similarity: f64,
}

/// Registry service over an injected snapshot store.
pub struct Registry {
    store: Arc<dyn SnapshotStore>,
    write_lock: Mutex<()>,
}

impl Registry {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Registry kept in memory only.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySnapshotStore::new()))
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }

    /// Read the current snapshot. A missing document is an empty registry.
    pub async fn load(&self) -> Result<RegistrySnapshot> {
        match self.store.read().await? {
            Some(bytes) => RegistrySnapshot::from_json(&bytes),
            None => Ok(RegistrySnapshot::empty()),
        }
    }

    /// Replace the stored snapshot, refreshing `lastUpdated`.
    pub async fn save(&self, snapshot: &mut RegistrySnapshot) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.persist(snapshot).await
    }

    async fn persist(&self, snapshot: &mut RegistrySnapshot) -> Result<()> {
        snapshot.last_updated = chrono::Utc::now().timestamp_millis();
        let bytes = snapshot.to_json()?;
        self.store.write(&bytes).await
    }

    /// Register `digest`. The first registration wins; returns `false` and
    /// writes nothing when the digest is already present.
    pub async fn add(&self, digest: &ContentDigest, metadata: RecordMetadata) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load().await?;

        if snapshot.find(digest).is_some() {
            debug!(digest = %digest.short(), "Digest already registered");
            return Ok(false);
        }

        snapshot.entries.push(FingerprintRecord {
            digest: digest.clone(),
            metadata,
        });
        self.persist(&mut snapshot).await?;

        info!(digest = %digest.short(), entries = snapshot.len(), "Registered asset");
        Ok(true)
    }

    pub async fn check_by_digest(&self, digest: &ContentDigest) -> Result<Option<RecordMetadata>> {
        let snapshot = self.load().await?;
        Ok(snapshot.find(digest).map(|r| r.metadata.clone()))
    }

    /// Closest entry whose similarity meets `threshold` percent.
    ///
    /// Entries without a fingerprint are ignored. Ties go to the entry that
    /// was registered first.
    pub async fn check_by_similarity(
        &self,
        fingerprint: &PerceptualFingerprint,
        threshold: f64,
    ) -> Result<Option<SimilarityMatch>> {
        let snapshot = self.load().await?;

        let mut best: Option<(&FingerprintRecord, u32)> = None;
        for record in &snapshot.entries {
            let Some(candidate) = &record.metadata.perceptual_fingerprint else {
                continue;
            };
            let distance = candidate.distance(fingerprint);
            if !is_match(distance, threshold) {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((record, distance));
            }
        }

        Ok(best.map(|(record, distance)| SimilarityMatch {
            digest: record.digest.clone(),
            metadata: record.metadata.clone(),
            distance,
            similarity: similarity_percent(distance),
        }))
    }

    /// Shallow merge-patch of a record's metadata. Returns `false` if the
    /// digest is not registered.
    pub async fn update_metadata(
        &self,
        digest: &ContentDigest,
        patch: &Map<String, Value>,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load().await?;

        let Some(record) = snapshot.find_mut(digest) else {
            return Ok(false);
        };
        record.metadata = record.metadata.merged_with(patch)?;
        self.persist(&mut snapshot).await?;

        debug!(digest = %digest.short(), keys = patch.len(), "Updated metadata");
        Ok(true)
    }

    /// Store a visual description produced by an image analysis step.
    pub async fn attach_vision_summary(&self, digest: &ContentDigest, summary: &str) -> Result<bool> {
        let mut patch = Map::new();
        patch.insert("visionSummary".into(), Value::String(summary.to_string()));
        self.update_metadata(digest, &patch).await
    }

    /// Count a match against a registered asset.
    pub async fn record_match(
        &self,
        digest: &ContentDigest,
        match_type: MatchType,
        similarity: f64,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load().await?;

        let Some(record) = snapshot.find_mut(digest) else {
            return Ok(false);
        };
        let stats = record.metadata.match_stats.get_or_insert_with(MatchStats::default);
        stats.match_count += 1;
        stats.last_matched_at = Some(chrono::Utc::now().timestamp_millis());
        stats.last_match_type = Some(match_type);
        stats.last_similarity = Some(similarity);
        self.persist(&mut snapshot).await?;

        Ok(true)
    }

    pub async fn delete_by_digest(&self, digest: &ContentDigest) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load().await?;

        let before = snapshot.len();
        snapshot.entries.retain(|r| &r.digest != digest);
        if snapshot.len() == before {
            return Ok(false);
        }
        self.persist(&mut snapshot).await?;

        info!(digest = %digest.short(), "Deleted registry entry");
        Ok(true)
    }

    /// Remove every entry. Returns how many were removed.
    pub async fn clear_all(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut snapshot = self.load().await?;

        let removed = snapshot.len();
        snapshot.entries.clear();
        self.persist(&mut snapshot).await?;

        info!(removed, "Cleared registry");
        Ok(removed)
    }

    pub async fn list(&self) -> Result<Vec<FingerprintRecord>> {
        Ok(self.load().await?.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImprintError;
    use crate::fingerprint::{digest, NEAR_DUPLICATE_THRESHOLD};
    use serde_json::json;

    /// Store that counts writes.
    #[derive(Default)]
    struct CountingStore {
        inner: MemorySnapshotStore,
        writes: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SnapshotStore for CountingStore {
        async fn read(&self) -> Result<Option<Vec<u8>>> {
            self.inner.read().await
        }

        async fn write(&self, bytes: &[u8]) -> Result<()> {
            self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.write(bytes).await
        }

        fn describe(&self) -> String {
            "counting".into()
        }
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl SnapshotStore for FailingStore {
        async fn read(&self) -> Result<Option<Vec<u8>>> {
            Err(ImprintError::StorageError("backend offline".into()))
        }

        async fn write(&self, _bytes: &[u8]) -> Result<()> {
            Err(ImprintError::StorageError("backend offline".into()))
        }

        fn describe(&self) -> String {
            "failing".into()
        }
    }

    fn with_fingerprint(owner: &str, bits: u64) -> RecordMetadata {
        RecordMetadata {
            perceptual_fingerprint: Some(PerceptualFingerprint::new(bits)),
            ..RecordMetadata::with_owner(owner)
        }
    }

    #[tokio::test]
    async fn test_add_then_check() {
        let registry = Registry::in_memory();
        let d = digest(b"asset");

        assert!(registry.add(&d, RecordMetadata::with_owner("0xA")).await.unwrap());
        let found = registry.check_by_digest(&d).await.unwrap().unwrap();
        assert_eq!(found.owner_asset_id.as_deref(), Some("0xA"));
        assert!(registry.check_by_digest(&digest(b"other")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_is_idempotent_first_write_wins() {
        let store = Arc::new(CountingStore::default());
        let registry = Registry::new(store.clone());
        let d = digest(b"asset");

        assert!(registry.add(&d, RecordMetadata::with_owner("first")).await.unwrap());
        assert!(!registry.add(&d, RecordMetadata::with_owner("second")).await.unwrap());

        assert_eq!(store.writes.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(registry.list().await.unwrap().len(), 1);
        let found = registry.check_by_digest(&d).await.unwrap().unwrap();
        assert_eq!(found.owner_asset_id.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_delete_then_check() {
        let registry = Registry::in_memory();
        let d = digest(b"asset");
        registry.add(&d, RecordMetadata::default()).await.unwrap();

        assert!(registry.delete_by_digest(&d).await.unwrap());
        assert!(registry.check_by_digest(&d).await.unwrap().is_none());
        assert!(!registry.delete_by_digest(&d).await.unwrap());
    }

    #[tokio::test]
    async fn test_similarity_picks_closest() {
        let registry = Registry::in_memory();
        registry.add(&digest(b"far"), with_fingerprint("far", 0xFF)).await.unwrap();
        registry.add(&digest(b"near"), with_fingerprint("near", 0x1)).await.unwrap();
        registry.add(&digest(b"none"), RecordMetadata::with_owner("none")).await.unwrap();

        let hit = registry
            .check_by_similarity(&PerceptualFingerprint::new(0), NEAR_DUPLICATE_THRESHOLD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.metadata.owner_asset_id.as_deref(), Some("near"));
        assert_eq!(hit.distance, 1);
        assert_eq!(hit.similarity, 98.4);
    }

    #[tokio::test]
    async fn test_similarity_ties_go_to_earliest() {
        let registry = Registry::in_memory();
        registry.add(&digest(b"1"), with_fingerprint("first", 0b011)).await.unwrap();
        registry.add(&digest(b"2"), with_fingerprint("second", 0b110)).await.unwrap();

        let hit = registry
            .check_by_similarity(&PerceptualFingerprint::new(0b010), NEAR_DUPLICATE_THRESHOLD)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.metadata.owner_asset_id.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_similarity_threshold_boundary() {
        let registry = Registry::in_memory();
        registry.add(&digest(b"a"), with_fingerprint("a", 0)).await.unwrap();

        // 16 differing bits is exactly 75%.
        let at_boundary = PerceptualFingerprint::new(0xFFFF);
        assert!(registry
            .check_by_similarity(&at_boundary, NEAR_DUPLICATE_THRESHOLD)
            .await
            .unwrap()
            .is_some());

        let beyond = PerceptualFingerprint::new(0x1FFFF);
        assert!(registry
            .check_by_similarity(&beyond, NEAR_DUPLICATE_THRESHOLD)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_metadata_merges() {
        let registry = Registry::in_memory();
        let d = digest(b"asset");
        registry.add(&d, RecordMetadata::with_owner("0xA")).await.unwrap();

        let patch = json!({"title": "Renamed", "licensingInfo": {"derivativesAllowed": false}});
        assert!(registry.update_metadata(&d, patch.as_object().unwrap()).await.unwrap());

        let found = registry.check_by_digest(&d).await.unwrap().unwrap();
        assert_eq!(found.title.as_deref(), Some("Renamed"));
        assert_eq!(found.owner_asset_id.as_deref(), Some("0xA"));
        assert_eq!(found.derivatives_allowed(), Some(false));
    }

    #[tokio::test]
    async fn test_update_metadata_unknown_digest() {
        let registry = Registry::in_memory();
        let patch = json!({"title": "x"});
        assert!(!registry
            .update_metadata(&digest(b"missing"), patch.as_object().unwrap())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_update_metadata_invalid_leaves_record_untouched() {
        let registry = Registry::in_memory();
        let d = digest(b"asset");
        registry.add(&d, with_fingerprint("0xA", 7)).await.unwrap();

        let patch = json!({"perceptualFingerprint": 42});
        let err = registry
            .update_metadata(&d, patch.as_object().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ImprintError::InvalidMetadata(_)));

        let found = registry.check_by_digest(&d).await.unwrap().unwrap();
        assert_eq!(found.perceptual_fingerprint, Some(PerceptualFingerprint::new(7)));
    }

    #[tokio::test]
    async fn test_attach_vision_summary() {
        let registry = Registry::in_memory();
        let d = digest(b"asset");
        registry.add(&d, RecordMetadata::default()).await.unwrap();

        assert!(registry.attach_vision_summary(&d, "a lighthouse at dusk").await.unwrap());
        let found = registry.check_by_digest(&d).await.unwrap().unwrap();
        assert_eq!(found.vision_summary.as_deref(), Some("a lighthouse at dusk"));
    }

    #[tokio::test]
    async fn test_record_match() {
        let registry = Registry::in_memory();
        let d = digest(b"asset");
        registry.add(&d, RecordMetadata::default()).await.unwrap();

        registry.record_match(&d, MatchType::Perceptual, 90.6).await.unwrap();
        registry.record_match(&d, MatchType::Exact, 100.0).await.unwrap();

        let stats = registry
            .check_by_digest(&d)
            .await
            .unwrap()
            .unwrap()
            .match_stats
            .unwrap();
        assert_eq!(stats.match_count, 2);
        assert_eq!(stats.last_match_type, Some(MatchType::Exact));
        assert_eq!(stats.last_similarity, Some(100.0));
        assert!(stats.last_matched_at.is_some());
    }

    #[tokio::test]
    async fn test_clear_all_and_list() {
        let registry = Registry::in_memory();
        for i in 0..3u8 {
            registry.add(&digest(&[i]), RecordMetadata::default()).await.unwrap();
        }
        let listed = registry.list().await.unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].digest, digest(&[0]));

        assert_eq!(registry.clear_all().await.unwrap(), 3);
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_refreshes_last_updated() {
        let registry = Registry::in_memory();
        let mut snapshot = RegistrySnapshot::empty();
        registry.save(&mut snapshot).await.unwrap();
        assert!(snapshot.last_updated > 0);
        assert_eq!(registry.load().await.unwrap().last_updated, snapshot.last_updated);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_surfaced() {
        let registry = Registry::new(Arc::new(MemorySnapshotStore::with_document("[]")));
        let err = registry.check_by_digest(&digest(b"x")).await.unwrap_err();
        assert!(matches!(err, ImprintError::CorruptSnapshot(_)));

        // Nothing is written over a document that could not be read.
        assert!(registry.add(&digest(b"x"), RecordMetadata::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_store_failure_is_undetermined() {
        let registry = Registry::new(Arc::new(FailingStore));
        let err = registry.check_by_digest(&digest(b"x")).await.unwrap_err();
        assert!(err.is_undetermined());
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_serialized() {
        let registry = Arc::new(Registry::in_memory());
        let mut handles = Vec::new();
        for i in 0..16u8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry.add(&digest(&[i]), RecordMetadata::default()).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }
        assert_eq!(registry.list().await.unwrap().len(), 16);
    }
}
