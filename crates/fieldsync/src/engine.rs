//! The sync engine.
//!
//! [`SyncEngine`] owns the local store, the remote client, the online flag and
//! the change bus. It is created explicitly, probed once with
//! [`SyncEngine::init`], shared by reference (or `Arc`) with whatever needs it,
//! and torn down with [`SyncEngine::shutdown`].
//!
//! Sync is manual only. Saving never talks to the network; documents wait
//! locally until [`SyncEngine::manual_sync`] pushes them.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connectivity::Connectivity;
use crate::document::{
    Collection, DistributionPayload, Document, GpsPhoto, Payload, TypeTag,
};
use crate::error::{Error, Result};
use crate::pusher::Pusher;
use crate::remote::{HttpRemote, RemoteStore};
use crate::status::{EngineEvent, EventBus, SyncStatus};
use crate::storage::{filter_by_type, Storage, StorageStats, LEGACY_SYNC_STATUS_KEY};
use crate::sync::{self, CollectionLocks, SyncReport};

/// Revision marker returned for locally saved documents.
pub const LOCAL_REVISION: &str = "1-local";

/// Acknowledgement of a local save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReceipt {
    /// Always `true`; failures are returned as errors.
    pub ok: bool,
    /// Id of the new document.
    pub id: String,
    /// Local revision marker.
    pub rev: String,
}

impl SaveReceipt {
    fn local(id: &str) -> Self {
        Self {
            ok: true,
            id: id.to_string(),
            rev: LOCAL_REVISION.to_string(),
        }
    }
}

/// Acknowledgement of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteReceipt {
    /// Always `true`; failures are returned as errors.
    pub ok: bool,
    /// Whether a document with the id existed.
    pub removed: bool,
}

/// Documents not yet accepted by the remote store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsyncedCount {
    /// Pending distributions.
    pub distributions: usize,
    /// Pending GPS photos.
    pub gps_photos: usize,
    /// Sum of both.
    pub total: usize,
}

/// Offline-first sync engine for field records.
#[derive(Debug)]
pub struct SyncEngine {
    storage: Storage,
    remote: Arc<dyn RemoteStore>,
    connectivity: Connectivity,
    pusher: Pusher,
    locks: CollectionLocks,
    events: EventBus,
}

impl SyncEngine {
    /// Assemble an engine from its parts. Starts offline; call
    /// [`init`](Self::init) to probe.
    #[must_use]
    pub fn new(storage: Storage, remote: Arc<dyn RemoteStore>, config: &Config) -> Self {
        Self {
            storage,
            pusher: Pusher::new(remote.clone()),
            remote,
            connectivity: Connectivity::new(config.probe_timeout()),
            locks: CollectionLocks::default(),
            events: EventBus::new(config.events.channel_capacity),
        }
    }

    /// Open the configured database and build the HTTP remote client.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the remote
    /// configuration is unusable.
    pub fn open(config: &Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        let remote = HttpRemote::new(&config.remote)?;
        Ok(Self::new(storage, Arc::new(remote), config))
    }

    /// Probe the remote store once and report the resulting status.
    pub async fn init(&self) -> SyncStatus {
        self.connect().await;
        info!(
            "Sync engine ready ({})",
            if self.is_online() { "online" } else { "offline" }
        );
        self.status()
    }

    /// Release the engine. Listener tasks registered with
    /// [`on_change`](Self::on_change) end once the bus is dropped.
    pub fn shutdown(self) {
        info!("Sync engine shut down");
    }

    /// Save a distribution record.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the collection cannot be read or written.
    pub async fn save_distribution(
        &self,
        payload: impl Into<DistributionPayload>,
    ) -> Result<SaveReceipt> {
        self.save(payload.into().into()).await
    }

    /// Save a GPS photo record.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the collection cannot be read or written.
    pub async fn save_gps_photo(&self, payload: GpsPhoto) -> Result<SaveReceipt> {
        self.save(payload.into()).await
    }

    /// Save any record into the collection its kind belongs in.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the collection cannot be read or written.
    pub async fn save(&self, payload: Payload) -> Result<SaveReceipt> {
        let doc = Document::new(payload);
        let collection = doc.collection();
        {
            let _guard = self.locks.lock(collection).await;
            self.storage.append(&doc)?;
        }
        info!("Saved {} locally: {}", doc.type_tag(), doc.id());

        self.events.publish(EngineEvent::DocumentSaved {
            collection,
            id: doc.id().to_string(),
            type_tag: doc.type_tag(),
        });
        Ok(SaveReceipt::local(doc.id()))
    }

    /// Every stored distribution, in insertion order. Empty on error.
    #[must_use]
    pub fn get_all_distributions(&self) -> Vec<Document> {
        self.storage.read(Collection::Distributions)
    }

    /// Every stored GPS photo, in insertion order. Empty on error.
    #[must_use]
    pub fn get_all_gps_photos(&self) -> Vec<Document> {
        self.storage.read(Collection::GpsPhotos)
    }

    /// Stored distributions of one kind.
    #[must_use]
    pub fn get_distributions_by_type(&self, tag: TypeTag) -> Vec<Document> {
        filter_by_type(&self.get_all_distributions(), tag)
    }

    /// Remove one document by id. Every other document is left as stored.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the collection cannot be read or written.
    pub async fn delete_document(&self, collection: Collection, id: &str) -> Result<DeleteReceipt> {
        let removed = {
            let _guard = self.locks.lock(collection).await;
            self.storage.remove_by_id(collection, id)?
        };

        if removed {
            info!("Deleted {} from {}", id, collection);
            self.events.publish(EngineEvent::DocumentDeleted {
                collection,
                id: id.to_string(),
            });
        } else {
            debug!("No document {} in {}", id, collection);
        }
        Ok(DeleteReceipt { ok: true, removed })
    }

    /// Drop every document in one collection.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if the slot cannot be removed.
    pub async fn clear_collection(&self, collection: Collection) -> Result<()> {
        {
            let _guard = self.locks.lock(collection).await;
            self.storage.clear(collection)?;
        }
        self.events
            .publish(EngineEvent::CollectionCleared { collection });
        Ok(())
    }

    /// Drop both collections and the legacy sync-status slot.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if a slot cannot be removed.
    pub async fn clear_all_data(&self) -> Result<()> {
        for collection in Collection::ALL {
            self.clear_collection(collection).await?;
        }
        self.storage.remove_slot(LEGACY_SYNC_STATUS_KEY)?;
        info!("All local data cleared");
        Ok(())
    }

    /// Count documents still waiting for a push. Zero on error.
    #[must_use]
    pub fn unsynced_count(&self) -> UnsyncedCount {
        let pending = |docs: Vec<Document>| docs.iter().filter(|d| !d.is_synced()).count();
        let distributions = pending(self.get_all_distributions());
        let gps_photos = pending(self.get_all_gps_photos());
        UnsyncedCount {
            distributions,
            gps_photos,
            total: distributions + gps_photos,
        }
    }

    /// Probe the remote store. Returns the new online flag.
    pub async fn connect(&self) -> bool {
        let outcome = self.connectivity.probe(self.remote.as_ref()).await;
        if outcome.changed {
            self.events.publish(EngineEvent::ConnectivityChanged {
                online: outcome.online,
            });
        }
        outcome.online
    }

    /// Push every unsynced document and persist the new flags.
    ///
    /// When offline, probes once first. There are no further retries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OfflineSyncRequested`] if the remote store is still
    /// unreachable after the probe, or a storage failure if a collection
    /// cannot be read or written back.
    pub async fn manual_sync(&self) -> Result<SyncReport> {
        if !self.connectivity.is_online() {
            info!("Offline, re-checking connectivity before sync");
            if !self.connect().await {
                warn!("Sync requested while offline");
                return Err(Error::OfflineSyncRequested);
            }
        }

        let report = sync::run_pass(&self.storage, &self.pusher, &self.locks).await?;
        info!(
            "Sync pass finished: {}/{} documents synced",
            report.synced_count, report.total_unsynced
        );
        self.events.publish(EngineEvent::SyncCompleted(report));
        Ok(report)
    }

    /// Whether the last probe reached the remote store.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Current connectivity snapshot. Never fails.
    #[must_use]
    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            is_online: self.is_online(),
            sync_active: false,
        }
    }

    /// Local storage statistics.
    ///
    /// # Errors
    ///
    /// Returns a storage failure if a collection cannot be decoded.
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.stats()
    }

    /// Path of the backing database.
    #[must_use]
    pub fn database_path(&self) -> &std::path::Path {
        self.storage.path()
    }

    /// Receive every future [`EngineEvent`].
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Run `callback` for every future [`EngineEvent`] on a spawned task.
    pub fn on_change<F>(&self, callback: F) -> JoinHandle<()>
    where
        F: FnMut(EngineEvent) + Send + 'static,
    {
        self.events.on_change(callback)
    }

    /// Continuous replication is not available; logs and does nothing.
    pub fn start_sync(&self) {
        info!("Continuous sync is not available, use manual sync");
    }

    /// Continuous replication is not available; logs and does nothing.
    pub fn stop_sync(&self) {
        info!("Continuous sync is not running");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::document::{GeoPoint, MedicineDistribution, MildaDistribution};
    use crate::testing::MockRemote;

    fn engine_with(remote: &Arc<MockRemote>) -> SyncEngine {
        let storage = Storage::open_in_memory().unwrap();
        SyncEngine::new(storage, remote.clone(), &Config::default())
    }

    async fn online_engine() -> (SyncEngine, Arc<MockRemote>) {
        let remote = Arc::new(MockRemote::online());
        let engine = engine_with(&remote);
        engine.init().await;
        (engine, remote)
    }

    fn milda(head: &str, nets: u32) -> MildaDistribution {
        MildaDistribution {
            household_head: head.to_string(),
            net_count: nets,
            ..MildaDistribution::default()
        }
    }

    fn medicine(head: &str) -> MedicineDistribution {
        MedicineDistribution {
            household_head: head.to_string(),
            medicine_type: "ACT".to_string(),
            quantity: 3,
            ..MedicineDistribution::default()
        }
    }

    fn photo() -> GpsPhoto {
        GpsPhoto {
            location: GeoPoint {
                latitude: 16.5,
                longitude: -15.25,
            },
            ..GpsPhoto::default()
        }
    }

    #[tokio::test]
    async fn test_saved_document_read_back_once_unsynced() {
        let (engine, _) = online_engine().await;

        let receipt = engine.save_distribution(milda("Aminata", 2)).await.unwrap();
        assert!(receipt.ok);
        assert_eq!(receipt.rev, LOCAL_REVISION);

        let docs = engine.get_all_distributions();
        let matching: Vec<_> = docs.iter().filter(|d| d.id() == receipt.id).collect();
        assert_eq!(matching.len(), 1);
        assert!(!matching[0].is_synced());
    }

    #[tokio::test]
    async fn test_save_round_trip_keeps_payload() {
        let (engine, _) = online_engine().await;
        let payload = milda("Aminata", 4);

        let receipt = engine.save_distribution(payload.clone()).await.unwrap();
        let photo_receipt = engine.save_gps_photo(photo()).await.unwrap();

        let docs = engine.get_all_distributions();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id(), receipt.id);
        assert_eq!(docs[0].type_tag(), TypeTag::Milda);
        assert_eq!(docs[0].payload(), &Payload::Milda(payload));
        assert!(receipt.id.starts_with("milda_"));

        let photos = engine.get_all_gps_photos();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].id(), photo_receipt.id);
        assert_eq!(photos[0].payload(), &Payload::GpsPhoto(photo()));
        assert!(photos[0].created_at() <= chrono::Utc::now());
    }

    #[tokio::test]
    async fn test_repeated_reads_are_identical() {
        let (engine, _) = online_engine().await;
        engine.save_distribution(milda("Aminata", 1)).await.unwrap();
        engine.save_distribution(medicine("Cheikh")).await.unwrap();

        let first = engine.get_all_distributions();
        let second = engine.get_all_distributions();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_successful_sync_persists_flag() {
        let (engine, _) = online_engine().await;
        let receipt = engine.save_gps_photo(photo()).await.unwrap();

        engine.manual_sync().await.unwrap();

        let photos = engine.get_all_gps_photos();
        assert_eq!(photos[0].id(), receipt.id);
        assert!(photos[0].is_synced());
    }

    #[tokio::test]
    async fn test_sync_flag_survives_reopen() {
        let path = std::env::temp_dir().join(format!(
            "fieldsync_engine_reopen_{}.db",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        let remote = Arc::new(MockRemote::online());

        {
            let storage = Storage::open(&path).unwrap();
            let engine = SyncEngine::new(storage, remote.clone(), &Config::default());
            engine.init().await;
            engine.save_distribution(milda("Aminata", 2)).await.unwrap();
            engine.manual_sync().await.unwrap();
            engine.shutdown();
        }

        let storage = Storage::open(&path).unwrap();
        let engine = SyncEngine::new(storage, remote.clone(), &Config::default());
        let docs = engine.get_all_distributions();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].is_synced());

        drop(engine);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_offline_sync_rejects_and_leaves_flags() {
        let remote = Arc::new(MockRemote::offline());
        let engine = engine_with(&remote);
        engine.init().await;
        engine.save_distribution(milda("Aminata", 2)).await.unwrap();
        engine.save_gps_photo(photo()).await.unwrap();
        let before = (engine.get_all_distributions(), engine.get_all_gps_photos());
        let probes_before = remote.probe_count();

        let err = engine.manual_sync().await.unwrap_err();

        assert!(err.is_offline_sync_requested());
        assert_eq!(remote.probe_count(), probes_before + 1);
        assert!(remote.pushed().is_empty());
        assert_eq!(
            (engine.get_all_distributions(), engine.get_all_gps_photos()),
            before
        );
    }

    #[tokio::test]
    async fn test_offline_sync_recovers_when_reprobe_succeeds() {
        let remote = Arc::new(MockRemote::offline());
        let engine = engine_with(&remote);
        engine.init().await;
        assert!(!engine.is_online());
        engine.save_distribution(milda("Aminata", 2)).await.unwrap();

        remote.set_online(true);
        let report = engine.manual_sync().await.unwrap();

        assert!(engine.is_online());
        assert_eq!(report.synced_count, 1);
    }

    #[tokio::test]
    async fn test_sync_three_distributions() {
        let (engine, _) = online_engine().await;
        engine.save_distribution(milda("Aminata", 2)).await.unwrap();
        engine.save_distribution(milda("Brahim", 3)).await.unwrap();
        engine.save_distribution(medicine("Cheikh")).await.unwrap();
        assert!(engine.get_all_distributions().iter().all(|d| !d.is_synced()));

        let report = engine.manual_sync().await.unwrap();

        assert_eq!(
            report,
            SyncReport {
                success: true,
                synced_count: 3,
                total_unsynced: 3,
            }
        );
        let docs = engine.get_all_distributions();
        assert_eq!(docs.len(), 3);
        assert!(docs.iter().all(Document::is_synced));
    }

    #[tokio::test]
    async fn test_sync_with_one_failing_push() {
        let (engine, remote) = online_engine().await;
        engine.save_distribution(milda("Aminata", 2)).await.unwrap();
        let second = engine.save_distribution(milda("Brahim", 1)).await.unwrap();
        remote.fail_id(&second.id);

        let report = engine.manual_sync().await.unwrap();
        assert_eq!(report.synced_count, 1);

        let docs = engine.get_all_distributions();
        assert_eq!(docs.iter().filter(|d| d.is_synced()).count(), 1);
        assert_eq!(docs.iter().filter(|d| !d.is_synced()).count(), 1);
        assert!(!docs.iter().find(|d| d.id() == second.id).unwrap().is_synced());
    }

    #[tokio::test]
    async fn test_second_sync_does_not_repush() {
        let (engine, remote) = online_engine().await;
        engine.save_distribution(milda("Aminata", 2)).await.unwrap();

        engine.manual_sync().await.unwrap();
        let report = engine.manual_sync().await.unwrap();

        assert_eq!(report.total_unsynced, 0);
        assert_eq!(report.synced_count, 0);
        assert_eq!(remote.pushed().len(), 1);
    }

    #[tokio::test]
    async fn test_pushes_follow_insertion_order() {
        let (engine, remote) = online_engine().await;
        let a = engine.save_distribution(milda("A", 1)).await.unwrap();
        let p = engine.save_gps_photo(photo()).await.unwrap();
        let b = engine.save_distribution(medicine("B")).await.unwrap();

        engine.manual_sync().await.unwrap();

        let ids: Vec<String> = remote.pushed().into_iter().map(|(_, id)| id).collect();
        assert_eq!(ids, vec![a.id, b.id, p.id]);
    }

    #[tokio::test]
    async fn test_delete_removes_only_match() {
        let (engine, _) = online_engine().await;
        engine.save_distribution(milda("A", 1)).await.unwrap();
        let doomed = engine.save_distribution(medicine("B")).await.unwrap();
        engine.save_distribution(milda("C", 5)).await.unwrap();

        let before: Vec<String> = engine
            .get_all_distributions()
            .iter()
            .filter(|d| d.id() != doomed.id)
            .map(|d| serde_json::to_string(d).unwrap())
            .collect();

        let receipt = engine
            .delete_document(Collection::Distributions, &doomed.id)
            .await
            .unwrap();
        assert!(receipt.ok);
        assert!(receipt.removed);

        let after: Vec<String> = engine
            .get_all_distributions()
            .iter()
            .map(|d| serde_json::to_string(d).unwrap())
            .collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_delete_unknown_id() {
        let (engine, _) = online_engine().await;
        engine.save_gps_photo(photo()).await.unwrap();

        let receipt = engine
            .delete_document(Collection::GpsPhotos, "gps_photo_0_missing")
            .await
            .unwrap();
        assert!(receipt.ok);
        assert!(!receipt.removed);
        assert_eq!(engine.get_all_gps_photos().len(), 1);
    }

    #[tokio::test]
    async fn test_distributions_by_type() {
        let (engine, _) = online_engine().await;
        engine.save_distribution(milda("A", 1)).await.unwrap();
        engine.save_distribution(medicine("B")).await.unwrap();
        engine.save_distribution(milda("C", 2)).await.unwrap();

        assert_eq!(engine.get_distributions_by_type(TypeTag::Milda).len(), 2);
        assert_eq!(engine.get_distributions_by_type(TypeTag::Medicine).len(), 1);
        assert!(engine.get_distributions_by_type(TypeTag::GpsPhoto).is_empty());
    }

    #[tokio::test]
    async fn test_unsynced_count() {
        let (engine, remote) = online_engine().await;
        engine.save_distribution(milda("A", 1)).await.unwrap();
        let failing = engine.save_gps_photo(photo()).await.unwrap();
        engine.save_gps_photo(photo()).await.unwrap();
        remote.fail_id(&failing.id);

        assert_eq!(
            engine.unsynced_count(),
            UnsyncedCount {
                distributions: 1,
                gps_photos: 2,
                total: 3,
            }
        );

        engine.manual_sync().await.unwrap();
        assert_eq!(engine.unsynced_count().total, 1);
        assert_eq!(engine.unsynced_count().gps_photos, 1);
    }

    #[tokio::test]
    async fn test_clear_all_data() {
        let (engine, _) = online_engine().await;
        engine.save_distribution(milda("A", 1)).await.unwrap();
        engine.save_gps_photo(photo()).await.unwrap();
        engine
            .storage
            .put_raw_slot(LEGACY_SYNC_STATUS_KEY, "{}")
            .unwrap();

        engine.clear_all_data().await.unwrap();

        assert!(engine.get_all_distributions().is_empty());
        assert!(engine.get_all_gps_photos().is_empty());
        assert_eq!(engine.unsynced_count(), UnsyncedCount::default());
    }

    #[tokio::test]
    async fn test_save_fails_on_corrupt_collection() {
        crate::logging::init_test_logging();
        let (engine, _) = online_engine().await;
        engine
            .storage
            .put_raw_slot(Collection::GpsPhotos.storage_key(), "[1, 2")
            .unwrap();

        let err = engine.save_gps_photo(photo()).await.unwrap_err();
        assert!(err.is_storage_failure());
        assert!(engine.get_all_gps_photos().is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_connectivity() {
        let remote = Arc::new(MockRemote::offline());
        let engine = engine_with(&remote);

        let status = engine.init().await;
        assert_eq!(
            status,
            SyncStatus {
                is_online: false,
                sync_active: false,
            }
        );

        remote.set_online(true);
        assert!(engine.connect().await);
        assert!(engine.status().is_online);
        engine.start_sync();
        assert!(!engine.status().sync_active);
        engine.stop_sync();
    }

    #[tokio::test]
    async fn test_events_published() {
        let remote = Arc::new(MockRemote::offline());
        let engine = engine_with(&remote);
        let mut events = engine.subscribe();

        remote.set_online(true);
        engine.init().await;
        let receipt = engine.save_distribution(milda("A", 1)).await.unwrap();
        let report = engine.manual_sync().await.unwrap();
        engine
            .delete_document(Collection::Distributions, &receipt.id)
            .await
            .unwrap();
        engine.clear_collection(Collection::GpsPhotos).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::ConnectivityChanged { online: true }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::DocumentSaved {
                collection: Collection::Distributions,
                id: receipt.id.clone(),
                type_tag: TypeTag::Milda,
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::SyncCompleted(report)
        );
        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::DocumentDeleted {
                collection: Collection::Distributions,
                id: receipt.id,
            }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::CollectionCleared {
                collection: Collection::GpsPhotos,
            }
        );
    }

    #[tokio::test]
    async fn test_stats_count_stored_and_pending() {
        let remote = Arc::new(MockRemote::online());
        let engine = engine_with(&remote);
        engine.init().await;
        engine.save_distribution(milda("A", 1)).await.unwrap();
        engine.manual_sync().await.unwrap();
        engine.save_distribution(milda("B", 2)).await.unwrap();
        engine.save_gps_photo(photo()).await.unwrap();

        let stats = engine.stats().unwrap();
        assert_eq!(stats.distributions, 2);
        assert_eq!(stats.gps_photos, 1);
        assert_eq!(stats.unsynced_distributions, 1);
        assert_eq!(stats.unsynced_gps_photos, 1);
    }

    #[tokio::test]
    async fn test_stats_fail_on_corrupt_slot() {
        let remote = Arc::new(MockRemote::online());
        let engine = engine_with(&remote);
        engine
            .storage
            .put_raw_slot(Collection::GpsPhotos.storage_key(), "{not json")
            .unwrap();

        assert!(engine.stats().unwrap_err().is_storage_failure());
    }

    #[tokio::test]
    async fn test_save_during_sync_is_not_lost() {
        let remote = Arc::new(MockRemote::online().with_gate());
        let engine = Arc::new(engine_with(&remote));
        engine.init().await;
        let first = engine.save_distribution(milda("A", 1)).await.unwrap();

        let syncing = tokio::spawn({
            let engine = engine.clone();
            async move { engine.manual_sync().await }
        });
        remote.gate().started.notified().await;

        let saving = tokio::spawn({
            let engine = engine.clone();
            async move { engine.save_distribution(milda("B", 2)).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!saving.is_finished());

        remote.gate().release.add_permits(1);
        let report = syncing.await.unwrap().unwrap();
        let second = saving.await.unwrap().unwrap();

        assert_eq!(report.synced_count, 1);
        let docs = engine.get_all_distributions();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().find(|d| d.id() == first.id).unwrap().is_synced());
        assert!(!docs.iter().find(|d| d.id() == second.id).unwrap().is_synced());
    }
}
