//! Manual sync pass.
//!
//! A pass walks `Distributions` then `GpsPhotos`. For each collection it reads
//! the persisted sequence, pushes every unsynced document one at a time in
//! stored order, and writes the whole sequence back with the new flags.
//!
//! The write-back replaces the collection as it was read. Without a guard, a
//! document appended by another caller between the read and the write would be
//! overwritten and lost. Every mutating path therefore takes the collection's
//! lock from [`CollectionLocks`], and the pass holds it from the read through
//! the write-back, so concurrent saves wait for the pass instead.
//!
//! Push failures are not fatal; the document stays unsynced. A failure to
//! persist the flags propagates, and documents the remote store already
//! accepted stay accepted there.

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::document::Collection;
use crate::error::Result;
use crate::pusher::Pusher;
use crate::storage::Storage;

/// Outcome of one manual sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// The pass ran to completion.
    pub success: bool,
    /// Documents whose flag flipped to synced during this pass.
    pub synced_count: usize,
    /// Unsynced documents found before the pass started pushing.
    pub total_unsynced: usize,
}

impl SyncReport {
    /// Documents the pass tried to push that are still unsynced.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.total_unsynced.saturating_sub(self.synced_count)
    }
}

/// One async mutex per collection key, guarding its read-modify-write cycle.
#[derive(Debug, Default)]
pub(crate) struct CollectionLocks {
    distributions: Mutex<()>,
    gps_photos: Mutex<()>,
}

impl CollectionLocks {
    pub(crate) async fn lock(&self, collection: Collection) -> MutexGuard<'_, ()> {
        match collection {
            Collection::Distributions => self.distributions.lock().await,
            Collection::GpsPhotos => self.gps_photos.lock().await,
        }
    }
}

/// Run one pass over both collections.
///
/// Connectivity is the caller's concern; this only pushes and persists.
pub(crate) async fn run_pass(
    storage: &Storage,
    pusher: &Pusher,
    locks: &CollectionLocks,
) -> Result<SyncReport> {
    let mut report = SyncReport {
        success: false,
        synced_count: 0,
        total_unsynced: 0,
    };

    for collection in Collection::ALL {
        let _guard = locks.lock(collection).await;
        let mut docs = storage.try_read(collection)?;

        let unsynced = docs.iter().filter(|doc| !doc.is_synced()).count();
        report.total_unsynced += unsynced;
        if unsynced == 0 {
            debug!("Nothing to sync in {}", collection);
            continue;
        }

        let mut synced = 0;
        for doc in docs.iter_mut().filter(|doc| !doc.is_synced()) {
            if pusher.push(collection, doc).await {
                synced += 1;
            }
        }

        storage.write(collection, &docs)?;
        info!("Synced {}/{} documents in {}", synced, unsynced, collection);
        report.synced_count += synced;
    }

    report.success = true;
    Ok(report)
}
