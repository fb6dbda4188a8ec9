//! Document pusher.
//!
//! Uploads one document at a time. A successful upload flips the in-memory
//! `synced` flag; persisting it is the caller's job. A failed upload is logged
//! and leaves the document unsynced for a later attempt.
//!
//! With the default push mode the remote store assigns its own key, so a push
//! whose success was never acknowledged and is then retried creates a second
//! remote record. `PushMode::Idempotent` avoids this by using the local id.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::document::{Collection, Document};
use crate::logging::DEGRADED_TARGET;
use crate::remote::RemoteStore;

/// Pushes single documents to the remote store.
#[derive(Debug, Clone)]
pub struct Pusher {
    remote: Arc<dyn RemoteStore>,
}

impl Pusher {
    /// Create a pusher over the given remote store.
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self { remote }
    }

    /// Push one document. Returns `true` and marks the document synced if the
    /// remote store accepted it.
    pub async fn push(&self, collection: Collection, doc: &mut Document) -> bool {
        match self.remote.create_document(collection, doc).await {
            Ok(()) => {
                doc.mark_synced();
                debug!("Document synced to remote: {}", doc.id());
                true
            }
            Err(e) => {
                warn!(
                    target: DEGRADED_TARGET,
                    "Sync failed for document {}: {}",
                    doc.id(),
                    e
                );
                false
            }
        }
    }
}
