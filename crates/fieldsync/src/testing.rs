//! Test double for the remote document store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use crate::document::{Collection, Document};
use crate::error::{Error, Result};
use crate::remote::RemoteStore;

/// Holds pushes until the test releases them.
#[derive(Debug)]
pub(crate) struct PushGate {
    /// Notified when a push reaches the gate.
    pub started: Notify,
    /// One permit lets one push through.
    pub release: Semaphore,
}

/// In-memory remote that records what it receives.
#[derive(Debug, Default)]
pub(crate) struct MockRemote {
    online: AtomicBool,
    failing: Mutex<HashSet<String>>,
    pushed: Mutex<Vec<(Collection, String)>>,
    probes: AtomicUsize,
    probe_delay: Option<Duration>,
    gate: Option<PushGate>,
}

impl MockRemote {
    pub fn online() -> Self {
        let remote = Self::default();
        remote.set_online(true);
        remote
    }

    pub fn offline() -> Self {
        Self::default()
    }

    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = Some(delay);
        self
    }

    pub fn with_gate(mut self) -> Self {
        self.gate = Some(PushGate {
            started: Notify::new(),
            release: Semaphore::new(0),
        });
        self
    }

    pub fn gate(&self) -> &PushGate {
        self.gate.as_ref().expect("remote was built without a gate")
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Reject every push of the document with this id.
    pub fn fail_id(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    /// Accepted pushes, in arrival order.
    pub fn pushed(&self) -> Vec<(Collection, String)> {
        self.pushed.lock().unwrap().clone()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn list_collections(&self) -> Result<Vec<String>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        if self.online.load(Ordering::SeqCst) {
            Ok(vec![
                Collection::Distributions.storage_key().to_string(),
                Collection::GpsPhotos.storage_key().to_string(),
            ])
        } else {
            Err(Error::network("probe", "connection refused"))
        }
    }

    async fn create_document(&self, collection: Collection, doc: &Document) -> Result<()> {
        if let Some(gate) = &self.gate {
            gate.started.notify_one();
            gate.release
                .acquire()
                .await
                .map_err(|e| Error::internal(e.to_string()))?
                .forget();
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::network("push", "connection refused"));
        }
        if self.failing.lock().unwrap().contains(doc.id()) {
            return Err(Error::RemoteStatus {
                url: format!("mock://{collection}"),
                status: 500,
            });
        }
        self.pushed
            .lock()
            .unwrap()
            .push((collection, doc.id().to_string()));
        Ok(())
    }
}
