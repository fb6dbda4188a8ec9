//! Connectivity prober.
//!
//! Keeps the engine's online/offline flag. A probe hits the remote store's
//! discovery endpoint under a fixed time bound; any success marks the engine
//! online and any failure (timeout, transport error, non-success status)
//! marks it offline. Probing never returns an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::logging::DEGRADED_TARGET;
use crate::remote::RemoteStore;

/// Result of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Whether the remote store answered.
    pub online: bool,
    /// Whether this probe flipped the flag.
    pub changed: bool,
}

/// Online/offline state of one engine.
#[derive(Debug)]
pub struct Connectivity {
    online: AtomicBool,
    timeout: Duration,
}

impl Connectivity {
    /// Create a prober with the given time bound. Starts offline.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            online: AtomicBool::new(false),
            timeout,
        }
    }

    /// The result of the most recent probe.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Probe the remote store once and record the result.
    pub async fn probe(&self, remote: &dyn RemoteStore) -> ProbeOutcome {
        let online = match tokio::time::timeout(self.timeout, remote.list_collections()).await {
            Ok(Ok(collections)) => {
                debug!("Probe succeeded, {} remote collections", collections.len());
                true
            }
            Ok(Err(e)) => {
                warn!(target: DEGRADED_TARGET, "Probe failed: {}", e);
                false
            }
            Err(_) => {
                warn!(
                    target: DEGRADED_TARGET,
                    "Probe timed out after {:?}",
                    self.timeout
                );
                false
            }
        };

        let previous = self.online.swap(online, Ordering::AcqRel);
        let changed = previous != online;
        if changed {
            info!(
                "Remote store is now {}",
                if online { "online" } else { "offline" }
            );
        }
        ProbeOutcome { online, changed }
    }
}
