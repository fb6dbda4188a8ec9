//! `fieldsync` - Offline-first sync engine for field data collection
//!
//! Field workers record net distributions, medicine distributions and
//! geotagged photos on devices that are usually offline. This library keeps
//! every record in a local store first and pushes pending records to a
//! central HTTP document store when the user asks for a sync.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod connectivity;
pub mod document;
pub mod engine;
pub mod error;
pub mod logging;
pub mod pusher;
pub mod remote;
pub mod status;
pub mod storage;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, PushMode};
pub use document::{
    Collection, DistributionPayload, Document, GpsPhoto, MedicineDistribution, MildaDistribution,
    Payload, TypeTag,
};
pub use engine::{DeleteReceipt, SaveReceipt, SyncEngine, UnsyncedCount};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use remote::{HttpRemote, RemoteStore};
pub use status::{EngineEvent, EventBus, SyncStatus};
pub use storage::{Storage, StorageStats};
pub use sync::SyncReport;
