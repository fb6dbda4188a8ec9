//! Remote document store seam.
//!
//! The engine talks to the remote store only through [`RemoteStore`], so the
//! HTTP client in [`http`] can be swapped for a test double.

pub mod http;

use std::fmt;

use async_trait::async_trait;

use crate::document::{Collection, Document};
use crate::error::Result;

pub use http::HttpRemote;

/// Operations the sync engine needs from a remote document store.
#[async_trait]
pub trait RemoteStore: Send + Sync + fmt::Debug {
    /// Hit the discovery endpoint, returning the names of existing collections.
    ///
    /// # Errors
    ///
    /// Returns a network error if the store is unreachable or answers with a
    /// non-success status.
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Upload one document into the remote collection backing `collection`.
    ///
    /// # Errors
    ///
    /// Returns a network error if the request fails or is rejected.
    async fn create_document(&self, collection: Collection, doc: &Document) -> Result<()>;
}
