//! Local store for fieldsync.
//!
//! Durable key-value persistence on `SQLite`. Each collection lives in one
//! slot as a JSON array of documents, in insertion order. Writes replace the
//! whole array.
//!
//! Reads through [`Storage::read`] never fail: a missing or undecodable slot
//! reads as empty and the problem is logged. Mutating operations decode
//! strictly so that a damaged slot is reported instead of being overwritten.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::document::{Collection, Document, TypeTag};
use crate::error::{Error, Result};
use crate::logging::DEGRADED_TARGET;

/// Slot left behind by earlier releases to track sync status. Only ever cleared.
pub const LEGACY_SYNC_STATUS_KEY: &str = "omvs_sync_status";

/// Persistent store for document collections.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("storage connection lock poisoned"))
    }

    /// Read every document in a collection.
    ///
    /// Returns an empty sequence when the slot is absent or cannot be
    /// decoded; the failure is logged.
    #[must_use]
    pub fn read(&self, collection: Collection) -> Vec<Document> {
        match self.try_read(collection) {
            Ok(docs) => docs,
            Err(e) => {
                warn!(
                    target: DEGRADED_TARGET,
                    "Reading {} failed, treating as empty: {}",
                    collection,
                    e
                );
                Vec::new()
            }
        }
    }

    /// Read every document in a collection, reporting decode failures.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the slot holds
    /// something other than a document array.
    pub fn try_read(&self, collection: Collection) -> Result<Vec<Document>> {
        let conn = self.conn()?;
        Self::load(&conn, collection)
    }

    /// Replace the entire persisted sequence of a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database write fails.
    pub fn write(&self, collection: Collection, docs: &[Document]) -> Result<()> {
        let conn = self.conn()?;
        Self::store(&conn, collection, docs)
    }

    /// Append a document to the end of the collection it belongs in.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing slot cannot be decoded or the write fails.
    pub fn append(&self, doc: &Document) -> Result<()> {
        let collection = doc.collection();
        let conn = self.conn()?;
        let mut docs = Self::load(&conn, collection)?;
        docs.push(doc.clone());
        Self::store(&conn, collection, &docs)?;
        debug!("Appended {} to {} ({} documents)", doc.id(), collection, docs.len());
        Ok(())
    }

    /// Remove the document with the given id.
    ///
    /// Returns `true` if a document was removed, `false` if none matched.
    /// The slot is left untouched when nothing matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing slot cannot be decoded or the write fails.
    pub fn remove_by_id(&self, collection: Collection, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let mut docs = Self::load(&conn, collection)?;
        let before = docs.len();
        docs.retain(|doc| doc.id() != id);
        if docs.len() == before {
            return Ok(false);
        }
        Self::store(&conn, collection, &docs)?;
        Ok(true)
    }

    /// Delete the persisted slot of a collection entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn clear(&self, collection: Collection) -> Result<()> {
        self.remove_slot(collection.storage_key())
    }

    /// Delete an arbitrary slot by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove_slot(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        let affected = conn.execute("DELETE FROM slots WHERE key = ?1", [key])?;
        if affected > 0 {
            info!("Cleared slot {}", key);
        }
        Ok(())
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails or a slot is corrupt.
    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.conn()?;
        let distributions = Self::load(&conn, Collection::Distributions)?;
        let gps_photos = Self::load(&conn, Collection::GpsPhotos)?;
        drop(conn);

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            distributions: distributions.len(),
            gps_photos: gps_photos.len(),
            unsynced_distributions: distributions.iter().filter(|d| !d.is_synced()).count(),
            unsynced_gps_photos: gps_photos.iter().filter(|d| !d.is_synced()).count(),
            db_size_bytes,
        })
    }

    /// Overwrite a slot with raw text, bypassing encoding.
    #[cfg(test)]
    pub(crate) fn put_raw_slot(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO slots (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Run arbitrary SQL against the store, e.g. to install a failing trigger.
    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql)?;
        Ok(())
    }

    fn load(conn: &Connection, collection: Collection) -> Result<Vec<Document>> {
        let key = collection.storage_key();
        let raw: Option<String> = conn
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        match raw {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| Error::CorruptCollection {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn store(conn: &Connection, collection: Collection, docs: &[Document]) -> Result<()> {
        let encoded = serde_json::to_string(docs)?;
        conn.execute(
            r"
            INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![collection.storage_key(), encoded],
        )?;
        Ok(())
    }
}

/// Keep only the documents of one type. Order is preserved.
#[must_use]
pub fn filter_by_type(docs: &[Document], tag: TypeTag) -> Vec<Document> {
    docs.iter()
        .filter(|doc| doc.type_tag() == tag)
        .cloned()
        .collect()
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Documents in `Distributions`.
    pub distributions: usize,
    /// Documents in `GpsPhotos`.
    pub gps_photos: usize,
    /// Distributions not yet accepted by the remote store.
    pub unsynced_distributions: usize,
    /// GPS photos not yet accepted by the remote store.
    pub unsynced_gps_photos: usize,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
