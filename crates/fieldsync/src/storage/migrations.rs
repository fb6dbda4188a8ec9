//! Schema versioning for the local store.
//!
//! Each entry of [`MIGRATIONS`] upgrades the schema by one version; the
//! current version is recorded in the `metadata` table.

use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Error, Result};

use super::schema::{CREATE_METADATA_TABLE, V1_STATEMENTS};

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Ordered migration steps. Step `n` (zero-based) brings the schema to version `n + 1`.
const MIGRATIONS: &[&[&str]] = &[V1_STATEMENTS];

/// The schema version this build expects.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const CURRENT_VERSION: i32 = MIGRATIONS.len() as i32;

/// Bring the database schema up to [`CURRENT_VERSION`].
///
/// Pending steps run inside one transaction, so a failed upgrade leaves the
/// previous schema untouched.
///
/// # Errors
///
/// Returns an error if the stored version is unreadable, newer than this
/// build understands, or a migration statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let version = schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    if version == CURRENT_VERSION {
        return Ok(());
    }

    let tx = conn.unchecked_transaction()?;
    for (step, statements) in MIGRATIONS.iter().enumerate().skip(version_index(version)) {
        for statement in *statements {
            tx.execute(statement, [])?;
        }
        info!("Applied storage migration to version {}", step + 1);
    }
    tx.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, CURRENT_VERSION.to_string()),
    )?;
    tx.commit()?;
    Ok(())
}

/// Read the stored schema version; 0 for a fresh database.
fn schema_version(conn: &Connection) -> Result<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            [VERSION_KEY],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(0),
        Some(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
    }
}

fn version_index(version: i32) -> usize {
    usize::try_from(version).unwrap_or(0)
}
