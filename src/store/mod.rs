//! Signature Store (spec §4.5).
//!
//! Durable per-tenant persistence for signature blobs, keyed by
//! `(api_id, tenant)`, used to hydrate the LSH index at startup and to
//! persist every admission/delete. Backed by an embedded SQLite database
//! via `rusqlite` (bundled SQLite — no external server, matching the
//! "local gatekeeper" framing of spec §1), pooled with `r2d2` +
//! `r2d2_sqlite` so every operation borrows a connection for the duration
//! of a single statement with guaranteed release on all exit paths (spec
//! §5), the same connection-per-statement shape `estuary-flow` uses for its
//! own embedded catalog database.

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::core::errors::{GatekeeperError, Result};
use crate::minhash::Signature;

/// Table name, bit-exact per spec §6.
const TABLE_NAME: &str = "AM_API_MINHASH";

/// A single persisted row: the signature blob plus its bookkeeping
/// timestamps.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// The API's 36-char identifier.
    pub api_id: String,
    /// The owning tenant (organization).
    pub tenant: String,
    /// The decoded signature.
    pub signature: Signature,
    /// When this row was first inserted.
    pub created_at: DateTime<Utc>,
    /// When this row was last modified.
    pub updated_at: DateTime<Utc>,
}

/// A persisted row with its signature left as undecoded bytes, used by
/// startup hydration so a single corrupt blob can be logged and skipped
/// instead of aborting the whole scan (spec §7).
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// The API's 36-char identifier.
    pub api_id: String,
    /// The owning tenant (organization).
    pub tenant: String,
    /// The raw signature blob, not yet decoded.
    pub signature_blob: Vec<u8>,
}

/// Durable signature store, pooled over a single SQLite file.
pub struct SignatureStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SignatureStore {
    /// Open (creating if absent) the SQLite database at `path` and run
    /// schema migration.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::new(manager).map_err(GatekeeperError::from)?;
        let store = Self { pool };
        store.migrate()?;
        Ok(store)
    }

    /// Open a private in-memory database, primarily for tests.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::new(manager).map_err(GatekeeperError::from)?;
        let store = Self { pool };
        store.migrate()?;
        Ok(store)
    }

    /// Create the table, its secondary index on `ORGANIZATION`, and the
    /// `UPDATED_TIME` auto-refresh trigger if they do not already exist
    /// (spec §6: SQLite lacks a native `ON UPDATE CURRENT_TIMESTAMP`
    /// column clause, so the refresh is implemented as an `AFTER UPDATE`
    /// trigger, the dialect-specific mechanism the spec names generically).
    fn migrate(&self) -> Result<()> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
                API_UUID VARCHAR(36) NOT NULL,
                ORGANIZATION VARCHAR(128) NOT NULL,
                SIGNATURE_BLOB BLOB NOT NULL,
                CREATED_TIME TEXT NOT NULL,
                UPDATED_TIME TEXT NOT NULL,
                PRIMARY KEY (API_UUID, ORGANIZATION)
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_organization
                ON {TABLE_NAME} (ORGANIZATION);
            CREATE TRIGGER IF NOT EXISTS trg_{table}_touch_updated
                AFTER UPDATE ON {TABLE_NAME}
                FOR EACH ROW
                WHEN NEW.UPDATED_TIME = OLD.UPDATED_TIME
                BEGIN
                    UPDATE {TABLE_NAME}
                    SET UPDATED_TIME = STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')
                    WHERE API_UUID = NEW.API_UUID AND ORGANIZATION = NEW.ORGANIZATION;
                END;",
            table = TABLE_NAME,
        ))?;
        Ok(())
    }

    /// Insert a brand-new row. Fails if `(api_id, tenant)` already exists.
    pub fn insert(&self, tenant: &str, api_id: &str, signature: &Signature) -> Result<()> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            &format!(
                "INSERT INTO {TABLE_NAME}
                    (API_UUID, ORGANIZATION, SIGNATURE_BLOB, CREATED_TIME, UPDATED_TIME)
                 VALUES (?1, ?2, ?3, ?4, ?4)"
            ),
            params![api_id, tenant, signature.to_bytes(), now],
        )?;
        Ok(())
    }

    /// Update an existing row's signature, touching `UPDATED_TIME`.
    pub fn update(&self, tenant: &str, api_id: &str, signature: &Signature) -> Result<()> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            &format!(
                "UPDATE {TABLE_NAME}
                 SET SIGNATURE_BLOB = ?1, UPDATED_TIME = ?2
                 WHERE API_UUID = ?3 AND ORGANIZATION = ?4"
            ),
            params![signature.to_bytes(), now, api_id, tenant],
        )?;
        Ok(())
    }

    /// Insert-or-update based on a prior existence check. The check and
    /// write are not one atomic transaction (concurrent admission of the
    /// same key is not expected in practice, per spec §4.5).
    pub fn upsert(&self, tenant: &str, api_id: &str, signature: &Signature) -> Result<()> {
        if self.exists(tenant, api_id)? {
            self.update(tenant, api_id, signature)
        } else {
            self.insert(tenant, api_id, signature)
        }
    }

    /// Fetch a single row by key.
    pub fn get(&self, tenant: &str, api_id: &str) -> Result<Option<StoredRecord>> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT API_UUID, ORGANIZATION, SIGNATURE_BLOB, CREATED_TIME, UPDATED_TIME
             FROM {TABLE_NAME}
             WHERE API_UUID = ?1 AND ORGANIZATION = ?2"
        ))?;
        let mut rows = stmt.query(params![api_id, tenant])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_record(row)?)),
            None => Ok(None),
        }
    }

    /// Fetch every row in the store, decoding each signature blob eagerly.
    ///
    /// Not used by startup hydration: a single corrupt blob here fails the
    /// whole scan (the `?` on `Signature::from_bytes` inside `row_to_record`
    /// propagates through `rows.collect`), which is the right behavior for
    /// callers that need every row decoded, but is fatal in a way spec §7
    /// forbids for hydration. Hydration uses [`Self::get_all_raw`] instead.
    pub fn get_all(&self) -> Result<Vec<StoredRecord>> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT API_UUID, ORGANIZATION, SIGNATURE_BLOB, CREATED_TIME, UPDATED_TIME
             FROM {TABLE_NAME}"
        ))?;
        let rows = stmt.query_map([], row_to_record)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(GatekeeperError::from)
    }

    /// Fetch every row in the store with its signature left undecoded, used
    /// only at startup hydration (spec §4.6/§7): a row whose blob fails to
    /// decode can be logged and skipped by the caller without the whole
    /// scan failing, which `get_all`'s eager decode cannot offer.
    pub fn get_all_raw(&self) -> Result<Vec<RawRecord>> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT API_UUID, ORGANIZATION, SIGNATURE_BLOB FROM {TABLE_NAME}"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(RawRecord {
                api_id: row.get(0)?,
                tenant: row.get(1)?,
                signature_blob: row.get(2)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(GatekeeperError::from)
    }

    /// Fetch every row for a given tenant.
    pub fn get_all_by_tenant(&self, tenant: &str) -> Result<Vec<StoredRecord>> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT API_UUID, ORGANIZATION, SIGNATURE_BLOB, CREATED_TIME, UPDATED_TIME
             FROM {TABLE_NAME}
             WHERE ORGANIZATION = ?1"
        ))?;
        let rows = stmt.query_map(params![tenant], row_to_record)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(GatekeeperError::from)
    }

    /// Delete a single row. A no-op if the key does not exist.
    pub fn delete(&self, tenant: &str, api_id: &str) -> Result<()> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        conn.execute(
            &format!("DELETE FROM {TABLE_NAME} WHERE API_UUID = ?1 AND ORGANIZATION = ?2"),
            params![api_id, tenant],
        )?;
        Ok(())
    }

    /// Delete every row for a tenant.
    pub fn delete_all_by_tenant(&self, tenant: &str) -> Result<()> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        conn.execute(
            &format!("DELETE FROM {TABLE_NAME} WHERE ORGANIZATION = ?1"),
            params![tenant],
        )?;
        Ok(())
    }

    /// Whether a row exists for `(tenant, api_id)`.
    pub fn exists(&self, tenant: &str, api_id: &str) -> Result<bool> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {TABLE_NAME} WHERE API_UUID = ?1 AND ORGANIZATION = ?2"
            ),
            params![api_id, tenant],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Write a row with an arbitrary, possibly-malformed blob, bypassing
    /// `Signature`'s own encoding. Exists only so tests elsewhere in the
    /// crate can exercise hydration's handling of a corrupt stored
    /// signature without reaching into this module's private `pool` field.
    #[cfg(test)]
    pub(crate) fn insert_raw_blob_for_test(
        &self,
        tenant: &str,
        api_id: &str,
        blob: &[u8],
    ) -> Result<()> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            &format!(
                "INSERT INTO {TABLE_NAME}
                    (API_UUID, ORGANIZATION, SIGNATURE_BLOB, CREATED_TIME, UPDATED_TIME)
                 VALUES (?1, ?2, ?3, ?4, ?4)"
            ),
            params![api_id, tenant, blob, now],
        )?;
        Ok(())
    }

    /// Count of rows per tenant, used by the operator CLI's `stats`
    /// command.
    pub fn tenant_counts(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.pool.get().map_err(GatekeeperError::from)?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT ORGANIZATION, COUNT(*) FROM {TABLE_NAME} GROUP BY ORGANIZATION"
        ))?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(GatekeeperError::from)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRecord> {
    let api_id: String = row.get(0)?;
    let tenant: String = row.get(1)?;
    let blob: Vec<u8> = row.get(2)?;
    let created_time: String = row.get(3)?;
    let updated_time: String = row.get(4)?;

    let signature = Signature::from_bytes(&blob).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Blob,
            Box::new(e),
        )
    })?;
    let created_at = parse_timestamp(&created_time)?;
    let updated_at = parse_timestamp(&updated_time)?;

    Ok(StoredRecord {
        api_id,
        tenant,
        signature,
        created_at,
        updated_at,
    })
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })
}
