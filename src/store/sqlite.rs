//! SQLite-backed pending-record store.

use std::path::Path;

use hashbrown::HashSet;
use rusqlite::{Connection, params};

use crate::{schema, types::RecordUid};

use super::{PendingRecord, StoreError, StoreResult};

/// SQLite's default host-parameter ceiling; IN-lists are chunked below it.
const MAX_BOUND_PARAMS: usize = 999;

/// Behavior when an existing store fails structural validation at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaPolicy {
    /// Refuse to open, surfacing the structural diff.
    #[default]
    Validate,
    /// Drop and rebuild the layout, losing all pending rows.
    RecreateOnMismatch,
}

/// Durable pending-record store over one SQLite connection.
///
/// Every mutation runs inside a scoped transaction that commits on success and
/// rolls back on any other exit path.
#[derive(Debug)]
pub struct PendingStore {
    conn: Connection,
}

impl PendingStore {
    /// Opens or creates a store at `path`, validating any existing layout.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(path, SchemaPolicy::Validate)
    }

    /// Opens or creates a store at `path` with an explicit mismatch policy.
    pub fn open_with(path: impl AsRef<Path>, policy: SchemaPolicy) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn, policy)
    }

    /// Opens an in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn, SchemaPolicy::Validate)
    }

    fn init_connection(conn: Connection, policy: SchemaPolicy) -> StoreResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        if !schema::is_provisioned(&conn)? {
            schema::create_all(&conn)?;
        }
        match schema::validate(&conn) {
            Ok(()) => {}
            Err(StoreError::SchemaMismatch(_))
                if policy == SchemaPolicy::RecreateOnMismatch =>
            {
                schema::recreate(&conn)?;
            }
            Err(err) => return Err(err),
        }

        tracing::debug!(?policy, "opened pending store");
        Ok(Self { conn })
    }

    /// Writes one record in a single all-or-nothing transaction.
    ///
    /// A duplicate `recordUid` aborts the insert, leaves the store unchanged,
    /// and surfaces as [`StoreError::Conflict`].
    pub fn insert<R: PendingRecord>(&mut self, record: &R) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(R::INSERT_SQL)?;
            if let Err(err) = record.bind_insert(&mut stmt) {
                return Err(map_insert_err::<R>(record.uid(), err));
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns up to `limit` pending records, ascending by `recordUid`.
    ///
    /// The fixed order keeps repeated reads of an unchanged store
    /// reproducible. `limit == 0` yields an empty batch without touching
    /// storage.
    pub fn read_batch<R: PendingRecord>(&self, limit: usize) -> StoreResult<Vec<R>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let cap = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare_cached(R::SELECT_SQL)?;
        let rows = stmt.query_map(params![cap], |row| R::from_row(row))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Deletes every record whose `recordUid` is in `uids`, atomically.
    ///
    /// Unknown ids are ignored and duplicates are collapsed, so deletion is
    /// idempotent; an empty set is a no-op. Returns the number of rows
    /// removed.
    pub fn delete_batch<R: PendingRecord>(&mut self, uids: &[RecordUid]) -> StoreResult<usize> {
        let unique: HashSet<&str> = uids.iter().map(String::as_str).collect();
        if unique.is_empty() {
            return Ok(0);
        }

        let ids: Vec<&str> = unique.into_iter().collect();
        let tx = self.conn.transaction()?;
        let mut removed = 0usize;
        for chunk in ids.chunks(MAX_BOUND_PARAMS) {
            let sql = format!(
                "DELETE FROM {} WHERE recordUid IN ({})",
                R::KIND.table(),
                placeholders(chunk.len()),
            );
            let mut stmt = tx.prepare(&sql)?;
            removed += stmt.execute(rusqlite::params_from_iter(chunk.iter().copied()))?;
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Number of pending rows for the kind.
    pub fn count<R: PendingRecord>(&self) -> StoreResult<u64> {
        let n: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", R::KIND.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// Empties every record table in one transaction and reclaims file space.
    ///
    /// Returns the number of rows removed across all kinds. Exclusive access
    /// means this cannot run while a transaction is live on this store.
    pub fn clear_all(&mut self) -> StoreResult<usize> {
        schema::wipe_all(&mut self.conn)
    }

    /// Re-runs structural validation against the expected layout.
    ///
    /// Runs automatically at open time; exposed for callers that hold a store
    /// across external migrations.
    pub fn validate_schema(&self) -> StoreResult<()> {
        schema::validate(&self.conn)
    }
}

fn map_insert_err<R: PendingRecord>(uid: &str, err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(cause, _)
            if cause.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict {
                kind: R::KIND,
                uid: uid.to_owned(),
            }
        }
        _ => StoreError::Sqlite(err),
    }
}

/// Comma-joined `?N` placeholders for an IN-list of `n` values.
fn placeholders(n: usize) -> String {
    let mut out = String::with_capacity(n * 3);
    for i in 1..=n {
        if i > 1 {
            out.push_str(", ");
        }
        out.push('?');
        out.push_str(&i.to_string());
    }
    out
}
