//! Persisted layout: table definitions, first-use creation, structural
//! validation, destructive rebuild, and the full-wipe operation.
//!
//! The store is validated column-for-column against [`EXPECTED`] every time it
//! is opened. A `queue_master` row carries an identity marker so a database
//! created by a different layout revision is rejected even when the table
//! shapes happen to agree.

use std::fmt;

use hashbrown::HashMap;
use rusqlite::{Connection, OptionalExtension};

use crate::{
    store::{StoreError, StoreResult},
    types::RecordKind,
};

/// Identity written into `queue_master` at creation time; changes whenever any
/// table definition changes shape.
pub const SCHEMA_IDENTITY: &str = "5f1d0c2aa7b94d4e8a31c6f09d2e7b44";

const MASTER_TABLE: &str = "queue_master";

const CREATE_TABLES_SQL: &str = "\
CREATE TABLE IF NOT EXISTS pending_steps (recordUid TEXT NOT NULL, patientId TEXT NOT NULL, originId TEXT NOT NULL, deviceId TEXT NOT NULL, startTs TEXT NOT NULL, endTs TEXT NOT NULL, count INTEGER NOT NULL, tzOffsetMin INTEGER NOT NULL, PRIMARY KEY(recordUid));
CREATE TABLE IF NOT EXISTS pending_hr (recordUid TEXT NOT NULL, patientId TEXT NOT NULL, originId TEXT NOT NULL, deviceId TEXT NOT NULL, timeTs TEXT NOT NULL, bpm INTEGER NOT NULL, tzOffsetMin INTEGER NOT NULL, PRIMARY KEY(recordUid));
CREATE TABLE IF NOT EXISTS pending_spo2 (recordUid TEXT NOT NULL, patientId TEXT NOT NULL, originId TEXT NOT NULL, deviceId TEXT NOT NULL, timeTs TEXT NOT NULL, spo2Pct REAL NOT NULL, tzOffsetMin INTEGER NOT NULL, PRIMARY KEY(recordUid));
CREATE TABLE IF NOT EXISTS pending_distance (recordUid TEXT NOT NULL, patientId TEXT NOT NULL, originId TEXT NOT NULL, deviceId TEXT NOT NULL, startTs TEXT NOT NULL, endTs TEXT NOT NULL, meters INTEGER NOT NULL, tzOffsetMin INTEGER NOT NULL, PRIMARY KEY(recordUid));
CREATE TABLE IF NOT EXISTS queue_master (id INTEGER PRIMARY KEY, identity_hash TEXT);
";

const DROP_TABLES_SQL: &str = "\
DROP TABLE IF EXISTS pending_steps;
DROP TABLE IF EXISTS pending_hr;
DROP TABLE IF EXISTS pending_spo2;
DROP TABLE IF EXISTS pending_distance;
DROP TABLE IF EXISTS queue_master;
";

/// Declared shape of one column, as validated against `PRAGMA table_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: &'static str,
    /// Declared SQL type.
    pub decl_type: &'static str,
    /// NOT NULL constraint.
    pub not_null: bool,
    /// 1-based position within the primary key, 0 when not part of it.
    pub pk_position: u8,
}

const fn col(name: &'static str, decl_type: &'static str, pk_position: u8) -> ColumnDef {
    ColumnDef {
        name,
        decl_type,
        not_null: true,
        pk_position,
    }
}

/// Declared shape of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    /// Table name.
    pub name: &'static str,
    /// Columns in declaration order.
    pub columns: &'static [ColumnDef],
}

/// Expected layout of the four record tables.
pub const EXPECTED: [TableDef; 4] = [
    TableDef {
        name: "pending_steps",
        columns: &[
            col("recordUid", "TEXT", 1),
            col("patientId", "TEXT", 0),
            col("originId", "TEXT", 0),
            col("deviceId", "TEXT", 0),
            col("startTs", "TEXT", 0),
            col("endTs", "TEXT", 0),
            col("count", "INTEGER", 0),
            col("tzOffsetMin", "INTEGER", 0),
        ],
    },
    TableDef {
        name: "pending_hr",
        columns: &[
            col("recordUid", "TEXT", 1),
            col("patientId", "TEXT", 0),
            col("originId", "TEXT", 0),
            col("deviceId", "TEXT", 0),
            col("timeTs", "TEXT", 0),
            col("bpm", "INTEGER", 0),
            col("tzOffsetMin", "INTEGER", 0),
        ],
    },
    TableDef {
        name: "pending_spo2",
        columns: &[
            col("recordUid", "TEXT", 1),
            col("patientId", "TEXT", 0),
            col("originId", "TEXT", 0),
            col("deviceId", "TEXT", 0),
            col("timeTs", "TEXT", 0),
            col("spo2Pct", "REAL", 0),
            col("tzOffsetMin", "INTEGER", 0),
        ],
    },
    TableDef {
        name: "pending_distance",
        columns: &[
            col("recordUid", "TEXT", 1),
            col("patientId", "TEXT", 0),
            col("originId", "TEXT", 0),
            col("deviceId", "TEXT", 0),
            col("startTs", "TEXT", 0),
            col("endTs", "TEXT", 0),
            col("meters", "INTEGER", 0),
            col("tzOffsetMin", "INTEGER", 0),
        ],
    },
];

/// Actual column shape read back from `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared SQL type as stored by the engine.
    pub decl_type: String,
    /// NOT NULL constraint.
    pub not_null: bool,
    /// 1-based position within the primary key, 0 when not part of it.
    pub pk_position: u8,
}

/// Disagreement over the identity marker row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDiff {
    /// Identity this build writes at creation time.
    pub expected: String,
    /// Identity found in the store, if any.
    pub found: Option<String>,
}

/// Structural disagreement for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDiff {
    /// Table name.
    pub table: &'static str,
    /// Expected columns absent from the store.
    pub missing: Vec<String>,
    /// Stored columns absent from the expected definition.
    pub unexpected: Vec<String>,
    /// Columns present on both sides with a differing shape.
    pub changed: Vec<String>,
}

/// Full structural diff between the expected layout and an existing store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaDiff {
    /// Identity-marker disagreement, if any.
    pub identity: Option<IdentityDiff>,
    /// Per-table structural disagreements.
    pub tables: Vec<TableDiff>,
}

impl SchemaDiff {
    /// True when expected and actual layouts agree completely.
    pub fn is_empty(&self) -> bool {
        self.identity.is_none() && self.tables.is_empty()
    }
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(identity) = &self.identity {
            writeln!(
                f,
                "identity: expected {}, found {}",
                identity.expected,
                identity.found.as_deref().unwrap_or("none"),
            )?;
        }
        for table in &self.tables {
            writeln!(f, "{}:", table.table)?;
            for line in &table.missing {
                writeln!(f, "  missing   {line}")?;
            }
            for line in &table.unexpected {
                writeln!(f, "  unexpected {line}")?;
            }
            for line in &table.changed {
                writeln!(f, "  changed   {line}")?;
            }
        }
        Ok(())
    }
}

/// Creates any missing record tables plus the identity marker.
pub fn create_all(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(CREATE_TABLES_SQL)?;
    conn.execute(
        "INSERT OR REPLACE INTO queue_master (id, identity_hash) VALUES (1, ?1)",
        [SCHEMA_IDENTITY],
    )?;
    Ok(())
}

/// True when any record table or the identity marker already exists.
pub fn is_provisioned(conn: &Connection) -> StoreResult<bool> {
    if table_exists(conn, MASTER_TABLE)? {
        return Ok(true);
    }
    for kind in RecordKind::ALL {
        if table_exists(conn, kind.table())? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Compares the store against [`EXPECTED`] column-for-column and against the
/// identity marker. Any disagreement yields [`StoreError::SchemaMismatch`]
/// carrying the full structural diff.
pub fn validate(conn: &Connection) -> StoreResult<()> {
    let mut diff = SchemaDiff::default();

    let found = read_identity(conn)?;
    if found.as_deref() != Some(SCHEMA_IDENTITY) {
        diff.identity = Some(IdentityDiff {
            expected: SCHEMA_IDENTITY.to_string(),
            found,
        });
    }

    for table in &EXPECTED {
        let actual = read_table_info(conn, table.name)?;
        if let Some(table_diff) = diff_table(table, &actual) {
            diff.tables.push(table_diff);
        }
    }

    if diff.is_empty() {
        Ok(())
    } else {
        Err(StoreError::SchemaMismatch(diff))
    }
}

/// Drops every table and rebuilds the expected layout. All pending rows are
/// lost; the caller opts into this via `SchemaPolicy::RecreateOnMismatch`.
pub fn recreate(conn: &Connection) -> StoreResult<()> {
    tracing::warn!("recreating pending-queue layout, all pending rows dropped");
    conn.execute_batch(DROP_TABLES_SQL)?;
    create_all(conn)
}

/// Deletes every row from every record table inside one transaction, then
/// checkpoints the WAL and reclaims file space.
///
/// Requires exclusive access: the `&mut Connection` borrow cannot coexist with
/// a live transaction on the same connection.
pub fn wipe_all(conn: &mut Connection) -> StoreResult<usize> {
    let tx = conn.transaction()?;
    let mut removed = 0usize;
    for kind in RecordKind::ALL {
        removed += tx.execute(&format!("DELETE FROM {}", kind.table()), [])?;
    }
    tx.commit()?;

    conn.execute_batch("PRAGMA wal_checkpoint(FULL);")?;
    conn.execute_batch("VACUUM;")?;
    tracing::info!(removed, "wiped all pending tables");
    Ok(removed)
}

fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

fn read_identity(conn: &Connection) -> StoreResult<Option<String>> {
    if !table_exists(conn, MASTER_TABLE)? {
        return Ok(None);
    }
    let identity = conn
        .query_row(
            "SELECT identity_hash FROM queue_master WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(identity)
}

fn read_table_info(conn: &Connection, table: &str) -> rusqlite::Result<Vec<ColumnInfo>> {
    // Table names come from static definitions, never from callers.
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| {
        Ok(ColumnInfo {
            name: row.get(1)?,
            decl_type: row.get(2)?,
            not_null: row.get::<_, i64>(3)? != 0,
            pk_position: row.get::<_, i64>(5)? as u8,
        })
    })?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn diff_table(expected: &TableDef, actual: &[ColumnInfo]) -> Option<TableDiff> {
    let by_name: HashMap<&str, &ColumnInfo> =
        actual.iter().map(|c| (c.name.as_str(), c)).collect();

    let mut diff = TableDiff {
        table: expected.name,
        missing: Vec::new(),
        unexpected: Vec::new(),
        changed: Vec::new(),
    };

    for want in expected.columns {
        match by_name.get(want.name) {
            None => diff.missing.push(render_expected(want)),
            Some(have) => {
                let same = have.decl_type.eq_ignore_ascii_case(want.decl_type)
                    && have.not_null == want.not_null
                    && have.pk_position == want.pk_position;
                if !same {
                    diff.changed.push(format!(
                        "{}: expected {}, found {}",
                        want.name,
                        render_shape(want.decl_type, want.not_null, want.pk_position),
                        render_shape(&have.decl_type, have.not_null, have.pk_position),
                    ));
                }
            }
        }
    }

    for have in actual {
        if !expected.columns.iter().any(|c| c.name == have.name) {
            diff.unexpected.push(format!(
                "{} {}",
                have.name,
                render_shape(&have.decl_type, have.not_null, have.pk_position),
            ));
        }
    }

    if diff.missing.is_empty() && diff.unexpected.is_empty() && diff.changed.is_empty() {
        None
    } else {
        Some(diff)
    }
}

fn render_expected(c: &ColumnDef) -> String {
    format!("{} {}", c.name, render_shape(c.decl_type, c.not_null, c.pk_position))
}

fn render_shape(decl_type: &str, not_null: bool, pk_position: u8) -> String {
    let mut out = decl_type.to_ascii_uppercase();
    if not_null {
        out.push_str(" NOT NULL");
    }
    if pk_position > 0 {
        out.push_str(&format!(" PK#{pk_position}"));
    }
    out
}
