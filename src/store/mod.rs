//! Record-store seam: error taxonomy and the per-kind repository trait.

pub mod sqlite;

use rusqlite::{Row, Statement, params};
use thiserror::Error;

use crate::{
    record::{DistanceRecord, HeartRateRecord, Spo2Record, StepsRecord},
    schema::SchemaDiff,
    types::{RecordKind, RecordUid},
};

/// Failure taxonomy for queue operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Duplicate `recordUid` on insert. Recoverable; storage is unchanged.
    #[error("duplicate {kind:?} record {uid:?}")]
    Conflict {
        /// Kind whose table rejected the insert.
        kind: RecordKind,
        /// Offending primary key.
        uid: RecordUid,
    },
    /// Store layout disagrees with the expected definition. Fatal; the store
    /// must not be used until reconciled.
    #[error("schema mismatch:\n{0}")]
    SchemaMismatch(SchemaDiff),
    /// Underlying storage failure, surfaced after transaction rollback.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Per-kind persistence binding, implemented once per record type and driven
/// by the generic operations on [`sqlite::PendingStore`].
pub trait PendingRecord: Sized + Send + 'static {
    /// Kind selector for this record type.
    const KIND: RecordKind;
    /// Insert statement covering every column in declaration order.
    const INSERT_SQL: &'static str;
    /// Batch select, ascending by `recordUid`, bounded by one parameter.
    const SELECT_SQL: &'static str;

    /// Primary-key value.
    fn uid(&self) -> &str;
    /// Executes `stmt` (prepared from [`Self::INSERT_SQL`]) with this
    /// record's column values.
    fn bind_insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize>;
    /// Decodes one record from a row shaped like [`Self::SELECT_SQL`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

impl PendingRecord for StepsRecord {
    const KIND: RecordKind = RecordKind::Steps;
    const INSERT_SQL: &'static str = "INSERT INTO pending_steps \
        (recordUid, patientId, originId, deviceId, startTs, endTs, count, tzOffsetMin) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
    const SELECT_SQL: &'static str = "SELECT recordUid, patientId, originId, deviceId, \
        startTs, endTs, count, tzOffsetMin \
        FROM pending_steps ORDER BY recordUid ASC LIMIT ?1";

    fn uid(&self) -> &str {
        &self.record_uid
    }

    fn bind_insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.record_uid,
            self.patient_id,
            self.origin_id,
            self.device_id,
            self.start_ts,
            self.end_ts,
            self.count,
            self.tz_offset_min,
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            record_uid: row.get(0)?,
            patient_id: row.get(1)?,
            origin_id: row.get(2)?,
            device_id: row.get(3)?,
            start_ts: row.get(4)?,
            end_ts: row.get(5)?,
            count: row.get(6)?,
            tz_offset_min: row.get(7)?,
        })
    }
}

impl PendingRecord for HeartRateRecord {
    const KIND: RecordKind = RecordKind::HeartRate;
    const INSERT_SQL: &'static str = "INSERT INTO pending_hr \
        (recordUid, patientId, originId, deviceId, timeTs, bpm, tzOffsetMin) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
    const SELECT_SQL: &'static str = "SELECT recordUid, patientId, originId, deviceId, \
        timeTs, bpm, tzOffsetMin \
        FROM pending_hr ORDER BY recordUid ASC LIMIT ?1";

    fn uid(&self) -> &str {
        &self.record_uid
    }

    fn bind_insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.record_uid,
            self.patient_id,
            self.origin_id,
            self.device_id,
            self.time_ts,
            self.bpm,
            self.tz_offset_min,
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            record_uid: row.get(0)?,
            patient_id: row.get(1)?,
            origin_id: row.get(2)?,
            device_id: row.get(3)?,
            time_ts: row.get(4)?,
            bpm: row.get(5)?,
            tz_offset_min: row.get(6)?,
        })
    }
}

impl PendingRecord for Spo2Record {
    const KIND: RecordKind = RecordKind::Spo2;
    const INSERT_SQL: &'static str = "INSERT INTO pending_spo2 \
        (recordUid, patientId, originId, deviceId, timeTs, spo2Pct, tzOffsetMin) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
    const SELECT_SQL: &'static str = "SELECT recordUid, patientId, originId, deviceId, \
        timeTs, spo2Pct, tzOffsetMin \
        FROM pending_spo2 ORDER BY recordUid ASC LIMIT ?1";

    fn uid(&self) -> &str {
        &self.record_uid
    }

    fn bind_insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.record_uid,
            self.patient_id,
            self.origin_id,
            self.device_id,
            self.time_ts,
            self.spo2_pct,
            self.tz_offset_min,
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            record_uid: row.get(0)?,
            patient_id: row.get(1)?,
            origin_id: row.get(2)?,
            device_id: row.get(3)?,
            time_ts: row.get(4)?,
            spo2_pct: row.get(5)?,
            tz_offset_min: row.get(6)?,
        })
    }
}

impl PendingRecord for DistanceRecord {
    const KIND: RecordKind = RecordKind::Distance;
    const INSERT_SQL: &'static str = "INSERT INTO pending_distance \
        (recordUid, patientId, originId, deviceId, startTs, endTs, meters, tzOffsetMin) \
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
    const SELECT_SQL: &'static str = "SELECT recordUid, patientId, originId, deviceId, \
        startTs, endTs, meters, tzOffsetMin \
        FROM pending_distance ORDER BY recordUid ASC LIMIT ?1";

    fn uid(&self) -> &str {
        &self.record_uid
    }

    fn bind_insert(&self, stmt: &mut Statement<'_>) -> rusqlite::Result<usize> {
        stmt.execute(params![
            self.record_uid,
            self.patient_id,
            self.origin_id,
            self.device_id,
            self.start_ts,
            self.end_ts,
            self.meters,
            self.tz_offset_min,
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            record_uid: row.get(0)?,
            patient_id: row.get(1)?,
            origin_id: row.get(2)?,
            device_id: row.get(3)?,
            start_ts: row.get(4)?,
            end_ts: row.get(5)?,
            meters: row.get(6)?,
            tz_offset_min: row.get(7)?,
        })
    }
}
