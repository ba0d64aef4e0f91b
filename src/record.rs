//! Pending telemetry records and the kind-tagged dispatch enum.
//!
//! One struct per persisted table, one field per column. Records are immutable
//! once inserted; the queue offers no update operation, so there are no patch
//! types here. Serialized field names equal the persisted column names.

use serde::{Deserialize, Serialize};

use crate::types::{DeviceId, OriginId, PatientId, RecordKind, RecordUid, TzOffsetMin};

/// Step count accumulated over a capture interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepsRecord {
    /// Primary key, assigned by the producing collector.
    pub record_uid: RecordUid,
    /// Owning subject.
    pub patient_id: PatientId,
    /// Logical source of the data stream.
    pub origin_id: OriginId,
    /// Physical capture device.
    pub device_id: DeviceId,
    /// Interval start instant (opaque ISO-8601 text).
    pub start_ts: String,
    /// Interval end instant (opaque ISO-8601 text).
    pub end_ts: String,
    /// Steps counted over the interval.
    pub count: i64,
    /// UTC offset in minutes at capture time.
    pub tz_offset_min: TzOffsetMin,
}

/// Heart-rate sample at a single instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateRecord {
    /// Primary key, assigned by the producing collector.
    pub record_uid: RecordUid,
    /// Owning subject.
    pub patient_id: PatientId,
    /// Logical source of the data stream.
    pub origin_id: OriginId,
    /// Physical capture device.
    pub device_id: DeviceId,
    /// Sample instant (opaque ISO-8601 text).
    pub time_ts: String,
    /// Beats per minute.
    pub bpm: i64,
    /// UTC offset in minutes at capture time.
    pub tz_offset_min: TzOffsetMin,
}

/// Blood-oxygen saturation sample at a single instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spo2Record {
    /// Primary key, assigned by the producing collector.
    pub record_uid: RecordUid,
    /// Owning subject.
    pub patient_id: PatientId,
    /// Logical source of the data stream.
    pub origin_id: OriginId,
    /// Physical capture device.
    pub device_id: DeviceId,
    /// Sample instant (opaque ISO-8601 text).
    pub time_ts: String,
    /// Saturation percentage.
    pub spo2_pct: f64,
    /// UTC offset in minutes at capture time.
    pub tz_offset_min: TzOffsetMin,
}

/// Distance covered over a capture interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceRecord {
    /// Primary key, assigned by the producing collector.
    pub record_uid: RecordUid,
    /// Owning subject.
    pub patient_id: PatientId,
    /// Logical source of the data stream.
    pub origin_id: OriginId,
    /// Physical capture device.
    pub device_id: DeviceId,
    /// Interval start instant (opaque ISO-8601 text).
    pub start_ts: String,
    /// Interval end instant (opaque ISO-8601 text).
    pub end_ts: String,
    /// Meters covered over the interval.
    pub meters: i64,
    /// UTC offset in minutes at capture time.
    pub tz_offset_min: TzOffsetMin,
}

/// A record of any kind, tagged for uniform dispatch across the four tables.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyRecord {
    /// Steps interval record.
    Steps(StepsRecord),
    /// Heart-rate sample record.
    HeartRate(HeartRateRecord),
    /// Blood-oxygen sample record.
    Spo2(Spo2Record),
    /// Distance interval record.
    Distance(DistanceRecord),
}

impl AnyRecord {
    /// Kind selector for the wrapped record.
    pub fn kind(&self) -> RecordKind {
        match self {
            AnyRecord::Steps(_) => RecordKind::Steps,
            AnyRecord::HeartRate(_) => RecordKind::HeartRate,
            AnyRecord::Spo2(_) => RecordKind::Spo2,
            AnyRecord::Distance(_) => RecordKind::Distance,
        }
    }

    /// Primary key of the wrapped record.
    pub fn uid(&self) -> &str {
        match self {
            AnyRecord::Steps(r) => &r.record_uid,
            AnyRecord::HeartRate(r) => &r.record_uid,
            AnyRecord::Spo2(r) => &r.record_uid,
            AnyRecord::Distance(r) => &r.record_uid,
        }
    }
}

impl From<StepsRecord> for AnyRecord {
    fn from(value: StepsRecord) -> Self {
        Self::Steps(value)
    }
}

impl From<HeartRateRecord> for AnyRecord {
    fn from(value: HeartRateRecord) -> Self {
        Self::HeartRate(value)
    }
}

impl From<Spo2Record> for AnyRecord {
    fn from(value: Spo2Record) -> Self {
        Self::Spo2(value)
    }
}

impl From<DistanceRecord> for AnyRecord {
    fn from(value: DistanceRecord) -> Self {
        Self::Distance(value)
    }
}
