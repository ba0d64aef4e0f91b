//! Shared identifier aliases and the record-kind selector.

use serde::{Deserialize, Serialize};

/// Globally unique record identifier assigned by the producing collector.
pub type RecordUid = String;
/// Owning subject identifier.
pub type PatientId = String;
/// Logical source/app identifying the data stream.
pub type OriginId = String;
/// Physical capture device identifier.
pub type DeviceId = String;
/// Signed minutes offset from UTC at capture time.
pub type TzOffsetMin = i32;

/// Discriminator over the four persisted record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Step-count intervals.
    Steps,
    /// Heart-rate point samples.
    HeartRate,
    /// Blood-oxygen point samples.
    Spo2,
    /// Distance intervals.
    Distance,
}

impl RecordKind {
    /// Every kind, in fixed declaration order.
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Steps,
        RecordKind::HeartRate,
        RecordKind::Spo2,
        RecordKind::Distance,
    ];

    /// Name of the table backing this kind.
    pub fn table(self) -> &'static str {
        match self {
            RecordKind::Steps => "pending_steps",
            RecordKind::HeartRate => "pending_hr",
            RecordKind::Spo2 => "pending_spo2",
            RecordKind::Distance => "pending_distance",
        }
    }
}
