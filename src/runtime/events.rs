//! Queue event stream payloads.

use crate::types::{RecordKind, RecordUid};

/// Events emitted from the single-writer queue loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// A record was durably enqueued.
    Inserted {
        /// Record kind.
        kind: RecordKind,
        /// Enqueued record uid.
        uid: RecordUid,
    },
    /// A delete batch committed.
    BatchDeleted {
        /// Record kind.
        kind: RecordKind,
        /// Rows removed.
        removed: usize,
    },
    /// Every record table was wiped.
    Cleared,
}
