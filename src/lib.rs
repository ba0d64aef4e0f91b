//! Durable offline queue for pending health telemetry, backed by embedded
//! SQLite.
//!
//! Four record kinds (steps, heart rate, blood oxygen, distance) are buffered
//! locally until a sync driver confirms delivery: `insert` commits exactly one
//! row or none, `read_batch` returns a bounded upload batch, and
//! `delete_batch` removes confirmed records atomically and idempotently.
//!
//! # Examples
//!
//! Synchronous usage with [`queue::PendingQueue`]:
//! ```
//! use vitalq::{queue::PendingQueue, record::StepsRecord, types::RecordKind};
//!
//! let mut queue = PendingQueue::open_in_memory().expect("open");
//! queue.insert(&StepsRecord {
//!     record_uid: "s1".to_string(),
//!     patient_id: "p1".to_string(),
//!     origin_id: "appA".to_string(),
//!     device_id: "d1".to_string(),
//!     start_ts: "2024-01-01T00:00:00Z".to_string(),
//!     end_ts: "2024-01-01T01:00:00Z".to_string(),
//!     count: 500,
//!     tz_offset_min: -300,
//! }.into()).expect("insert");
//!
//! let batch = queue.read_batch(RecordKind::Steps, 10).expect("read");
//! assert_eq!(batch.len(), 1);
//! let removed = queue
//!     .delete_batch(RecordKind::Steps, &["s1".to_string()])
//!     .expect("delete");
//! assert_eq!(removed, 1);
//! ```
//!
//! Async usage with the single-writer runtime handle:
//! ```
//! use vitalq::{
//!     queue::PendingQueue,
//!     record::HeartRateRecord,
//!     runtime::handle::{RuntimeConfig, spawn_pending_queue},
//!     types::RecordKind,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let queue = PendingQueue::open_in_memory().expect("open");
//! let handle = spawn_pending_queue(queue, RuntimeConfig::default());
//! handle.insert(HeartRateRecord {
//!     record_uid: "hr1".to_string(),
//!     patient_id: "p1".to_string(),
//!     origin_id: "appA".to_string(),
//!     device_id: "d1".to_string(),
//!     time_ts: "2024-01-01T00:00:00Z".to_string(),
//!     bpm: 72,
//!     tz_offset_min: 60,
//! }).await.expect("insert");
//! let batch = handle
//!     .read_batch(RecordKind::HeartRate, 10)
//!     .await
//!     .expect("read");
//! assert_eq!(batch.len(), 1);
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Kind-dispatched pending queue facade.
pub mod queue;
/// Pending telemetry records and the dispatch enum.
pub mod record;
/// Single-writer async runtime handle and events.
pub mod runtime;
/// Table definitions, structural validation, and full wipe.
pub mod schema;
/// Record store errors, repository trait, and SQLite implementation.
pub mod store;
/// Shared identifier aliases and the record-kind selector.
pub mod types;
