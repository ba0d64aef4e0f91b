//! Kind-dispatched facade over the record store.

use std::path::Path;

use crate::{
    record::{AnyRecord, DistanceRecord, HeartRateRecord, Spo2Record, StepsRecord},
    store::{
        StoreResult,
        sqlite::{PendingStore, SchemaPolicy},
    },
    types::{RecordKind, RecordUid},
};

/// Uniform {insert, read batch, delete batch, clear all} surface over the four
/// record kinds.
///
/// Performs no buffering of its own; every call passes straight through to the
/// store. Construct explicitly and pass where needed; no global instance
/// exists.
pub struct PendingQueue {
    store: PendingStore,
}

impl PendingQueue {
    /// Opens or creates the backing store at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self {
            store: PendingStore::open(path)?,
        })
    }

    /// Opens or creates the backing store with an explicit mismatch policy.
    pub fn open_with(path: impl AsRef<Path>, policy: SchemaPolicy) -> StoreResult<Self> {
        Ok(Self {
            store: PendingStore::open_with(path, policy)?,
        })
    }

    /// Opens an in-memory queue.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            store: PendingStore::open_in_memory()?,
        })
    }

    /// Wraps an already-opened store.
    pub fn new(store: PendingStore) -> Self {
        Self { store }
    }

    /// Durably enqueues one record; a duplicate uid aborts with
    /// [`crate::store::StoreError::Conflict`].
    pub fn insert(&mut self, record: &AnyRecord) -> StoreResult<()> {
        match record {
            AnyRecord::Steps(r) => self.store.insert(r),
            AnyRecord::HeartRate(r) => self.store.insert(r),
            AnyRecord::Spo2(r) => self.store.insert(r),
            AnyRecord::Distance(r) => self.store.insert(r),
        }
    }

    /// Reads up to `limit` pending records of `kind`, ascending by uid.
    pub fn read_batch(&self, kind: RecordKind, limit: usize) -> StoreResult<Vec<AnyRecord>> {
        Ok(match kind {
            RecordKind::Steps => wrap(self.store.read_batch::<StepsRecord>(limit)?),
            RecordKind::HeartRate => wrap(self.store.read_batch::<HeartRateRecord>(limit)?),
            RecordKind::Spo2 => wrap(self.store.read_batch::<Spo2Record>(limit)?),
            RecordKind::Distance => wrap(self.store.read_batch::<DistanceRecord>(limit)?),
        })
    }

    /// Deletes the named records of `kind`; unknown ids are ignored. Returns
    /// rows removed.
    pub fn delete_batch(&mut self, kind: RecordKind, uids: &[RecordUid]) -> StoreResult<usize> {
        match kind {
            RecordKind::Steps => self.store.delete_batch::<StepsRecord>(uids),
            RecordKind::HeartRate => self.store.delete_batch::<HeartRateRecord>(uids),
            RecordKind::Spo2 => self.store.delete_batch::<Spo2Record>(uids),
            RecordKind::Distance => self.store.delete_batch::<DistanceRecord>(uids),
        }
    }

    /// Empties every record table and reclaims file space. Returns rows
    /// removed across all kinds.
    pub fn clear_all(&mut self) -> StoreResult<usize> {
        self.store.clear_all()
    }

    /// Pending row count for one kind.
    pub fn count(&self, kind: RecordKind) -> StoreResult<u64> {
        match kind {
            RecordKind::Steps => self.store.count::<StepsRecord>(),
            RecordKind::HeartRate => self.store.count::<HeartRateRecord>(),
            RecordKind::Spo2 => self.store.count::<Spo2Record>(),
            RecordKind::Distance => self.store.count::<DistanceRecord>(),
        }
    }

    /// Pending row counts for every kind, in [`RecordKind::ALL`] order.
    pub fn pending_counts(&self) -> StoreResult<[(RecordKind, u64); 4]> {
        let mut out = [(RecordKind::Steps, 0u64); 4];
        for (slot, kind) in out.iter_mut().zip(RecordKind::ALL) {
            *slot = (kind, self.count(kind)?);
        }
        Ok(out)
    }

    /// Read access to the typed store.
    pub fn store(&self) -> &PendingStore {
        &self.store
    }

    /// Mutable access to the typed store.
    pub fn store_mut(&mut self) -> &mut PendingStore {
        &mut self.store
    }
}

fn wrap<R: Into<AnyRecord>>(records: Vec<R>) -> Vec<AnyRecord> {
    records.into_iter().map(Into::into).collect()
}
