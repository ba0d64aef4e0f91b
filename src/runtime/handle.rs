use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::{
    queue::PendingQueue,
    record::AnyRecord,
    store::{StoreError, StoreResult},
    types::{RecordKind, RecordUid},
};

use super::events::QueueEvent;

/// Failures surfaced by the async handle.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Store-level failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The queue loop has shut down.
    #[error("queue loop closed")]
    ChannelClosed,
    /// A blocking storage task failed to complete.
    #[error("storage task failed: {0}")]
    Task(String),
}

/// Per-kind default batch sizes used by [`QueueHandle::read_batch_default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Steps batch size.
    pub steps: usize,
    /// Heart-rate batch size.
    pub heart_rate: usize,
    /// Blood-oxygen batch size.
    pub spo2: usize,
    /// Distance batch size.
    pub distance: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            steps: 500,
            heart_rate: 1000,
            spo2: 1000,
            distance: 500,
        }
    }
}

impl BatchLimits {
    /// Limit for one kind.
    pub fn for_kind(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Steps => self.steps,
            RecordKind::HeartRate => self.heart_rate,
            RecordKind::Spo2 => self.spo2,
            RecordKind::Distance => self.distance,
        }
    }
}

/// Queue-loop tuning knobs.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Bound of the command channel.
    pub cmd_queue_bound: usize,
    /// Capacity of the event broadcast channel.
    pub events_capacity: usize,
    /// Default per-kind batch sizes.
    pub batch_limits: BatchLimits,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cmd_queue_bound: 256,
            events_capacity: 1024,
            batch_limits: BatchLimits::default(),
        }
    }
}

/// Cloneable async handle to the single-writer queue loop.
pub struct QueueHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<QueueEvent>,
    batch_limits: BatchLimits,
}

impl Clone for QueueHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
            batch_limits: self.batch_limits,
        }
    }
}

enum Command {
    Insert {
        record: AnyRecord,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    ReadBatch {
        kind: RecordKind,
        limit: usize,
        resp: oneshot::Sender<Result<Vec<AnyRecord>, RuntimeError>>,
    },
    DeleteBatch {
        kind: RecordKind,
        uids: Vec<RecordUid>,
        resp: oneshot::Sender<Result<usize, RuntimeError>>,
    },
    ClearAll {
        resp: oneshot::Sender<Result<usize, RuntimeError>>,
    },
    Counts {
        resp: oneshot::Sender<Result<[(RecordKind, u64); 4], RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Spawns the queue loop and returns its handle.
///
/// The loop owns `queue`, applies commands strictly in arrival order, and runs
/// each storage operation to completion on the blocking pool. Dropping a
/// caller future abandons only the reply; an in-flight transaction still
/// commits or rolls back.
pub fn spawn_pending_queue(queue: PendingQueue, config: RuntimeConfig) -> QueueHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.cmd_queue_bound);
    let (events_tx, _) = broadcast::channel::<QueueEvent>(config.events_capacity);
    let batch_limits = config.batch_limits;

    let events_tx_loop = events_tx.clone();
    tokio::spawn(async move {
        let mut queue = queue;
        while let Some(cmd) = cmd_rx.recv().await {
            match handle_command(queue, cmd, &events_tx_loop).await {
                Some(q) => queue = q,
                None => break,
            }
        }
    });

    QueueHandle {
        cmd_tx,
        events_tx,
        batch_limits,
    }
}

impl QueueHandle {
    /// Subscribes to queue events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events_tx.subscribe()
    }

    /// Durably enqueues one record.
    pub async fn insert(&self, record: impl Into<AnyRecord>) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Insert {
                record: record.into(),
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Reads up to `limit` pending records of `kind`.
    pub async fn read_batch(
        &self,
        kind: RecordKind,
        limit: usize,
    ) -> Result<Vec<AnyRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ReadBatch {
                kind,
                limit,
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Reads a batch of `kind` using the configured default limit.
    pub async fn read_batch_default(
        &self,
        kind: RecordKind,
    ) -> Result<Vec<AnyRecord>, RuntimeError> {
        self.read_batch(kind, self.batch_limits.for_kind(kind)).await
    }

    /// Deletes the named records of `kind`; returns rows removed.
    pub async fn delete_batch(
        &self,
        kind: RecordKind,
        uids: Vec<RecordUid>,
    ) -> Result<usize, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::DeleteBatch {
                kind,
                uids,
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Empties every record table; returns rows removed.
    pub async fn clear_all(&self) -> Result<usize, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ClearAll { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Pending row counts per kind, in [`RecordKind::ALL`] order.
    pub async fn pending_counts(&self) -> Result<[(RecordKind, u64); 4], RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Counts { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Stops the loop once all previously queued commands complete.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

async fn handle_command(
    queue: PendingQueue,
    cmd: Command,
    events_tx: &broadcast::Sender<QueueEvent>,
) -> Option<PendingQueue> {
    match cmd {
        Command::Insert { record, resp } => {
            let kind = record.kind();
            let uid = record.uid().to_owned();
            let (queue, res) = run_blocking(queue, move |q| q.insert(&record)).await;
            if res.is_ok() {
                let _ = events_tx.send(QueueEvent::Inserted { kind, uid });
            }
            let _ = resp.send(res);
            queue
        }
        Command::ReadBatch { kind, limit, resp } => {
            let (queue, res) = run_blocking(queue, move |q| q.read_batch(kind, limit)).await;
            let _ = resp.send(res);
            queue
        }
        Command::DeleteBatch { kind, uids, resp } => {
            let (queue, res) = run_blocking(queue, move |q| q.delete_batch(kind, &uids)).await;
            if let Ok(removed) = &res {
                let _ = events_tx.send(QueueEvent::BatchDeleted {
                    kind,
                    removed: *removed,
                });
            }
            let _ = resp.send(res);
            queue
        }
        Command::ClearAll { resp } => {
            let (queue, res) = run_blocking(queue, |q| q.clear_all()).await;
            if res.is_ok() {
                let _ = events_tx.send(QueueEvent::Cleared);
            }
            let _ = resp.send(res);
            queue
        }
        Command::Counts { resp } => {
            let (queue, res) = run_blocking(queue, |q| q.pending_counts()).await;
            let _ = resp.send(res);
            queue
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            None
        }
    }
}

async fn run_blocking<T: Send + 'static>(
    queue: PendingQueue,
    op: impl FnOnce(&mut PendingQueue) -> StoreResult<T> + Send + 'static,
) -> (Option<PendingQueue>, Result<T, RuntimeError>) {
    match tokio::task::spawn_blocking(move || {
        let mut queue = queue;
        let out = op(&mut queue);
        (queue, out)
    })
    .await
    {
        Ok((queue, out)) => (Some(queue), out.map_err(RuntimeError::from)),
        Err(err) => (None, Err(RuntimeError::Task(err.to_string()))),
    }
}
