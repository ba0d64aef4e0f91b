use std::time::Duration;

use vitalq::{
    queue::PendingQueue,
    record::{AnyRecord, HeartRateRecord, StepsRecord},
    runtime::{
        events::QueueEvent,
        handle::{BatchLimits, RuntimeConfig, RuntimeError, spawn_pending_queue},
    },
    store::StoreError,
    types::RecordKind,
};

fn steps(uid: &str) -> StepsRecord {
    StepsRecord {
        record_uid: uid.to_string(),
        patient_id: "p1".to_string(),
        origin_id: "appA".to_string(),
        device_id: "d1".to_string(),
        start_ts: "2024-01-01T00:00:00Z".to_string(),
        end_ts: "2024-01-01T01:00:00Z".to_string(),
        count: 100,
        tz_offset_min: -300,
    }
}

fn hr(uid: &str) -> HeartRateRecord {
    HeartRateRecord {
        record_uid: uid.to_string(),
        patient_id: "p1".to_string(),
        origin_id: "appA".to_string(),
        device_id: "d1".to_string(),
        time_ts: "2024-01-01T00:30:00Z".to_string(),
        bpm: 72,
        tz_offset_min: -300,
    }
}

async fn next_event(sub: &mut tokio::sync::broadcast::Receiver<QueueEvent>) -> QueueEvent {
    tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("event within deadline")
        .expect("recv")
}

#[tokio::test]
async fn insert_read_delete_through_handle_with_events() {
    let queue = PendingQueue::open_in_memory().expect("open");
    let handle = spawn_pending_queue(queue, RuntimeConfig::default());
    let mut sub = handle.subscribe();

    handle.insert(steps("s1")).await.expect("insert s1");
    handle.insert(steps("s2")).await.expect("insert s2");

    let batch = handle
        .read_batch(RecordKind::Steps, 10)
        .await
        .expect("read");
    assert_eq!(batch.len(), 2);
    assert!(matches!(&batch[0], AnyRecord::Steps(r) if r.record_uid == "s1"));

    let removed = handle
        .delete_batch(
            RecordKind::Steps,
            vec!["s1".to_string(), "missing".to_string()],
        )
        .await
        .expect("delete");
    assert_eq!(removed, 1);

    assert_eq!(
        next_event(&mut sub).await,
        QueueEvent::Inserted {
            kind: RecordKind::Steps,
            uid: "s1".to_string(),
        }
    );
    assert_eq!(
        next_event(&mut sub).await,
        QueueEvent::Inserted {
            kind: RecordKind::Steps,
            uid: "s2".to_string(),
        }
    );
    assert_eq!(
        next_event(&mut sub).await,
        QueueEvent::BatchDeleted {
            kind: RecordKind::Steps,
            removed: 1,
        }
    );

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn duplicate_insert_surfaces_conflict() {
    let queue = PendingQueue::open_in_memory().expect("open");
    let handle = spawn_pending_queue(queue, RuntimeConfig::default());

    handle.insert(hr("h1")).await.expect("insert");
    let err = handle.insert(hr("h1")).await.expect_err("duplicate");
    assert!(matches!(
        err,
        RuntimeError::Store(StoreError::Conflict { .. })
    ));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn clones_share_one_writer_and_default_limits_apply() {
    let config = RuntimeConfig {
        batch_limits: BatchLimits {
            steps: 1,
            ..BatchLimits::default()
        },
        ..RuntimeConfig::default()
    };
    let queue = PendingQueue::open_in_memory().expect("open");
    let handle = spawn_pending_queue(queue, config);
    let other = handle.clone();

    handle.insert(steps("s1")).await.expect("insert");
    other.insert(steps("s2")).await.expect("insert");

    let counts = handle.pending_counts().await.expect("counts");
    assert_eq!(counts[0], (RecordKind::Steps, 2));

    // Configured default batch size caps the read.
    let batch = other
        .read_batch_default(RecordKind::Steps)
        .await
        .expect("read");
    assert_eq!(batch.len(), 1);

    handle.shutdown().await.expect("shutdown");
    let err = other.insert(steps("s3")).await.expect_err("closed");
    assert!(matches!(err, RuntimeError::ChannelClosed));
}

#[tokio::test]
async fn clear_all_wipes_every_kind_and_emits_event() {
    let queue = PendingQueue::open_in_memory().expect("open");
    let handle = spawn_pending_queue(queue, RuntimeConfig::default());
    let mut sub = handle.subscribe();

    handle.insert(steps("s1")).await.expect("insert");
    handle.insert(hr("h1")).await.expect("insert");

    let removed = handle.clear_all().await.expect("clear");
    assert_eq!(removed, 2);

    for (_, count) in handle.pending_counts().await.expect("counts") {
        assert_eq!(count, 0);
    }

    let mut saw_cleared = false;
    for _ in 0..3 {
        if next_event(&mut sub).await == QueueEvent::Cleared {
            saw_cleared = true;
            break;
        }
    }
    assert!(saw_cleared);

    handle.shutdown().await.expect("shutdown");
}
