use rusqlite::Connection;
use tempfile::TempDir;

use vitalq::{
    record::{HeartRateRecord, StepsRecord},
    schema,
    store::{
        StoreError,
        sqlite::{PendingStore, SchemaPolicy},
    },
};

fn steps(uid: &str) -> StepsRecord {
    StepsRecord {
        record_uid: uid.to_string(),
        patient_id: "p1".to_string(),
        origin_id: "appA".to_string(),
        device_id: "d1".to_string(),
        start_ts: "2024-01-01T00:00:00Z".to_string(),
        end_ts: "2024-01-01T01:00:00Z".to_string(),
        count: 1,
        tz_offset_min: 0,
    }
}

fn mismatch_diff(err: StoreError) -> schema::SchemaDiff {
    match err {
        StoreError::SchemaMismatch(diff) => diff,
        other => panic!("expected schema mismatch, got {other:?}"),
    }
}

#[test]
fn fresh_store_provisions_layout_and_marker() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("fresh.db");

    drop(PendingStore::open(&db_path).expect("open"));

    let conn = Connection::open(&db_path).expect("raw open");
    let identity: String = conn
        .query_row(
            "SELECT identity_hash FROM queue_master WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .expect("identity row");
    assert_eq!(identity, schema::SCHEMA_IDENTITY);
    drop(conn);

    // A second open validates the existing layout without complaint.
    drop(PendingStore::open(&db_path).expect("reopen"));
}

#[test]
fn wrong_column_type_is_rejected_with_diff() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("wrong_type.db");
    drop(PendingStore::open(&db_path).expect("seed"));

    let conn = Connection::open(&db_path).expect("raw open");
    conn.execute_batch(
        "DROP TABLE pending_steps;
         CREATE TABLE pending_steps (recordUid TEXT NOT NULL, patientId TEXT NOT NULL, \
          originId TEXT NOT NULL, deviceId TEXT NOT NULL, startTs TEXT NOT NULL, \
          endTs TEXT NOT NULL, count TEXT NOT NULL, tzOffsetMin INTEGER NOT NULL, \
          PRIMARY KEY(recordUid));",
    )
    .expect("rewrite table");
    drop(conn);

    let diff = mismatch_diff(PendingStore::open(&db_path).expect_err("open"));
    let table = diff
        .tables
        .iter()
        .find(|t| t.table == "pending_steps")
        .expect("steps diff");
    assert!(table.changed.iter().any(|line| line.contains("count")));
}

#[test]
fn missing_column_is_reported() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("missing_col.db");
    drop(PendingStore::open(&db_path).expect("seed"));

    let conn = Connection::open(&db_path).expect("raw open");
    conn.execute_batch(
        "DROP TABLE pending_hr;
         CREATE TABLE pending_hr (recordUid TEXT NOT NULL, patientId TEXT NOT NULL, \
          originId TEXT NOT NULL, deviceId TEXT NOT NULL, timeTs TEXT NOT NULL, \
          tzOffsetMin INTEGER NOT NULL, PRIMARY KEY(recordUid));",
    )
    .expect("rewrite table");
    drop(conn);

    let diff = mismatch_diff(PendingStore::open(&db_path).expect_err("open"));
    let table = diff
        .tables
        .iter()
        .find(|t| t.table == "pending_hr")
        .expect("hr diff");
    assert!(table.missing.iter().any(|line| line.contains("bpm")));
}

#[test]
fn identity_mismatch_detected_even_with_matching_tables() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("identity.db");
    drop(PendingStore::open(&db_path).expect("seed"));

    let conn = Connection::open(&db_path).expect("raw open");
    conn.execute(
        "UPDATE queue_master SET identity_hash = 'deadbeef' WHERE id = 1",
        [],
    )
    .expect("rewrite identity");
    drop(conn);

    let diff = mismatch_diff(PendingStore::open(&db_path).expect_err("open"));
    let identity = diff.identity.expect("identity diff");
    assert_eq!(identity.found.as_deref(), Some("deadbeef"));
    assert!(diff.tables.is_empty());
}

#[test]
fn partial_layout_is_rejected() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("partial.db");

    let conn = Connection::open(&db_path).expect("raw open");
    conn.execute_batch(
        "CREATE TABLE pending_steps (recordUid TEXT NOT NULL, patientId TEXT NOT NULL, \
          originId TEXT NOT NULL, deviceId TEXT NOT NULL, startTs TEXT NOT NULL, \
          endTs TEXT NOT NULL, count INTEGER NOT NULL, tzOffsetMin INTEGER NOT NULL, \
          PRIMARY KEY(recordUid));",
    )
    .expect("create lone table");
    drop(conn);

    let diff = mismatch_diff(PendingStore::open(&db_path).expect_err("open"));
    assert!(diff.identity.is_some());
    assert!(diff.tables.iter().any(|t| t.table == "pending_hr"));
}

#[test]
fn recreate_on_mismatch_rebuilds_an_empty_store() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("recreate.db");

    let mut seeded = PendingStore::open(&db_path).expect("seed");
    seeded.insert(&steps("s1")).expect("insert");
    drop(seeded);

    let conn = Connection::open(&db_path).expect("raw open");
    conn.execute_batch(
        "DROP TABLE pending_steps;
         CREATE TABLE pending_steps (recordUid TEXT NOT NULL, wrong TEXT NOT NULL, \
          PRIMARY KEY(recordUid));",
    )
    .expect("rewrite table");
    drop(conn);

    assert!(PendingStore::open(&db_path).is_err());

    let rebuilt =
        PendingStore::open_with(&db_path, SchemaPolicy::RecreateOnMismatch).expect("rebuild");
    assert_eq!(rebuilt.count::<StepsRecord>().expect("count"), 0);
    assert_eq!(rebuilt.count::<HeartRateRecord>().expect("count"), 0);
    drop(rebuilt);

    // Rebuilt layout validates under the default policy.
    drop(PendingStore::open(&db_path).expect("reopen"));
}
