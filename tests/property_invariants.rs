use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use vitalq::{
    record::StepsRecord,
    store::{StoreError, sqlite::PendingStore},
};

#[derive(Debug, Clone)]
enum Action {
    Insert { uid_idx: u8, count: u16 },
    DeleteBatch { uid_idxs: Vec<u8> },
    Clear,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0u8..30, 0u16..5000).prop_map(|(uid_idx, count)| Action::Insert { uid_idx, count }),
        2 => prop::collection::vec(0u8..30, 0..8)
            .prop_map(|uid_idxs| Action::DeleteBatch { uid_idxs }),
        1 => Just(Action::Clear),
    ]
}

fn uid_for(idx: u8) -> String {
    format!("u{idx:03}")
}

fn steps(uid: &str, count: i64) -> StepsRecord {
    StepsRecord {
        record_uid: uid.to_string(),
        patient_id: "p1".to_string(),
        origin_id: "appA".to_string(),
        device_id: "d1".to_string(),
        start_ts: "2024-01-01T00:00:00Z".to_string(),
        end_ts: "2024-01-01T01:00:00Z".to_string(),
        count,
        tz_offset_min: 0,
    }
}

proptest! {
    #[test]
    fn random_insert_delete_sequences_match_model(
        actions in prop::collection::vec(action_strategy(), 1..80),
    ) {
        let mut store = PendingStore::open_in_memory().expect("open");
        let mut model = BTreeMap::<String, i64>::new();

        for action in actions {
            match action {
                Action::Insert { uid_idx, count } => {
                    let uid = uid_for(uid_idx);
                    let res = store.insert(&steps(&uid, i64::from(count)));
                    if model.contains_key(&uid) {
                        let is_conflict = matches!(res, Err(StoreError::Conflict { .. }));
                        prop_assert!(is_conflict);
                    } else {
                        prop_assert!(res.is_ok());
                        model.insert(uid, i64::from(count));
                    }
                }
                Action::DeleteBatch { uid_idxs } => {
                    let uids: Vec<String> = uid_idxs.iter().map(|i| uid_for(*i)).collect();
                    let unique: BTreeSet<&String> = uids.iter().collect();
                    let expected = unique
                        .iter()
                        .filter(|uid| model.contains_key(**uid))
                        .count();

                    let removed = store
                        .delete_batch::<StepsRecord>(&uids)
                        .expect("delete");
                    prop_assert_eq!(removed, expected);

                    for uid in &uids {
                        model.remove(uid);
                    }
                }
                Action::Clear => {
                    store.clear_all().expect("clear");
                    model.clear();
                }
            }

            // The store always matches the model, ascending by uid.
            let rows = store.read_batch::<StepsRecord>(10_000).expect("read");
            prop_assert_eq!(rows.len(), model.len());
            for (row, (uid, count)) in rows.iter().zip(model.iter()) {
                prop_assert_eq!(&row.record_uid, uid);
                prop_assert_eq!(row.count, *count);
            }
        }
    }
}
