//! Integration tests for the durable call store.
//!
//! Uses a real SQLite file in a tempdir and reopens it to verify that
//! queue order, sequence assignment, and the batch UUID memo survive a
//! process restart, and that a corrupted file is recreated empty.

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use beacon_core::CallStore;
use beacon_domain::constants::{
    ACTION_SET_USER_ATTRIBUTES, ACTION_START, ACTION_STOP, ACTION_TRACK,
};
use support::{background_start, deferred_call, TestDatabase};

#[tokio::test]
async fn queue_order_survives_restart() {
    let db = TestDatabase::new();

    {
        let store = db.open_store();
        for action in [ACTION_START, ACTION_TRACK, ACTION_SET_USER_ATTRIBUTES] {
            store.append(deferred_call(action)).await.unwrap();
        }
    }

    let reopened = db.open_store();
    let calls = reopened.read_prefix(10).await.unwrap();
    assert_eq!(
        calls.iter().map(|c| c.action.as_str()).collect::<Vec<_>>(),
        vec![ACTION_START, ACTION_TRACK, ACTION_SET_USER_ATTRIBUTES]
    );

    // New appends continue the sequence rather than colliding with it.
    reopened.append(deferred_call(ACTION_STOP)).await.unwrap();
    let all = reopened.read_prefix(10).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].sequence_id < w[1].sequence_id));
}

#[tokio::test]
async fn background_start_flag_round_trips_through_storage() {
    let db = TestDatabase::new();
    let store = db.open_store();

    store.append(background_start()).await.unwrap();
    store.append(deferred_call(ACTION_START)).await.unwrap();

    let calls = store.read_prefix(10).await.unwrap();
    assert!(calls[0].is_background_start);
    assert!(!calls[1].is_background_start);
}

#[tokio::test]
async fn batch_uuid_memo_survives_restart() {
    let db = TestDatabase::new();

    let uuid = {
        let store = db.open_store();
        store.append(deferred_call(ACTION_TRACK)).await.unwrap();
        store.batch_uuid(1).await.unwrap()
    };

    let reopened = db.open_store();
    assert_eq!(reopened.batch_uuid(1).await.unwrap(), uuid);

    reopened.append(deferred_call(ACTION_TRACK)).await.unwrap();
    assert_ne!(reopened.batch_uuid(2).await.unwrap(), uuid);
}

#[tokio::test]
async fn corrupted_database_file_is_recreated_empty() {
    let db = TestDatabase::new();
    std::fs::write(db.db_path(), b"garbage bytes that are not a sqlite file").unwrap();

    let store = db.open_store();
    assert_eq!(store.count().await.unwrap(), 0);

    // The recreated store accepts new telemetry immediately.
    store.append(deferred_call(ACTION_START)).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_appends_all_land_with_distinct_positions() {
    let db = TestDatabase::new();
    let store = db.open_store();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.append(deferred_call(ACTION_TRACK)).await.unwrap()
        }));
    }

    let mut sequence_ids = Vec::new();
    for handle in handles {
        sequence_ids.push(handle.await.unwrap());
    }

    sequence_ids.sort_unstable();
    sequence_ids.dedup();
    assert_eq!(sequence_ids.len(), 10);
    assert_eq!(store.count().await.unwrap(), 10);
}
