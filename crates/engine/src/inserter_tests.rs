// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use spr_adapters::{FakeChannel, SinkCall};
use spr_wal::{CommitToken, SegmentReader, SegmentStore, WriterConfig};
use std::sync::Arc;
use tempfile::TempDir;

fn setup(rows_per_segment: u64) -> (TempDir, FakeChannel, Inserter<FakeChannel>) {
    let dir = TempDir::new().unwrap();
    let store = SegmentStore::open(dir.path()).unwrap();
    let writer = SegmentWriter::new(
        store,
        WriterConfig {
            rows_per_segment,
            ..WriterConfig::default()
        },
    );
    let channel = FakeChannel::new();
    let inserter = Inserter::new(channel.clone(), Some(writer));
    (dir, channel, inserter)
}

fn batch(body: &str) -> RowBatch {
    RowBatch::parse(body).unwrap()
}

#[tokio::test]
async fn empty_batch_touches_nothing() {
    let (dir, channel, inserter) = setup(1000);

    let outcome = inserter.insert(&batch("[]"), true).await.unwrap();

    assert_eq!(outcome, InsertOutcome::default());
    assert!(channel.calls().is_empty());
    assert!(SegmentStore::open(dir.path()).unwrap().list().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_row_is_reported_with_original_input() {
    let (_dir, channel, inserter) = setup(1000);
    channel.reject_rows_where("a", json!("bad"), "Numeric value 'bad' is not recognized");

    let outcome = inserter
        .insert(&batch(r#"[{"a":1}, {"a":"bad"}]"#), true)
        .await
        .unwrap();

    assert_eq!(outcome.attempted, 2);
    assert_eq!(outcome.succeeded, 1);
    assert_eq!(outcome.error_count, 1);
    assert_eq!(outcome.errors[0].row_index, 1);
    assert_eq!(outcome.errors[0].input, r#"{"a":"bad"}"#);
}

#[tokio::test]
async fn rows_reach_wal_before_sink() {
    let (dir, channel, inserter) = setup(1000);

    inserter
        .insert(&batch(r#"[{"a":1},{"a":2},{"a":3}]"#), true)
        .await
        .unwrap();

    assert_eq!(channel.tokens(), vec!["file_0000000000:2".to_string()]);
    let store = SegmentStore::open(dir.path()).unwrap();
    let rows = SegmentReader::open(&store, SegmentId(0)).unwrap().count().unwrap();
    assert_eq!(rows, 3);
}

#[tokio::test]
async fn token_follows_rotation_mid_batch() {
    let (_dir, channel, inserter) = setup(4);

    inserter
        .insert(&batch(r#"[{"a":1},{"a":2},{"a":3}]"#), true)
        .await
        .unwrap();
    inserter
        .insert(&batch(r#"[{"a":4},{"a":5},{"a":6}]"#), true)
        .await
        .unwrap();

    assert_eq!(
        channel.tokens(),
        vec![
            "file_0000000000:2".to_string(),
            "file_0000000001:1".to_string()
        ]
    );
    assert_eq!(inserter.stats().await.active_segment, Some(SegmentId(1)));
}

#[tokio::test]
async fn replay_insert_does_not_append() {
    let (dir, channel, inserter) = setup(1000);
    inserter.seek(SegmentId(0), 10).await.unwrap();

    inserter
        .insert(&batch(r#"[{"a":1},{"a":2}]"#), false)
        .await
        .unwrap();
    inserter.insert(&batch(r#"[{"a":3}]"#), false).await.unwrap();

    assert_eq!(
        channel.tokens(),
        vec![
            "file_0000000000:11".to_string(),
            "file_0000000000:12".to_string()
        ]
    );
    assert!(SegmentStore::open(dir.path()).unwrap().list().unwrap().is_empty());
}

#[tokio::test]
async fn replay_insert_without_seek_fails() {
    let (_dir, channel, inserter) = setup(1000);

    let result = inserter.insert(&batch(r#"[{"a":1}]"#), false).await;

    assert!(matches!(
        result,
        Err(InsertError::Wal(WalError::NoReplayPosition))
    ));
    assert!(channel.calls().is_empty());
}

#[tokio::test]
async fn disabled_wal_uses_insert_sequence() {
    let channel = FakeChannel::new();
    let inserter = Inserter::new(channel.clone(), None);

    inserter.insert(&batch(r#"[{"a":1}]"#), true).await.unwrap();
    inserter.insert(&batch(r#"[{"a":2}]"#), true).await.unwrap();

    assert_eq!(channel.tokens(), vec!["1".to_string(), "2".to_string()]);
    assert_eq!(inserter.open_active(None).await.unwrap(), None);
    assert_eq!(inserter.stats().await.inserts, 2);
}

#[tokio::test]
async fn sink_failure_is_returned() {
    let (_dir, channel, inserter) = setup(1000);
    channel.fail_inserts(Some("connection reset"));

    let result = inserter.insert(&batch(r#"[{"a":1}]"#), true).await;

    assert!(matches!(result, Err(InsertError::Sink(_))));
    assert_eq!(inserter.stats().await.last_token, None);
}

#[tokio::test]
async fn wal_failure_skips_sink_and_next_insert_opens_new_segment() {
    let (dir, channel, inserter) = setup(2);
    inserter.open_active(None).await.unwrap();
    // A directory squatting on the next segment name makes rotation fail
    let blocker = dir.path().join(SegmentId(1).file_name());
    std::fs::create_dir(&blocker).unwrap();

    let result = inserter.insert(&batch(r#"[{"a":1},{"a":2}]"#), true).await;

    assert!(matches!(result, Err(InsertError::Wal(_))));
    assert!(!channel
        .calls()
        .iter()
        .any(|call| matches!(call, SinkCall::InsertRows { .. })));
    assert_eq!(inserter.stats().await.active_segment, None);

    std::fs::remove_dir(&blocker).unwrap();
    inserter.insert(&batch(r#"[{"a":3}]"#), true).await.unwrap();

    assert_eq!(channel.tokens(), vec!["file_0000000001:0".to_string()]);
}

#[tokio::test]
async fn rotation_triggers_purge() {
    let (dir, channel, inserter) = setup(2);
    channel.set_auto_commit(false);

    inserter.insert(&batch(r#"[{"a":1},{"a":2}]"#), true).await.unwrap();
    inserter.settle_purge().await;
    inserter.insert(&batch(r#"[{"a":3},{"a":4}]"#), true).await.unwrap();
    inserter.settle_purge().await;

    channel.set_committed(Some("file_0000000002:0"));
    inserter.insert(&batch(r#"[{"a":5},{"a":6}]"#), true).await.unwrap();
    let report = inserter.settle_purge().await.unwrap();

    assert_eq!(report.deleted, vec![SegmentId(0), SegmentId(1)]);
    let store = SegmentStore::open(dir.path()).unwrap();
    assert_eq!(store.list().unwrap(), vec![SegmentId(2), SegmentId(3)]);
}

#[tokio::test]
async fn closed_inserter_refuses_inserts() {
    let (_dir, channel, inserter) = setup(1000);
    inserter.insert(&batch(r#"[{"a":1}]"#), true).await.unwrap();

    inserter.close().await.unwrap();
    let result = inserter.insert(&batch(r#"[{"a":2}]"#), true).await;

    assert!(matches!(result, Err(InsertError::Closed)));
    assert_eq!(channel.inserts().len(), 1);
}

#[tokio::test]
async fn concurrent_inserts_get_unique_ordered_tokens() {
    let (dir, channel, inserter) = setup(10);
    let inserter = Arc::new(inserter);

    let mut tasks = Vec::new();
    for i in 0..16 {
        let inserter = Arc::clone(&inserter);
        tasks.push(tokio::spawn(async move {
            let body = format!(r#"[{{"t":{i},"r":0}},{{"t":{i},"r":1}},{{"t":{i},"r":2}}]"#);
            inserter.insert(&batch(&body), true).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let tokens: Vec<CommitToken> = channel
        .tokens()
        .iter()
        .map(|t| CommitToken::decode(t).unwrap())
        .collect();
    assert_eq!(tokens.len(), 16);
    assert!(tokens.windows(2).all(|w| w[0] < w[1]));

    // Every batch landed contiguously and in submit order
    let store = SegmentStore::open(dir.path()).unwrap();
    let mut on_disk = Vec::new();
    for id in store.list().unwrap() {
        for row in SegmentReader::open(&store, id).unwrap().rows() {
            on_disk.push(row.unwrap().row);
        }
    }
    let submitted: Vec<_> = channel
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            SinkCall::InsertRows { rows, .. } => Some(rows),
            _ => None,
        })
        .flatten()
        .collect();
    assert_eq!(on_disk.len(), 48);
    assert_eq!(on_disk, submitted);
}
