// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::TempDir;

const IDLE: Duration = Duration::from_secs(3600);

fn table() -> TableRef {
    TableRef::new("db", "public", "events")
}

fn row(value: serde_json::Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn setup(columns: Option<&str>) -> (TempDir, LocalSink) {
    let dir = TempDir::new().unwrap();
    let sink = LocalSink::new(dir.path(), IDLE);
    let table_dir = sink.table_dir(&table());
    fs::create_dir_all(&table_dir).unwrap();
    if let Some(columns) = columns {
        fs::write(table_dir.join(COLUMNS_FILE), columns).unwrap();
    }
    (dir, sink)
}

#[tokio::test]
async fn open_missing_table_fails() {
    let dir = TempDir::new().unwrap();
    let sink = LocalSink::new(dir.path(), IDLE);

    let result = sink
        .open_channel("c1", &TableRef::new("db", "public", "nope"))
        .await;

    match result {
        Err(e @ SinkError::TableNotFound(_)) => {
            assert_eq!(
                e.to_string(),
                "Table not found (or no permissions): DB.PUBLIC.NOPE"
            );
        }
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("expected TableNotFound"),
    }
}

#[tokio::test]
async fn open_rejects_path_like_channel_names() {
    let (_dir, sink) = setup(None);
    for name in ["", "../x", "a/b", ".hidden"] {
        assert!(matches!(
            sink.open_channel(name, &table()).await,
            Err(SinkError::InvalidChannel(_))
        ));
    }
}

#[tokio::test]
async fn fresh_channel_has_no_committed_token() {
    let (_dir, sink) = setup(None);
    let channel = sink.open_channel("c1", &table()).await.unwrap();

    assert_eq!(channel.name(), "c1");
    assert_eq!(channel.latest_committed_token().await.unwrap(), None);
}

#[tokio::test]
async fn token_becomes_visible_after_commit() {
    let (_dir, sink) = setup(None);
    let channel = sink.open_channel("c1", &table()).await.unwrap();

    channel
        .insert_rows(&[row(json!({"a": 1}))], "t-1")
        .await
        .unwrap();
    assert_eq!(channel.latest_committed_token().await.unwrap(), None);

    assert_eq!(channel.flush().await.unwrap(), Some("t-1".to_string()));
    assert_eq!(
        channel.latest_committed_token().await.unwrap(),
        Some("t-1".to_string())
    );
}

#[tokio::test]
async fn committed_rows_and_token_persist() {
    let (_dir, sink) = setup(None);
    {
        let channel = sink.open_channel("c1", &table()).await.unwrap();
        channel
            .insert_rows(&[row(json!({"a": 1})), row(json!({"a": 2}))], "t-1")
            .await
            .unwrap();
        channel
            .insert_rows(&[row(json!({"a": 3}))], "t-2")
            .await
            .unwrap();
        channel.close().await.unwrap();
    }

    let rows = fs::read_to_string(sink.table_dir(&table()).join(ROWS_FILE)).unwrap();
    assert_eq!(rows.lines().count(), 3);

    let reopened = sink.open_channel("c1", &table()).await.unwrap();
    assert_eq!(
        reopened.latest_committed_token().await.unwrap(),
        Some("t-2".to_string())
    );
}

#[tokio::test]
async fn channels_track_tokens_separately() {
    let (_dir, sink) = setup(None);
    let c1 = sink.open_channel("c1", &table()).await.unwrap();
    let c2 = sink.open_channel("c2", &table()).await.unwrap();

    c1.insert_rows(&[row(json!({"a": 1}))], "x").await.unwrap();
    c1.flush().await.unwrap();

    assert_eq!(c2.latest_committed_token().await.unwrap(), None);
}

#[tokio::test]
async fn unknown_columns_are_rejected_per_row() {
    let (_dir, sink) = setup(Some("A\nb\n"));
    let channel = sink.open_channel("c1", &table()).await.unwrap();

    let result = channel
        .insert_rows(
            &[
                row(json!({"a": 1, "B": 2})),
                row(json!({"a": 1, "zzz": 2})),
                row(json!({"b": 3})),
            ],
            "t-1",
        )
        .await
        .unwrap();

    assert_eq!(result.error_count(), 1);
    assert_eq!(result.errors[0].row_index, 1);
    assert!(result.errors[0].message.contains("ZZZ"));

    channel.flush().await.unwrap();
    let rows = fs::read_to_string(sink.table_dir(&table()).join(ROWS_FILE)).unwrap();
    assert_eq!(rows.lines().count(), 2);
}

#[tokio::test]
async fn fully_rejected_batch_still_advances_token() {
    let (_dir, sink) = setup(Some("a"));
    let channel = sink.open_channel("c1", &table()).await.unwrap();

    channel
        .insert_rows(&[row(json!({"nope": 1}))], "t-9")
        .await
        .unwrap();
    channel.flush().await.unwrap();

    assert_eq!(
        channel.latest_committed_token().await.unwrap(),
        Some("t-9".to_string())
    );
}

#[tokio::test]
async fn closed_channel_refuses_inserts() {
    let (_dir, sink) = setup(None);
    let channel = sink.open_channel("c1", &table()).await.unwrap();
    channel.close().await.unwrap();

    let result = channel.insert_rows(&[row(json!({"a": 1}))], "t").await;

    assert!(matches!(result, Err(SinkError::ChannelClosed(_))));
}

#[tokio::test]
async fn background_committer_publishes_token() {
    let dir = TempDir::new().unwrap();
    let sink = LocalSink::new(dir.path(), Duration::from_millis(10));
    fs::create_dir_all(sink.table_dir(&table())).unwrap();
    let channel = sink.open_channel("c1", &table()).await.unwrap();

    channel
        .insert_rows(&[row(json!({"a": 1}))], "t-1")
        .await
        .unwrap();

    let mut committed = None;
    for _ in 0..200 {
        committed = channel.latest_committed_token().await.unwrap();
        if committed.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(committed, Some("t-1".to_string()));
}
