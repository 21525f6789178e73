// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

const FULL: &str = r#"
[server]
listen = "0.0.0.0:9000"

[sink]
root = "/var/lib/spr/sink"
channel = "ingest-1"
commit_interval = "250ms"

[table]
database = "analytics"
schema = "public"
table = "events"

[wal]
dir = "/var/lib/spr/wal"
flush = false
rows_per_segment = 500
replay_chunk_size = 50
commit_wait_attempts = 5
commit_wait_interval = "2s"

[log]
path = "/var/log/sprd.log"
filter = "debug"
"#;

fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn parses_full_config() {
    let config = Config::parse(FULL).unwrap();

    assert_eq!(config.server.listen, "0.0.0.0:9000".parse().unwrap());
    assert_eq!(config.sink.channel, "ingest-1");
    assert_eq!(config.sink.commit_interval, Duration::from_millis(250));
    assert_eq!(
        config.table_ref().unwrap(),
        TableRef::new("analytics", "public", "events")
    );
    assert_eq!(config.wal.commit_wait_interval, Duration::from_secs(2));
    assert_eq!(config.log.path, Some(PathBuf::from("/var/log/sprd.log")));
    config.validate().unwrap();
}

#[test]
fn defaults_match_documented_values() {
    let config = Config::parse("").unwrap();

    assert_eq!(config.server.listen, "127.0.0.1:8080".parse().unwrap());
    assert_eq!(config.sink.channel, "default");
    assert!(config.wal.enabled);
    assert!(config.wal.flush);
    assert_eq!(config.wal.rows_per_segment, 1000);
    assert_eq!(config.wal.replay_chunk_size, 20);
    assert_eq!(config.wal.commit_wait_attempts, 20);
    assert_eq!(config.wal.commit_wait_interval, Duration::from_secs(1));
    assert_eq!(config.log.filter, "info");
}

#[test]
fn engine_config_maps_wal_settings() {
    let engine = Config::parse(FULL).unwrap().engine_config();

    assert!(engine.wal_enabled);
    assert_eq!(engine.wal_dir, PathBuf::from("/var/lib/spr/wal"));
    assert_eq!(engine.writer.rows_per_segment, 500);
    assert_eq!(engine.writer.flush, FlushPolicy::Deferred);
    assert_eq!(engine.replay.chunk_size, 50);
    assert_eq!(engine.replay.commit_wait_attempts, 5);
}

#[test]
fn env_overrides_file_values() {
    let mut config = Config::parse(FULL).unwrap();

    config
        .apply_env(env(&[
            ("SPR_LISTEN", "127.0.0.1:7000"),
            ("SPR_TABLE", "other"),
            ("SPR_WAL_ENABLED", "false"),
            ("SPR_WAL_FLUSH", "1"),
            ("SPR_WAL_DIR", "/tmp/wal"),
            ("HOME", "/root"),
        ]))
        .unwrap();

    assert_eq!(config.server.listen, "127.0.0.1:7000".parse().unwrap());
    assert_eq!(config.table.table.as_deref(), Some("other"));
    assert!(!config.wal.enabled);
    assert!(config.wal.flush);
    assert_eq!(config.lock_path(), PathBuf::from("/tmp/wal/wal.lock"));
}

#[test]
fn env_can_supply_everything() {
    let mut config = Config::default();

    config
        .apply_env(env(&[
            ("SPR_SINK_ROOT", "/data"),
            ("SPR_DATABASE", "db"),
            ("SPR_SCHEMA", "s"),
            ("SPR_TABLE", "t"),
        ]))
        .unwrap();

    config.validate().unwrap();
    assert_eq!(config.sink_root().unwrap(), Path::new("/data"));
}

#[parameterized(
    listen = { "SPR_LISTEN", "not-an-addr" },
    enabled = { "SPR_WAL_ENABLED", "maybe" },
    flush = { "SPR_WAL_FLUSH", "" },
)]
fn env_rejects_invalid_values(name: &str, value: &str) {
    let mut config = Config::default();

    let err = config.apply_env(env(&[(name, value)])).unwrap_err();

    assert!(matches!(err, ConfigError::InvalidEnv { .. }));
}

#[parameterized(
    database = { "[table]\nschema = \"s\"\ntable = \"t\"\n[sink]\nroot = \"/r\"", "table.database" },
    blank_table = { "[table]\ndatabase = \"d\"\nschema = \"s\"\ntable = \" \"\n[sink]\nroot = \"/r\"", "table.table" },
    sink_root = { "[table]\ndatabase = \"d\"\nschema = \"s\"\ntable = \"t\"", "sink.root" },
)]
fn validate_reports_missing_settings(text: &str, missing: &str) {
    let err = Config::parse(text).unwrap().validate().unwrap_err();

    assert_eq!(err.to_string(), format!("missing required setting: {}", missing));
}

#[test]
fn validate_rejects_zero_thresholds() {
    let mut config = Config::parse(FULL).unwrap();
    config.wal.rows_per_segment = 0;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Zero("wal.rows_per_segment"))
    ));
}

#[test]
fn unknown_keys_are_rejected() {
    let result = Config::parse("[wal]\nrow_per_segment = 5\n");

    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spr.toml");
    std::fs::write(&path, FULL).unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.sink.channel, "ingest-1");
}

#[test]
fn load_missing_file_fails() {
    let result = Config::load(Some(Path::new("/nonexistent/spr.toml")));

    assert!(matches!(result, Err(ConfigError::Read(..))));
}
