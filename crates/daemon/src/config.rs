// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: TOML file plus `SPR_*` environment overrides.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use spr_adapters::TableRef;
use spr_engine::{EngineConfig, ReplayConfig};
use spr_wal::{FlushPolicy, WriterConfig};
use thiserror::Error;

/// Config file used when none is given and one exists in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "spr.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: String, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub sink: SinkConfig,
    pub table: TableConfig,
    pub wal: WalConfig,
    pub log: LogConfig,
}

/// HTTP listener
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

/// Ingestion sink
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SinkConfig {
    /// Root directory of the file-backed sink
    pub root: Option<PathBuf>,
    pub channel: String,
    /// How often buffered rows are committed
    #[serde(with = "humantime_serde")]
    pub commit_interval: Duration,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            root: None,
            channel: "default".to_string(),
            commit_interval: Duration::from_secs(1),
        }
    }
}

/// Target table. Every field is required once overrides are applied.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    pub database: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
}

/// Write-ahead log
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    /// Sync the WAL after every batch
    pub flush: bool,
    pub rows_per_segment: u64,
    pub replay_chunk_size: usize,
    pub commit_wait_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub commit_wait_interval: Duration,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("wal"),
            flush: true,
            rows_per_segment: 1000,
            replay_chunk_size: 20,
            commit_wait_attempts: 20,
            commit_wait_interval: Duration::from_secs(1),
        }
    }
}

/// Logging
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Log file; stdout when unset
    pub path: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: None,
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from `path` (or `spr.toml` when present), apply the process
    /// environment, and validate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let path = match path {
            Some(path) => Some(path),
            None if default_path.exists() => Some(default_path),
            None => None,
        };

        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
                Self::parse(&text)?
            }
            None => Self::default(),
        };

        config.apply_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `SPR_*` overrides; unrelated variables are ignored
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            match name.as_str() {
                "SPR_LISTEN" => {
                    self.server.listen = value
                        .parse()
                        .map_err(|_| invalid_env(&name, &value))?;
                }
                "SPR_SINK_ROOT" => self.sink.root = Some(PathBuf::from(value)),
                "SPR_DATABASE" => self.table.database = Some(value),
                "SPR_SCHEMA" => self.table.schema = Some(value),
                "SPR_TABLE" => self.table.table = Some(value),
                "SPR_WAL_DIR" => self.wal.dir = PathBuf::from(value),
                "SPR_WAL_ENABLED" => self.wal.enabled = parse_bool(&name, &value)?,
                "SPR_WAL_FLUSH" => self.wal.flush = parse_bool(&name, &value)?,
                _ => {}
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.table_ref()?;
        self.sink_root()?;
        if self.wal.rows_per_segment == 0 {
            return Err(ConfigError::Zero("wal.rows_per_segment"));
        }
        if self.wal.replay_chunk_size == 0 {
            return Err(ConfigError::Zero("wal.replay_chunk_size"));
        }
        Ok(())
    }

    pub fn table_ref(&self) -> Result<TableRef, ConfigError> {
        let required = |value: &Option<String>, name: &'static str| match value.as_deref() {
            Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
            _ => Err(ConfigError::Missing(name)),
        };
        Ok(TableRef::new(
            required(&self.table.database, "table.database")?,
            required(&self.table.schema, "table.schema")?,
            required(&self.table.table, "table.table")?,
        ))
    }

    pub fn sink_root(&self) -> Result<&Path, ConfigError> {
        self.sink
            .root
            .as_deref()
            .ok_or(ConfigError::Missing("sink.root"))
    }

    /// Lock file guarding the WAL directory against a second daemon
    pub fn lock_path(&self) -> PathBuf {
        self.wal.dir.join("wal.lock")
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            wal_enabled: self.wal.enabled,
            wal_dir: self.wal.dir.clone(),
            writer: WriterConfig {
                rows_per_segment: self.wal.rows_per_segment,
                flush: if self.wal.flush {
                    FlushPolicy::PerBatch
                } else {
                    FlushPolicy::Deferred
                },
            },
            replay: ReplayConfig {
                chunk_size: self.wal.replay_chunk_size,
                commit_wait_attempts: self.wal.commit_wait_attempts,
                commit_wait_interval: self.wal.commit_wait_interval,
            },
        }
    }
}

fn invalid_env(name: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid_env(name, value)),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
