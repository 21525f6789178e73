// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed sink for single-host deployments and local development
//!
//! Layout under the sink root:
//!
//! ```text
//! <root>/<database>/<schema>/<table>/
//!     columns                  optional, one accepted column name per line
//!     rows.jsonl               committed rows
//!     channels/<name>.offset   latest committed token of each channel
//! ```
//!
//! A table exists when its directory exists. Accepted rows are buffered and
//! committed by a background task every `commit_interval`, so the committed
//! token trails inserts the same way a remote streaming sink's does.

use super::{Channel, Row, RowError, Sink, SinkError, TableRef, ValidationResult};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

const ROWS_FILE: &str = "rows.jsonl";
const COLUMNS_FILE: &str = "columns";
const CHANNELS_DIR: &str = "channels";

/// Sink writing committed rows into a directory tree
#[derive(Debug, Clone)]
pub struct LocalSink {
    root: PathBuf,
    commit_interval: Duration,
}

impl LocalSink {
    pub fn new(root: impl Into<PathBuf>, commit_interval: Duration) -> Self {
        Self {
            root: root.into(),
            commit_interval,
        }
    }

    pub fn table_dir(&self, table: &TableRef) -> PathBuf {
        self.root
            .join(&table.database)
            .join(&table.schema)
            .join(&table.table)
    }
}

#[async_trait]
impl Sink for LocalSink {
    type Channel = LocalChannel;

    async fn open_channel(&self, name: &str, table: &TableRef) -> Result<LocalChannel, SinkError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(SinkError::InvalidChannel(name.to_string()));
        }

        let table_dir = self.table_dir(table);
        if !table_dir.is_dir() {
            return Err(SinkError::TableNotFound(table.clone()));
        }

        let columns = read_columns(&table_dir.join(COLUMNS_FILE))?;
        fs::create_dir_all(table_dir.join(CHANNELS_DIR))?;
        let offset_path = table_dir.join(CHANNELS_DIR).join(format!("{}.offset", name));
        let committed = read_offset(&offset_path)?;

        tracing::info!(
            channel = name,
            %table,
            committed = ?committed,
            "opened local sink channel"
        );

        let inner = Arc::new(LocalInner {
            name: name.to_string(),
            rows_path: table_dir.join(ROWS_FILE),
            offset_path,
            columns,
            state: Mutex::new(LocalState {
                pending: Vec::new(),
                committed,
                closed: false,
            }),
            commit_lock: Mutex::new(()),
        });

        spawn_committer(Arc::downgrade(&inner), self.commit_interval);

        Ok(LocalChannel { inner })
    }
}

/// Channel into a [`LocalSink`] table
#[derive(Clone)]
pub struct LocalChannel {
    inner: Arc<LocalInner>,
}

struct LocalInner {
    name: String,
    rows_path: PathBuf,
    offset_path: PathBuf,
    /// Upper-cased accepted column names; `None` accepts any column
    columns: Option<BTreeSet<String>>,
    state: Mutex<LocalState>,
    /// Serializes commits so the persisted token never moves backwards
    commit_lock: Mutex<()>,
}

struct LocalState {
    pending: Vec<PendingBatch>,
    committed: Option<String>,
    closed: bool,
}

struct PendingBatch {
    rows: Vec<Row>,
    token: String,
}

impl LocalChannel {
    /// Commit buffered batches now instead of waiting for the next tick
    pub async fn flush(&self) -> Result<Option<String>, SinkError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.commit_pending())
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?
            .map_err(SinkError::from)
    }
}

#[async_trait]
impl Channel for LocalChannel {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn insert_rows(&self, rows: &[Row], token: &str) -> Result<ValidationResult, SinkError> {
        let mut result = ValidationResult::default();
        let mut accepted = Vec::with_capacity(rows.len());

        for (row_index, row) in rows.iter().enumerate() {
            match self.inner.validate(row) {
                Ok(()) => accepted.push(row.clone()),
                Err(message) => result.errors.push(RowError { row_index, message }),
            }
        }

        let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.closed {
            return Err(SinkError::ChannelClosed(self.inner.name.clone()));
        }
        // The token advances even when every row was rejected
        state.pending.push(PendingBatch {
            rows: accepted,
            token: token.to_string(),
        });

        Ok(result)
    }

    async fn latest_committed_token(&self) -> Result<Option<String>, SinkError> {
        let state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state.committed.clone())
    }

    async fn close(&self) -> Result<(), SinkError> {
        {
            let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
            state.closed = true;
        }
        self.flush().await?;
        tracing::info!(channel = %self.inner.name, "closed local sink channel");
        Ok(())
    }
}

impl LocalInner {
    fn validate(&self, row: &Row) -> Result<(), String> {
        let Some(columns) = &self.columns else {
            return Ok(());
        };
        match row
            .keys()
            .find(|key| !columns.contains(&key.to_uppercase()))
        {
            Some(key) => Err(format!(
                "Extra column: {}. Columns not present in the table shouldn't be specified.",
                key.to_uppercase()
            )),
            None => Ok(()),
        }
    }

    /// Write every buffered batch, then publish the newest token
    fn commit_pending(&self) -> io::Result<Option<String>> {
        let _commit = self.commit_lock.lock().unwrap_or_else(|e| e.into_inner());

        let batches = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut state.pending)
        };
        let Some(token) = batches.last().map(|b| b.token.clone()) else {
            return Ok(None);
        };

        if let Err(e) = self.write_batches(&batches, &token) {
            // Put the batches back in front of anything queued meanwhile
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let queued = std::mem::replace(&mut state.pending, batches);
            state.pending.extend(queued);
            return Err(e);
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.committed = Some(token.clone());
        tracing::debug!(channel = %self.name, %token, "committed");
        Ok(Some(token))
    }

    fn write_batches(&self, batches: &[PendingBatch], token: &str) -> io::Result<()> {
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.rows_path)?;
        for row in batches.iter().flat_map(|b| &b.rows) {
            let line = serde_json::to_string(row)?;
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
        }
        out.sync_data()?;

        let tmp = self.offset_path.with_extension("offset.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(token.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.offset_path)
    }
}

fn spawn_committer(inner: Weak<LocalInner>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            // Stop once every channel handle is gone
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let name = inner.name.clone();
            match tokio::task::spawn_blocking(move || inner.commit_pending()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(channel = %name, error = %e, "commit failed, will retry"),
                Err(e) => tracing::warn!(channel = %name, error = %e, "commit task failed"),
            }
        }
    });
}

fn read_columns(path: &Path) -> Result<Option<BTreeSet<String>>, SinkError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_uppercase)
                .collect(),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn read_offset(path: &Path) -> Result<Option<String>, SinkError> {
    match fs::read_to_string(path) {
        Ok(token) => {
            let token = token.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
