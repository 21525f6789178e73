// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingestion sink adapters
//!
//! A sink durably commits row batches for a table. Rows reach it through an
//! open channel, and every insert carries a caller-chosen token; the channel
//! later reports the token of the newest batch it has committed.

mod local;

pub use local::{LocalChannel, LocalSink};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeChannel, FakeSink, SinkCall};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// A single row: field name to JSON value
pub type Row = Map<String, Value>;

/// Fully qualified table a channel writes to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.database.to_uppercase(),
            self.schema.to_uppercase(),
            self.table.to_uppercase()
        )
    }
}

/// A row the sink refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// Index of the row within the submitted batch
    pub row_index: usize,
    pub message: String,
}

/// Sink verdict on one insert call. Rows not listed were accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<RowError>,
}

impl ValidationResult {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Errors from sink operations
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Table not found (or no permissions): {0}")]
    TableNotFound(TableRef),
    #[error("invalid channel name: {0}")]
    InvalidChannel(String),
    #[error("channel closed: {0}")]
    ChannelClosed(String),
    #[error("sink unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Adapter for opening channels on an ingestion sink
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    type Channel: Channel;

    /// Open (or reopen) the named channel on a table
    async fn open_channel(&self, name: &str, table: &TableRef)
        -> Result<Self::Channel, SinkError>;
}

/// An open channel into one table
#[async_trait]
pub trait Channel: Clone + Send + Sync + 'static {
    /// Channel name
    fn name(&self) -> &str;

    /// Submit rows tagged with a token
    ///
    /// Returns per-row rejections. Accepted rows are committed
    /// asynchronously; once they are, `token` becomes visible through
    /// [`latest_committed_token`](Channel::latest_committed_token).
    async fn insert_rows(&self, rows: &[Row], token: &str) -> Result<ValidationResult, SinkError>;

    /// Token of the newest committed batch, if anything was ever committed
    async fn latest_committed_token(&self) -> Result<Option<String>, SinkError>;

    /// Commit whatever is buffered and stop accepting rows
    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
