// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Channel, Row, RowError, Sink, SinkError, TableRef, ValidationResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Recorded sink call
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    OpenChannel { name: String, table: TableRef },
    InsertRows { rows: Vec<Row>, token: String },
    LatestCommittedToken,
    Close,
}

/// Fake sink handing out one shared [`FakeChannel`]
#[derive(Clone, Default)]
pub struct FakeSink {
    channel: FakeChannel,
    missing: Arc<Mutex<Vec<TableRef>>>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(channel: FakeChannel) -> Self {
        Self {
            channel,
            missing: Arc::default(),
        }
    }

    /// The channel every `open_channel` call returns
    pub fn channel(&self) -> FakeChannel {
        self.channel.clone()
    }

    /// Make `open_channel` fail with `TableNotFound` for this table
    pub fn remove_table(&self, table: TableRef) {
        self.missing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(table);
    }
}

#[async_trait]
impl Sink for FakeSink {
    type Channel = FakeChannel;

    async fn open_channel(&self, name: &str, table: &TableRef) -> Result<FakeChannel, SinkError> {
        self.channel.record(SinkCall::OpenChannel {
            name: name.to_string(),
            table: table.clone(),
        });

        let missing = self.missing.lock().unwrap_or_else(|e| e.into_inner());
        if missing.contains(table) {
            return Err(SinkError::TableNotFound(table.clone()));
        }

        let mut state = self.channel.state.lock().unwrap_or_else(|e| e.into_inner());
        state.name = name.to_string();
        state.closed = false;
        Ok(self.channel.clone())
    }
}

struct Rejection {
    field: String,
    value: Value,
    message: String,
}

struct FakeChannelState {
    name: String,
    calls: Vec<SinkCall>,
    committed: Option<String>,
    auto_commit: bool,
    rejections: Vec<Rejection>,
    insert_failure: Option<String>,
    closed: bool,
}

impl Default for FakeChannelState {
    fn default() -> Self {
        Self {
            name: "fake".to_string(),
            calls: Vec::new(),
            committed: None,
            auto_commit: true,
            rejections: Vec::new(),
            insert_failure: None,
            closed: false,
        }
    }
}

/// Fake channel for testing
///
/// By default every insert commits immediately, so the committed token is
/// the token of the last insert. Turn `auto_commit` off to model a sink that
/// lags behind.
#[derive(Clone, Default)]
pub struct FakeChannel {
    state: Arc<Mutex<FakeChannelState>>,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeChannelState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: SinkCall) {
        self.state().calls.push(call);
    }

    /// Start with a committed token, as if left over from a previous run
    pub fn with_committed(self, token: &str) -> Self {
        self.state().committed = Some(token.to_string());
        self
    }

    pub fn set_committed(&self, token: Option<&str>) {
        self.state().committed = token.map(String::from);
    }

    pub fn set_auto_commit(&self, auto_commit: bool) {
        self.state().auto_commit = auto_commit;
    }

    /// Reject every row whose `field` equals `value`
    pub fn reject_rows_where(&self, field: &str, value: Value, message: &str) {
        self.state().rejections.push(Rejection {
            field: field.to_string(),
            value,
            message: message.to_string(),
        });
    }

    /// Make inserts fail (`Some`) or succeed again (`None`)
    pub fn fail_inserts(&self, message: Option<&str>) {
        self.state().insert_failure = message.map(String::from);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<SinkCall> {
        self.state().calls.clone()
    }

    /// Every insert as (rows, token), in call order
    pub fn inserts(&self) -> Vec<(Vec<Row>, String)> {
        self.state()
            .calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::InsertRows { rows, token } => Some((rows.clone(), token.clone())),
                _ => None,
            })
            .collect()
    }

    /// Tokens of every insert, in call order
    pub fn tokens(&self) -> Vec<String> {
        self.inserts().into_iter().map(|(_, token)| token).collect()
    }

    /// Commit everything inserted so far
    pub fn commit_all(&self) {
        let token = self.tokens().pop();
        if token.is_some() {
            self.state().committed = token;
        }
    }
}

#[async_trait]
impl Channel for FakeChannel {
    fn name(&self) -> &str {
        // Fixed name: the fake is shared and cannot hand out a borrow of its state
        "fake"
    }

    async fn insert_rows(&self, rows: &[Row], token: &str) -> Result<ValidationResult, SinkError> {
        let mut state = self.state();
        state.calls.push(SinkCall::InsertRows {
            rows: rows.to_vec(),
            token: token.to_string(),
        });

        if state.closed {
            return Err(SinkError::ChannelClosed(state.name.clone()));
        }
        if let Some(message) = &state.insert_failure {
            return Err(SinkError::Unavailable(message.clone()));
        }

        let errors = rows
            .iter()
            .enumerate()
            .filter_map(|(row_index, row)| {
                state
                    .rejections
                    .iter()
                    .find(|r| row.get(&r.field) == Some(&r.value))
                    .map(|r| RowError {
                        row_index,
                        message: r.message.clone(),
                    })
            })
            .collect();

        if state.auto_commit {
            state.committed = Some(token.to_string());
        }

        Ok(ValidationResult { errors })
    }

    async fn latest_committed_token(&self) -> Result<Option<String>, SinkError> {
        let mut state = self.state();
        state.calls.push(SinkCall::LatestCommittedToken);
        Ok(state.committed.clone())
    }

    async fn close(&self) -> Result<(), SinkError> {
        let mut state = self.state();
        state.calls.push(SinkCall::Close);
        state.closed = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
