// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the WAL engine

use spr_adapters::SinkError;
use spr_wal::{TokenError, WalError};
use thiserror::Error;

/// A request body that is not a list of JSON objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("Unable to parse body as a list of JSON objects: {0}")]
    Malformed(String),
}

/// Errors from a single insert call
#[derive(Debug, Error)]
pub enum InsertError {
    #[error(transparent)]
    MalformedBatch(#[from] BatchError),
    #[error("WAL write failed: {0}")]
    Wal(#[from] WalError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("engine is closed")]
    Closed,
}

/// Errors that abort startup recovery
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("reading committed token: {0}")]
    Sink(#[from] SinkError),
    #[error("malformed committed token {token:?}: {source}")]
    MalformedToken {
        token: String,
        #[source]
        source: TokenError,
    },
    #[error("reading WAL: {0}")]
    Wal(#[from] WalError),
    #[error("resubmitting WAL rows: {0}")]
    Insert(#[from] InsertError),
}

/// Errors from opening or closing the engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
    #[error("recovery failed: {0}")]
    Recovery(#[from] RecoveryError),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}
