// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::segment::SegmentId;
use std::io;
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("segment not found: {0}")]
    SegmentNotFound(SegmentId),
    #[error("no active segment")]
    NoActiveSegment,
    #[error("no replay position set")]
    NoReplayPosition,
    #[error("corrupted row {row} in segment {segment}: {reason}")]
    Corrupted {
        segment: SegmentId,
        row: u64,
        reason: String,
    },
}
