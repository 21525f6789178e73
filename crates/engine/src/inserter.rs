// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Insert path: WAL append, token assignment and sink submit
//!
//! The three steps run under one async mutex. A token names the WAL position
//! of the last row of its batch, so two batches must never interleave
//! between append and submit.

use crate::batch::RowBatch;
use crate::error::InsertError;
use crate::outcome::InsertOutcome;
use crate::purge::{PurgeReport, Purger};
use spr_adapters::Channel;
use spr_wal::{SegmentId, SegmentWriter, WalError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Point-in-time view of the insert path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InserterStats {
    pub inserts: u64,
    pub active_segment: Option<SegmentId>,
    pub last_token: Option<String>,
}

struct WalState {
    /// `None` when the WAL is disabled
    writer: Option<SegmentWriter>,
    inserts: u64,
    last_token: Option<String>,
    purge: Option<JoinHandle<PurgeReport>>,
    closed: bool,
}

/// Single writer in front of a sink channel
pub struct Inserter<C> {
    channel: C,
    state: Mutex<WalState>,
}

impl<C: Channel> Inserter<C> {
    /// Create an inserter; pass no writer to run without a WAL
    pub fn new(channel: C, writer: Option<SegmentWriter>) -> Self {
        Self {
            channel,
            state: Mutex::new(WalState {
                writer,
                inserts: 0,
                last_token: None,
                purge: None,
                closed: false,
            }),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Insert a batch
    ///
    /// With `write_to_wal` the rows are appended (and synced, per the flush
    /// policy) before the sink sees them. Without it the rows are assumed to
    /// be on disk already at the replay cursor, which is advanced instead.
    pub async fn insert(
        &self,
        batch: &RowBatch,
        write_to_wal: bool,
    ) -> Result<InsertOutcome, InsertError> {
        if batch.is_empty() {
            return Ok(InsertOutcome::default());
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if state.closed {
            return Err(InsertError::Closed);
        }
        state.inserts += 1;

        let token = match state.writer.as_mut() {
            // Without a WAL the token is only a sequence number
            None => state.inserts.to_string(),
            Some(writer) => {
                let token = if write_to_wal {
                    let appended = writer.append(batch.rows())?;
                    if appended.rotated() {
                        let purger = Purger::new(self.channel.clone(), writer.store().clone())
                            .sparing(writer.active_segment());
                        state.purge = Some(purger.spawn());
                    }
                    appended.token
                } else {
                    writer.advance(batch.len() as u64)?
                };
                token.ok_or(WalError::NoActiveSegment)?.encode()
            }
        };

        let result = self.channel.insert_rows(batch.rows(), &token).await?;
        tracing::debug!(
            %token,
            rows = batch.len(),
            rejected = result.error_count(),
            replay = !write_to_wal,
            "batch submitted"
        );
        state.last_token = Some(token);

        Ok(InsertOutcome::from_validation(batch, result))
    }

    /// Position the replay cursor before resubmitting rows of `segment`
    pub async fn seek(&self, segment: SegmentId, next_row: u64) -> Result<(), WalError> {
        let mut state = self.state.lock().await;
        let writer = state.writer.as_mut().ok_or(WalError::NoActiveSegment)?;
        writer.seek(segment, next_row);
        Ok(())
    }

    /// Open a fresh active segment and purge behind it
    ///
    /// The new segment always sorts after `committed`, the sink's committed
    /// segment, even when the WAL directory no longer holds it.
    pub async fn open_active(
        &self,
        committed: Option<SegmentId>,
    ) -> Result<Option<SegmentId>, WalError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let Some(writer) = state.writer.as_mut() else {
            return Ok(None);
        };

        if let Some(committed) = committed {
            writer.reserve_from(committed.next());
        }
        let id = writer.open_segment()?;
        let purger = Purger::new(self.channel.clone(), writer.store().clone()).sparing(Some(id));
        state.purge = Some(purger.spawn());
        Ok(Some(id))
    }

    pub async fn stats(&self) -> InserterStats {
        let state = self.state.lock().await;
        InserterStats {
            inserts: state.inserts,
            active_segment: state.writer.as_ref().and_then(SegmentWriter::active_segment),
            last_token: state.last_token.clone(),
        }
    }

    /// Wait for the most recent purge pass, if one is pending
    pub async fn settle_purge(&self) -> Option<PurgeReport> {
        let handle = self.state.lock().await.purge.take()?;
        match handle.await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(error = %e, "purge task failed");
                None
            }
        }
    }

    /// Refuse further inserts and release the active segment
    pub async fn close(&self) -> Result<Option<PurgeReport>, WalError> {
        {
            let mut state = self.state.lock().await;
            state.closed = true;
            if let Some(writer) = state.writer.as_mut() {
                writer.close()?;
            }
        }
        Ok(self.settle_purge().await)
    }
}

#[cfg(test)]
#[path = "inserter_tests.rs"]
mod tests;
