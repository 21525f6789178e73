// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Segment writer with row-count rotation
//!
//! Rows are appended one JSON line each to the active segment. Once the
//! active segment holds `rows_per_segment` rows it is synced and closed, and
//! the next segment (one past the highest index on disk) becomes active.

use crate::error::WalError;
use crate::segment::SegmentId;
use crate::store::SegmentStore;
use crate::token::CommitToken;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

/// When appended rows are forced to durable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Flush and fdatasync after every batch
    #[default]
    PerBatch,
    /// Leave rows buffered; they reach disk on rotation, close, or when the
    /// buffer fills. Rows not yet flushed are lost on a crash.
    Deferred,
}

/// Configuration for a segment writer
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Rows per segment before rotating
    pub rows_per_segment: u64,
    pub flush: FlushPolicy,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            rows_per_segment: 1000,
            flush: FlushPolicy::PerBatch,
        }
    }
}

/// Result of appending a batch
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Appended {
    /// Position of the last row of the batch; `None` for an empty batch
    pub token: Option<CommitToken>,
    /// Segments opened while appending, in order
    pub opened: Vec<SegmentId>,
}

impl Appended {
    /// Whether the batch caused at least one rotation
    pub fn rotated(&self) -> bool {
        !self.opened.is_empty()
    }
}

struct ActiveSegment {
    id: SegmentId,
    out: BufWriter<File>,
    rows: u64,
}

impl ActiveSegment {
    fn sync(&mut self) -> Result<(), WalError> {
        self.out.flush()?;
        self.out.get_ref().sync_data()?;
        Ok(())
    }
}

/// Position of the next row during replay
#[derive(Debug, Clone, Copy)]
struct ReplayCursor {
    segment: SegmentId,
    next_row: u64,
}

/// Single writer over a segment store
pub struct SegmentWriter {
    store: SegmentStore,
    config: WriterConfig,
    active: Option<ActiveSegment>,
    replay: Option<ReplayCursor>,
    /// Lowest index the next segment may take
    floor: SegmentId,
}

impl SegmentWriter {
    /// Create a writer. No segment is active until [`open_segment`] or the
    /// first append.
    ///
    /// [`open_segment`]: SegmentWriter::open_segment
    pub fn new(store: SegmentStore, config: WriterConfig) -> Self {
        Self {
            store,
            config,
            active: None,
            replay: None,
            floor: SegmentId::default(),
        }
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn active_segment(&self) -> Option<SegmentId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Rows appended to the active segment so far
    pub fn active_rows(&self) -> u64 {
        self.active.as_ref().map_or(0, |a| a.rows)
    }

    /// Never open a segment below `floor`
    ///
    /// Used with the segment after the sink's committed one, so a WAL
    /// directory that lost its newest segments cannot hand out indices the
    /// sink has already seen.
    pub fn reserve_from(&mut self, floor: SegmentId) {
        self.floor = self.floor.max(floor);
    }

    /// Close the active segment (if any) and open the next one
    ///
    /// The new index is one past the highest segment on disk (or the
    /// reserved floor, if higher), so gaps left by deleted segments are never
    /// refilled and no index is handed out twice by one writer. Ends any
    /// replay in progress.
    pub fn open_segment(&mut self) -> Result<SegmentId, WalError> {
        if let Some(mut previous) = self.active.take() {
            previous.sync()?;
            tracing::debug!(segment = %previous.id, rows = previous.rows, "closed WAL segment");
        }
        self.replay = None;

        let id = self.store.next_segment()?.max(self.floor);
        let file = self.store.create(id)?;
        self.floor = id.next();
        self.active = Some(ActiveSegment {
            id,
            out: BufWriter::new(file),
            rows: 0,
        });

        tracing::info!(segment = %id, "opened WAL segment");
        Ok(id)
    }

    /// Append a batch of rows, rotating whenever the active segment fills up
    ///
    /// Every row is serialized before anything is written. On an I/O error
    /// the active segment is abandoned so the next append starts a fresh
    /// segment rather than writing after a possibly torn line.
    pub fn append<T: Serialize>(&mut self, rows: &[T]) -> Result<Appended, WalError> {
        let mut appended = Appended::default();
        if rows.is_empty() {
            return Ok(appended);
        }

        let lines = rows
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;

        if self.active.is_none() {
            appended.opened.push(self.open_segment()?);
        }

        for line in &lines {
            let token = self.write_line(line)?;
            appended.token = Some(token);

            if self.active_rows() >= self.config.rows_per_segment {
                appended.opened.push(self.open_segment()?);
            }
        }

        if self.config.flush == FlushPolicy::PerBatch {
            self.sync()?;
        }

        Ok(appended)
    }

    fn write_line(&mut self, line: &str) -> Result<CommitToken, WalError> {
        let active = self.active.as_mut().ok_or(WalError::NoActiveSegment)?;

        let written = active
            .out
            .write_all(line.as_bytes())
            .and_then(|()| active.out.write_all(b"\n"));
        if let Err(e) = written {
            tracing::error!(segment = %active.id, error = %e, "WAL write failed, abandoning segment");
            self.active = None;
            return Err(e.into());
        }

        let token = CommitToken::new(active.id, active.rows);
        active.rows += 1;
        Ok(token)
    }

    /// Flush and fdatasync the active segment
    pub fn sync(&mut self) -> Result<(), WalError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        if let Err(e) = active.sync() {
            tracing::error!(segment = %active.id, error = %e, "WAL sync failed, abandoning segment");
            self.active = None;
            return Err(e);
        }
        Ok(())
    }

    /// Position the replay cursor at `next_row` of an existing segment
    pub fn seek(&mut self, segment: SegmentId, next_row: u64) {
        self.replay = Some(ReplayCursor { segment, next_row });
    }

    /// Advance the replay cursor over `count` rows already on disk
    ///
    /// Returns the token of the last row passed over, exactly as [`append`]
    /// would have returned it when the rows were first written.
    ///
    /// [`append`]: SegmentWriter::append
    pub fn advance(&mut self, count: u64) -> Result<Option<CommitToken>, WalError> {
        let cursor = self.replay.as_mut().ok_or(WalError::NoReplayPosition)?;
        if count == 0 {
            return Ok(None);
        }
        let token = CommitToken::new(cursor.segment, cursor.next_row + count - 1);
        cursor.next_row += count;
        Ok(Some(token))
    }

    /// Flush, sync and release the active segment
    pub fn close(&mut self) -> Result<(), WalError> {
        if let Some(mut active) = self.active.take() {
            active.sync()?;
            tracing::info!(segment = %active.id, rows = active.rows, "closed WAL segment");
        }
        self.replay = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
