// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Segment reader for replay
//!
//! Rows are read back in append order together with their row offset. A line
//! that is not a complete JSON object (a write torn by a crash) ends the
//! segment: the iterator yields one `Corrupted` error and then stops.

use crate::error::WalError;
use crate::segment::SegmentId;
use crate::store::SegmentStore;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader};

/// One row read back from a segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRow {
    /// 0-based offset of the row within its segment
    pub offset: u64,
    /// The line exactly as stored, without the trailing newline
    pub line: String,
    pub row: Map<String, Value>,
}

/// Reader over a single segment
pub struct SegmentReader {
    segment: SegmentId,
    file: File,
}

impl SegmentReader {
    /// Open a segment for reading
    pub fn open(store: &SegmentStore, segment: SegmentId) -> Result<Self, WalError> {
        let file = match File::open(store.path(segment)) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WalError::SegmentNotFound(segment))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { segment, file })
    }

    pub fn segment(&self) -> SegmentId {
        self.segment
    }

    /// Iterate over rows starting at the given offset
    ///
    /// Rows before `offset` are still validated, so a torn line before the
    /// starting point also ends iteration.
    pub fn rows_from(self, offset: u64) -> SegmentRows {
        SegmentRows {
            segment: self.segment,
            reader: Some(BufReader::new(self.file)),
            next_offset: 0,
            skip_until: offset,
        }
    }

    /// Iterate over every row
    pub fn rows(self) -> SegmentRows {
        self.rows_from(0)
    }

    /// Count the valid rows in the segment
    pub fn count(self) -> Result<u64, WalError> {
        let mut count = 0;
        for row in self.rows() {
            match row {
                Ok(_) => count += 1,
                Err(WalError::Corrupted { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(count)
    }
}

/// Iterator over the rows of a segment
pub struct SegmentRows {
    segment: SegmentId,
    reader: Option<BufReader<File>>,
    next_offset: u64,
    skip_until: u64,
}

impl SegmentRows {
    fn corrupted(&mut self, reason: impl Into<String>) -> WalError {
        // Nothing after a torn line is trusted
        self.reader = None;
        WalError::Corrupted {
            segment: self.segment,
            row: self.next_offset,
            reason: reason.into(),
        }
    }
}

impl Iterator for SegmentRows {
    type Item = Result<SegmentRow, WalError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let reader = self.reader.as_mut()?;

            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.reader = None;
                    return Some(Err(e.into()));
                }
            }

            let Some(text) = line.strip_suffix('\n') else {
                return Some(Err(self.corrupted("truncated line")));
            };

            let row: Map<String, Value> = match serde_json::from_str(text) {
                Ok(row) => row,
                Err(e) => return Some(Err(self.corrupted(e.to_string()))),
            };

            let offset = self.next_offset;
            self.next_offset += 1;

            if offset < self.skip_until {
                continue;
            }

            return Some(Ok(SegmentRow {
                offset,
                line: text.to_string(),
                row,
            }));
        }
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
