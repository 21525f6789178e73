// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Segment identifiers and their on-disk names

use std::fmt;

/// File name prefix shared by every segment
pub const SEGMENT_PREFIX: &str = "file_";

/// Minimum number of zero-padded digits after the prefix
pub const SEGMENT_INDEX_WIDTH: usize = 10;

/// Index of a WAL segment
///
/// Ordering follows creation order: a segment created later always has a
/// larger index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SegmentId(pub u64);

impl SegmentId {
    pub fn index(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// File name for this segment, e.g. `file_0000000042`
    pub fn file_name(self) -> String {
        format!("{}{:0width$}", SEGMENT_PREFIX, self.0, width = SEGMENT_INDEX_WIDTH)
    }

    /// Parse a segment file name. Returns `None` for anything that is not a segment.
    pub fn parse(name: &str) -> Option<Self> {
        let digits = name.strip_prefix(SEGMENT_PREFIX)?;
        if digits.len() < SEGMENT_INDEX_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(Self)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

#[cfg(test)]
#[path = "segment_tests.rs"]
mod tests;
