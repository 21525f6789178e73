// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commit tokens
//!
//! A commit token names the WAL position of the last row in an insert call:
//! `<segment file name>:<row offset>`. The sink stores the token verbatim and
//! reports the latest committed one back, which is how recovery learns where
//! to resume. The separator cannot occur in a segment name.

use crate::segment::SegmentId;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between the segment name and the row offset
pub const TOKEN_SEPARATOR: char = ':';

/// Errors from decoding a commit token
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token '{token}': missing ':' separator")]
    MissingSeparator { token: String },
    #[error("malformed token '{token}': invalid segment name")]
    InvalidSegment { token: String },
    #[error("malformed token '{token}': invalid row offset")]
    InvalidRow { token: String },
}

/// WAL position of the last row covered by an insert call
///
/// Tokens order by segment, then by row offset within the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommitToken {
    pub segment: SegmentId,
    pub row: u64,
}

impl CommitToken {
    pub fn new(segment: SegmentId, row: u64) -> Self {
        Self { segment, row }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let (name, row) = token
            .split_once(TOKEN_SEPARATOR)
            .ok_or_else(|| TokenError::MissingSeparator {
                token: token.to_string(),
            })?;

        let segment = SegmentId::parse(name).ok_or_else(|| TokenError::InvalidSegment {
            token: token.to_string(),
        })?;

        // u64::from_str accepts a leading '+', which no encoder produces
        if row.is_empty() || !row.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TokenError::InvalidRow {
                token: token.to_string(),
            });
        }
        let row = row.parse().map_err(|_| TokenError::InvalidRow {
            token: token.to_string(),
        })?;

        Ok(Self { segment, row })
    }
}

impl fmt::Display for CommitToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.segment, TOKEN_SEPARATOR, self.row)
    }
}

impl FromStr for CommitToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
