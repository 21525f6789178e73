// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Segmented write-ahead log for rows bound for the ingestion sink
//!
//! ## Architecture
//!
//! ```text
//! rows → SegmentWriter → file_0000000000, file_0000000001, ...   (SegmentStore)
//!              ↓
//!        CommitToken "file_0000000001:417"  → sink
//!
//! sink committed token → SegmentReader → replay of uncommitted rows
//! ```
//!
//! A segment is a file of newline-delimited JSON objects. Segment indices only
//! ever grow; the highest-indexed segment is the only one that is appended to.

mod error;
mod reader;
mod segment;
mod store;
mod token;
mod writer;

pub use error::WalError;
pub use reader::{SegmentReader, SegmentRow, SegmentRows};
pub use segment::{SegmentId, SEGMENT_INDEX_WIDTH, SEGMENT_PREFIX};
pub use store::SegmentStore;
pub use token::{CommitToken, TokenError, TOKEN_SEPARATOR};
pub use writer::{Appended, FlushPolicy, SegmentWriter, WriterConfig};
