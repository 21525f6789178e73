// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! WAL engine: inserts, startup recovery and segment purge
//!
//! ```text
//! body → RowBatch → Inserter ──append──→ SegmentWriter
//!                      │                     │ rotation
//!                      └──(rows, token)──→ Channel ←── Purger
//!
//! startup: Channel committed token → recovery replays WAL rows past it
//! ```

mod batch;
mod engine;
mod error;
mod inserter;
mod outcome;
mod purge;
mod recovery;

pub use batch::RowBatch;
pub use engine::{EngineConfig, EngineStats, WalEngine};
pub use error::{BatchError, EngineError, InsertError, RecoveryError};
pub use inserter::{Inserter, InserterStats};
pub use outcome::{InsertOutcome, OutcomeError};
pub use purge::{PurgeReport, Purger};
pub use recovery::{recover, wait_for_commit, ReplayConfig, ReplayPlan, ReplayStep, ReplaySummary};
