// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery
//!
//! The sink's committed token `(S, R)` is the only trusted position. Rows
//! after it (the tail of segment `S` from `R + 1`, then every later segment
//! in full) are resubmitted through the insert path with WAL append
//! suppressed, so they carry the same tokens they were first given.

use crate::batch::RowBatch;
use crate::error::RecoveryError;
use crate::inserter::Inserter;
use spr_adapters::Channel;
use spr_wal::{CommitToken, SegmentId, SegmentReader, SegmentRow, SegmentStore, WalError};
use std::time::Duration;

/// Tuning for replay and the commit check that follows it
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Rows per resubmitted batch
    pub chunk_size: usize,
    pub commit_wait_attempts: u32,
    pub commit_wait_interval: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            chunk_size: 20,
            commit_wait_attempts: 20,
            commit_wait_interval: Duration::from_secs(1),
        }
    }
}

/// One segment to resubmit, starting at `from_row`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStep {
    pub segment: SegmentId,
    pub from_row: u64,
}

/// Segments to resubmit, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayPlan {
    pub committed: CommitToken,
    pub steps: Vec<ReplayStep>,
}

impl ReplayPlan {
    pub fn build(store: &SegmentStore, committed: CommitToken) -> Result<Self, WalError> {
        let mut steps = Vec::new();

        if store.exists(committed.segment) {
            steps.push(ReplayStep {
                segment: committed.segment,
                from_row: committed.row + 1,
            });
        } else {
            tracing::warn!(
                segment = %committed.segment,
                "committed segment is missing from the WAL"
            );
        }

        steps.extend(
            store
                .list_after(committed.segment)?
                .into_iter()
                .map(|segment| ReplayStep {
                    segment,
                    from_row: 0,
                }),
        );

        Ok(Self { committed, steps })
    }
}

/// What recovery resubmitted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub committed: Option<CommitToken>,
    pub segments: usize,
    pub rows: u64,
    pub batches: usize,
    /// Token of the last resubmitted batch
    pub last_token: Option<String>,
    /// Whether the sink caught up with `last_token` before the wait ran out
    pub confirmed: bool,
}

/// Resubmit every WAL row the sink has not committed
pub async fn recover<C: Channel>(
    inserter: &Inserter<C>,
    store: &SegmentStore,
    config: &ReplayConfig,
) -> Result<ReplaySummary, RecoveryError> {
    let mut summary = ReplaySummary::default();

    let token = match inserter.channel().latest_committed_token().await? {
        Some(token) if !token.is_empty() => token,
        _ => {
            tracing::info!("no committed token, skipping replay");
            return Ok(summary);
        }
    };
    let committed = CommitToken::decode(&token)
        .map_err(|source| RecoveryError::MalformedToken { token, source })?;
    summary.committed = Some(committed);

    let plan = ReplayPlan::build(store, committed)?;
    tracing::info!(
        committed = %committed,
        segments = plan.steps.len(),
        "replaying WAL"
    );

    let chunk_size = config.chunk_size.max(1);
    for step in &plan.steps {
        inserter.seek(step.segment, step.from_row).await?;
        summary.segments += 1;

        let mut chunk: Vec<SegmentRow> = Vec::with_capacity(chunk_size);
        let rows = SegmentReader::open(store, step.segment)?.rows_from(step.from_row);
        for row in rows {
            match row {
                Ok(row) => chunk.push(row),
                Err(e @ WalError::Corrupted { .. }) => {
                    tracing::warn!(error = %e, "stopping replay of segment at torn row");
                    break;
                }
                Err(e) => return Err(e.into()),
            }
            if chunk.len() == chunk_size {
                resubmit(inserter, std::mem::take(&mut chunk), &mut summary).await?;
            }
        }
        if !chunk.is_empty() {
            resubmit(inserter, chunk, &mut summary).await?;
        }
    }

    tracing::info!(
        segments = summary.segments,
        rows = summary.rows,
        batches = summary.batches,
        "WAL replay submitted"
    );

    if let Some(last) = &summary.last_token {
        summary.confirmed = wait_for_commit(
            inserter.channel(),
            last,
            config.commit_wait_attempts,
            config.commit_wait_interval,
        )
        .await;
    }

    Ok(summary)
}

async fn resubmit<C: Channel>(
    inserter: &Inserter<C>,
    rows: Vec<SegmentRow>,
    summary: &mut ReplaySummary,
) -> Result<(), RecoveryError> {
    let batch = RowBatch::from_segment_rows(rows);
    let outcome = inserter.insert(&batch, false).await?;
    if outcome.error_count > 0 {
        tracing::warn!(
            rejected = outcome.error_count,
            "sink rejected replayed rows"
        );
    }

    summary.rows += batch.len() as u64;
    summary.batches += 1;
    summary.last_token = inserter.stats().await.last_token;
    Ok(())
}

/// Poll the committed token until it reaches `expected`
///
/// A committed token equal to `expected`, or one that decodes to a later
/// position, counts as reached: the sink may already have committed live
/// rows past the replayed ones. Returns `false` once `attempts` polls have
/// passed without it doing so.
pub async fn wait_for_commit<C: Channel>(
    channel: &C,
    expected: &str,
    attempts: u32,
    interval: Duration,
) -> bool {
    for attempt in 1..=attempts {
        match channel.latest_committed_token().await {
            Ok(Some(current)) if reached(&current, expected) => {
                tracing::info!(token = %current, attempt, "sink committed replayed rows");
                return true;
            }
            Ok(current) => {
                tracing::debug!(attempt, current = ?current, expected, "waiting for commit");
            }
            Err(e) => tracing::warn!(attempt, error = %e, "committed token lookup failed"),
        }
        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    tracing::warn!(
        expected,
        attempts,
        "sink has not committed replayed rows yet, continuing"
    );
    false
}

fn reached(current: &str, expected: &str) -> bool {
    if current == expected {
        return true;
    }
    match (CommitToken::decode(current), CommitToken::decode(expected)) {
        (Ok(current), Ok(expected)) => current >= expected,
        _ => false,
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
