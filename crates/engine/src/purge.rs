// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background deletion of committed segments
//!
//! Every segment below the sink's committed segment is already durable on
//! the sink side and is never read by recovery, so it can go. Deletions run
//! as independent tasks; a failed one stays on disk and becomes a candidate
//! again at the next rotation.

use spr_adapters::Channel;
use spr_wal::{CommitToken, SegmentId, SegmentStore};
use tokio::task::{JoinHandle, JoinSet};

/// What one purge pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Committed segment the pass was measured against
    pub committed: Option<SegmentId>,
    pub deleted: Vec<SegmentId>,
    pub failed: Vec<SegmentId>,
    /// Deletion tasks that never reported back
    pub lost: usize,
}

impl PurgeReport {
    pub fn success(&self) -> bool {
        self.failed.is_empty() && self.lost == 0
    }
}

/// Deletes segments the sink has committed past
#[derive(Clone)]
pub struct Purger<C> {
    channel: C,
    store: SegmentStore,
    active: Option<SegmentId>,
}

impl<C: Channel> Purger<C> {
    pub fn new(channel: C, store: SegmentStore) -> Self {
        Self {
            channel,
            store,
            active: None,
        }
    }

    /// Never delete `active`, whatever the committed token says
    pub fn sparing(mut self, active: Option<SegmentId>) -> Self {
        self.active = active;
        self
    }

    /// Run one purge pass in the background
    pub fn spawn(self) -> JoinHandle<PurgeReport> {
        tokio::spawn(async move { self.run().await })
    }

    /// Run one purge pass
    pub async fn run(&self) -> PurgeReport {
        let mut report = PurgeReport::default();

        let token = match self.channel.latest_committed_token().await {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => {
                tracing::debug!("nothing committed yet, skipping purge");
                return report;
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot read committed token, skipping purge");
                return report;
            }
        };
        let committed = match CommitToken::decode(&token) {
            Ok(committed) => committed.segment,
            Err(e) => {
                tracing::warn!(%token, error = %e, "malformed committed token, skipping purge");
                return report;
            }
        };
        report.committed = Some(committed);

        let mut candidates = match self.store.list_before(committed) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(error = %e, "cannot list WAL segments, skipping purge");
                return report;
            }
        };
        if let Some(active) = self.active {
            if candidates.contains(&active) {
                tracing::warn!(
                    segment = %active,
                    committed = %committed,
                    "committed token is past the active segment, keeping it"
                );
                candidates.retain(|id| *id != active);
            }
        }
        if candidates.is_empty() {
            return report;
        }

        let mut tasks = JoinSet::new();
        for id in candidates {
            let path = self.store.path(id);
            tasks.spawn(async move { (id, tokio::fs::remove_file(path).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(()))) => report.deleted.push(id),
                Ok((id, Err(e))) => {
                    tracing::warn!(segment = %id, error = %e, "failed to delete WAL segment");
                    report.failed.push(id);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WAL segment deletion task failed");
                    report.lost += 1;
                }
            }
        }
        report.deleted.sort();
        report.failed.sort();

        tracing::info!(
            committed = %committed,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            success = report.success(),
            "purged WAL segments"
        );
        report
    }
}

#[cfg(test)]
#[path = "purge_tests.rs"]
mod tests;
