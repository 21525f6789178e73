// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL engine lifecycle

use crate::batch::RowBatch;
use crate::error::{EngineError, InsertError};
use crate::inserter::Inserter;
use crate::outcome::InsertOutcome;
use crate::purge::PurgeReport;
use crate::recovery::{self, ReplayConfig, ReplaySummary};
use serde::Serialize;
use spr_adapters::Channel;
use spr_wal::{SegmentStore, SegmentWriter, WriterConfig};
use std::path::PathBuf;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Without a WAL rows go straight to the sink and nothing is recovered
    pub wal_enabled: bool,
    pub wal_dir: PathBuf,
    pub writer: WriterConfig,
    pub replay: ReplayConfig,
}

impl EngineConfig {
    pub fn new(wal_dir: impl Into<PathBuf>) -> Self {
        Self {
            wal_enabled: true,
            wal_dir: wal_dir.into(),
            writer: WriterConfig::default(),
            replay: ReplayConfig::default(),
        }
    }
}

/// Engine counters for the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub inserts: u64,
    pub wal_enabled: bool,
    pub active_segment: Option<String>,
    pub last_token: Option<String>,
}

/// Durable insert path in front of one sink channel
pub struct WalEngine<C> {
    inserter: Inserter<C>,
    wal_enabled: bool,
    replay: ReplaySummary,
}

impl<C: Channel> WalEngine<C> {
    /// Recover from the WAL, then open a fresh active segment
    ///
    /// Returns only once every uncommitted WAL row has been resubmitted.
    pub async fn open(config: EngineConfig, channel: C) -> Result<Self, EngineError> {
        if !config.wal_enabled {
            tracing::warn!("WAL disabled, rows are not recoverable after a crash");
            return Ok(Self {
                inserter: Inserter::new(channel, None),
                wal_enabled: false,
                replay: ReplaySummary::default(),
            });
        }

        let store = SegmentStore::open(&config.wal_dir)?;
        let writer = SegmentWriter::new(store.clone(), config.writer.clone());
        let inserter = Inserter::new(channel, Some(writer));

        let replay = recovery::recover(&inserter, &store, &config.replay).await?;
        let committed = replay.committed.map(|token| token.segment);
        let active = inserter.open_active(committed).await?;

        tracing::info!(
            dir = %store.dir().display(),
            active = ?active.map(|id| id.to_string()),
            replayed = replay.rows,
            "WAL engine open"
        );

        Ok(Self {
            inserter,
            wal_enabled: true,
            replay,
        })
    }

    /// Insert parsed rows on the live path
    pub async fn insert(&self, batch: &RowBatch) -> Result<InsertOutcome, InsertError> {
        self.inserter.insert(batch, true).await
    }

    /// Parse a request body and insert it
    ///
    /// A malformed body fails before anything reaches the WAL.
    pub async fn insert_json(&self, body: &str) -> Result<InsertOutcome, InsertError> {
        let batch = RowBatch::parse(body)?;
        self.insert(&batch).await
    }

    pub async fn stats(&self) -> EngineStats {
        let stats = self.inserter.stats().await;
        EngineStats {
            inserts: stats.inserts,
            wal_enabled: self.wal_enabled,
            active_segment: stats.active_segment.map(|id| id.to_string()),
            last_token: stats.last_token,
        }
    }

    /// What startup recovery resubmitted
    pub fn replay_summary(&self) -> &ReplaySummary {
        &self.replay
    }

    pub fn channel(&self) -> &C {
        self.inserter.channel()
    }

    /// Stop inserts, sync the WAL, wait for purge and close the channel
    pub async fn close(&self) -> Result<Option<PurgeReport>, EngineError> {
        let purge = self.inserter.close().await?;
        self.inserter.channel().close().await?;
        tracing::info!("WAL engine closed");
        Ok(purge)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
