// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::sink::{Channel, Row, SinkError, ValidationResult};
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any Channel
#[derive(Clone)]
pub struct TracedChannel<C> {
    inner: C,
}

impl<C> TracedChannel<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: Channel> Channel for TracedChannel<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn insert_rows(&self, rows: &[Row], token: &str) -> Result<ValidationResult, SinkError> {
        let span = tracing::info_span!("sink.insert_rows", channel = self.inner.name(), token);

        async {
            tracing::debug!(rows = rows.len(), "submitting");

            let start = std::time::Instant::now();
            let result = self.inner.insert_rows(rows, token).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(validation) if validation.is_clean() => tracing::debug!(
                    rows = rows.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "accepted"
                ),
                Ok(validation) => tracing::info!(
                    rows = rows.len(),
                    rejected = validation.error_count(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "accepted with row errors"
                ),
                Err(e) => tracing::error!(
                    rows = rows.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "insert failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn latest_committed_token(&self) -> Result<Option<String>, SinkError> {
        let result = self.inner.latest_committed_token().await;
        match &result {
            Ok(token) => {
                tracing::trace!(channel = self.inner.name(), token = ?token, "committed token")
            }
            Err(e) => tracing::warn!(
                channel = self.inner.name(),
                error = %e,
                "committed token lookup failed"
            ),
        }
        result
    }

    async fn close(&self) -> Result<(), SinkError> {
        let span = tracing::info_span!("sink.close", channel = self.inner.name());

        async {
            let result = self.inner.close().await;
            match &result {
                Ok(()) => tracing::info!("closed"),
                Err(e) => tracing::warn!(error = %e, "close failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
