// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Caller-facing result of an insert

use crate::batch::RowBatch;
use serde::{Deserialize, Serialize};
use spr_adapters::ValidationResult;
use std::fmt;

/// A row the sink rejected, as the caller sent it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeError {
    pub row_index: usize,
    /// Original text of the row
    pub input: String,
    pub error: String,
}

/// Result of one insert call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    #[serde(rename = "inserts_attempted")]
    pub attempted: usize,
    #[serde(rename = "inserts_succeeded")]
    pub succeeded: usize,
    #[serde(rename = "insert_errors")]
    pub error_count: usize,
    #[serde(rename = "error_rows")]
    pub errors: Vec<OutcomeError>,
}

impl InsertOutcome {
    /// Map the sink's verdict back onto the rows of `batch`
    pub fn from_validation(batch: &RowBatch, result: ValidationResult) -> Self {
        let attempted = batch.len();
        let errors: Vec<OutcomeError> = result
            .errors
            .into_iter()
            .map(|e| {
                let input = match batch.raw(e.row_index) {
                    Some(raw) => raw.to_string(),
                    None => {
                        tracing::warn!(
                            row_index = e.row_index,
                            attempted,
                            "sink reported an error for a row outside the batch"
                        );
                        String::new()
                    }
                };
                OutcomeError {
                    row_index: e.row_index,
                    input,
                    error: e.message,
                }
            })
            .collect();

        Self {
            attempted,
            succeeded: attempted.saturating_sub(errors.len()),
            error_count: errors.len(),
            errors,
        }
    }
}

impl fmt::Display for InsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

#[cfg(test)]
#[path = "outcome_tests.rs"]
mod tests;
