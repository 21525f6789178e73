// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Row batches and request body parsing

use crate::error::BatchError;
use serde_json::value::RawValue;
use serde_json::Value;
use spr_adapters::Row;
use spr_wal::SegmentRow;

/// Ordered rows submitted together, each with its original text
///
/// The text is what callers see in per-row error reports, so it is kept
/// exactly as received rather than re-serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatch {
    rows: Vec<Row>,
    raw: Vec<String>,
}

impl RowBatch {
    /// Parse a request body holding a JSON array of objects
    pub fn parse(body: &str) -> Result<Self, BatchError> {
        let items: Vec<&RawValue> =
            serde_json::from_str(body).map_err(|e| BatchError::Malformed(e.to_string()))?;

        let mut batch = Self {
            rows: Vec::with_capacity(items.len()),
            raw: Vec::with_capacity(items.len()),
        };
        for item in items {
            let row: Row = serde_json::from_str(item.get())
                .map_err(|e| BatchError::Malformed(e.to_string()))?;
            batch.rows.push(row);
            batch.raw.push(item.get().to_string());
        }
        Ok(batch)
    }

    /// Build a batch from rows that have no original text
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let raw = rows
            .iter()
            .map(|row| Value::Object(row.clone()).to_string())
            .collect();
        Self { rows, raw }
    }

    /// Build a batch from rows read back out of a segment
    pub fn from_segment_rows(rows: Vec<SegmentRow>) -> Self {
        let (rows, raw): (Vec<Row>, Vec<String>) =
            rows.into_iter().map(|r| (r.row, r.line)).unzip();
        Self { rows, raw }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Original text of the row at `index`
    pub fn raw(&self, index: usize) -> Option<&str> {
        self.raw.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
