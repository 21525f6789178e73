// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `spr gen` - Generate a load fixture from a column schema
//!
//! The schema file has one `NAME:TYPE` column per line. Every fixture line
//! is a JSON array holding one generated row, ready for `spr load`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::DateTime;
use clap::Args;
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

const STRING_LEN: std::ops::RangeInclusive<usize> = 50..=100;
const ARRAY_LEN: std::ops::RangeInclusive<usize> = 5..=15;
const FLOAT_RANGE: std::ops::Range<f64> = -1000.0..1000.0;

// 2024-01-01T00:00:00Z up to 2024-07-01T00:00:00Z
const TIMESTAMP_START: i64 = 1_704_067_200;
const TIMESTAMP_END: i64 = 1_719_792_000;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%I:%M:%p";

#[derive(Args)]
pub struct GenArgs {
    /// Schema file, one `NAME:TYPE` per line
    #[arg(short, long)]
    pub schema: PathBuf,

    /// Fixture file to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of fixture lines
    #[arg(short, long, default_value_t = 10)]
    pub rows: usize,

    /// Seed for reproducible fixtures
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Column types the generator knows how to fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Varchar,
    Variant,
    Boolean,
    Float,
    Array,
    TimestampNtz,
}

impl FromStr for ColumnType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "VARCHAR" => Ok(Self::Varchar),
            "VARIANT" => Ok(Self::Variant),
            "BOOLEAN" => Ok(Self::Boolean),
            "FLOAT" => Ok(Self::Float),
            "ARRAY" => Ok(Self::Array),
            "TIMESTAMP_NTZ" => Ok(Self::TimestampNtz),
            other => Err(anyhow!("unknown column type {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnType,
}

/// Parse a schema; blank lines are skipped, column order is kept
pub fn parse_schema(text: &str) -> Result<Vec<Column>> {
    let mut columns = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (name, kind) = line
            .split_once(':')
            .ok_or_else(|| anyhow!("line {}: expected NAME:TYPE, got {:?}", number + 1, line))?;
        let kind = kind
            .trim()
            .parse::<ColumnType>()
            .with_context(|| format!("line {}", number + 1))?;
        columns.push(Column {
            name: name.trim().to_string(),
            kind,
        });
    }
    if columns.is_empty() {
        bail!("schema has no columns");
    }
    Ok(columns)
}

pub struct RowGenerator {
    rng: StdRng,
}

impl RowGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn row(&mut self, columns: &[Column]) -> Map<String, Value> {
        columns
            .iter()
            .map(|column| (column.name.clone(), self.value(column.kind)))
            .collect()
    }

    fn value(&mut self, kind: ColumnType) -> Value {
        match kind {
            ColumnType::Varchar | ColumnType::Variant => Value::String(self.string()),
            ColumnType::Boolean => Value::Bool(self.rng.gen_bool(0.5)),
            ColumnType::Float => Value::from(self.rng.gen_range(FLOAT_RANGE)),
            ColumnType::Array => {
                let len = self.rng.gen_range(ARRAY_LEN);
                Value::Array((0..len).map(|_| Value::String(self.string())).collect())
            }
            ColumnType::TimestampNtz => {
                let secs = self.rng.gen_range(TIMESTAMP_START..TIMESTAMP_END);
                DateTime::from_timestamp(secs, 0).map_or(Value::Null, |t| {
                    Value::String(t.naive_utc().format(TIMESTAMP_FORMAT).to_string())
                })
            }
        }
    }

    fn string(&mut self) -> String {
        let len = self.rng.gen_range(STRING_LEN);
        (0..len)
            .map(|_| char::from(self.rng.sample(Alphanumeric)))
            .collect()
    }
}

/// Write `rows` fixture lines to `out`
pub fn write_fixture(
    out: &mut impl Write,
    columns: &[Column],
    rows: usize,
    generator: &mut RowGenerator,
) -> Result<()> {
    for _ in 0..rows {
        let line = serde_json::to_string(&[Value::Object(generator.row(columns))])?;
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

pub fn generate(args: GenArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.schema)
        .with_context(|| format!("failed to read {}", args.schema.display()))?;
    let columns = parse_schema(&text)
        .with_context(|| format!("invalid schema {}", args.schema.display()))?;

    let file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let mut out = BufWriter::new(file);
    let mut generator = RowGenerator::new(args.seed);
    write_fixture(&mut out, &columns, args.rows, &mut generator)?;
    out.flush()?;

    println!("wrote {} rows to {}", args.rows, args.output.display());
    Ok(())
}

#[cfg(test)]
#[path = "generate_tests.rs"]
mod tests;
