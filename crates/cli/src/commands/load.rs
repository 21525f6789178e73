// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `spr load` - Replay a fixture file as a stream of requests
//!
//! Each non-empty line of the fixture is one request body.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::client::RelayClient;

#[derive(Args)]
pub struct LoadArgs {
    /// Fixture file, one JSON array per line
    #[arg(short, long)]
    pub file: PathBuf,

    /// Number of passes over the fixture
    #[arg(short, long, default_value_t = 1)]
    pub repeat: u32,

    /// Requests in flight at once
    #[arg(short, long, default_value_t = 1)]
    pub concurrency: usize,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub requests: usize,
    pub failures: usize,
    pub elapsed: Duration,
}

pub fn load(client: &RelayClient, args: LoadArgs) -> Result<()> {
    let fixture = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let bodies = fixture_bodies(&fixture);
    if bodies.is_empty() {
        bail!("{} has no request bodies", args.file.display());
    }

    let report = run(client, &bodies, args.repeat, args.concurrency);
    println!(
        "{} requests, {} failed, {:.3}s",
        report.requests,
        report.failures,
        report.elapsed.as_secs_f64()
    );
    if report.failures > 0 {
        bail!("{} of {} requests failed", report.failures, report.requests);
    }
    Ok(())
}

pub fn fixture_bodies(fixture: &str) -> Vec<&str> {
    fixture
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Send every body `repeat` times from `concurrency` worker threads.
///
/// Workers share one agent and take requests in fixture order, so a single
/// worker sends them strictly in order. Transport errors and non-2xx replies
/// both count as failures; the run continues past them.
pub fn run(client: &RelayClient, bodies: &[&str], repeat: u32, concurrency: usize) -> LoadReport {
    let total = bodies.len() * repeat as usize;
    let next = AtomicUsize::new(0);
    let failures = AtomicUsize::new(0);
    let workers = concurrency.clamp(1, total.max(1));

    let start = Instant::now();
    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let n = next.fetch_add(1, Ordering::Relaxed);
                if n >= total {
                    break;
                }
                if !send(client, n + 1, bodies[n % bodies.len()]) {
                    failures.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });

    LoadReport {
        requests: total,
        failures: failures.into_inner(),
        elapsed: start.elapsed(),
    }
}

fn send(client: &RelayClient, request: usize, body: &str) -> bool {
    match client.insert(body) {
        Ok(reply) if reply.is_success() => true,
        Ok(reply) => {
            eprintln!("request {}: HTTP {}: {}", request, reply.status, reply.body);
            false
        }
        Err(e) => {
            eprintln!("request {}: {:#}", request, e);
            false
        }
    }
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
