// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blocking HTTP client for the relay daemon

use std::time::Duration;

use anyhow::{Context, Result};

/// Default daemon address, matching `sprd`'s default listen address
pub const DEFAULT_URL: &str = "http://127.0.0.1:8080";

const HELLO_PATH: &str = "/snowpipe/hello";
const INSERT_PATH: &str = "/snowpipe/insert";
const STATUS_PATH: &str = "/snowpipe/status";

// Replay on a restarted daemon can hold the first request for a while
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct RelayClient {
    agent: ureq::Agent,
    base: String,
}

impl RelayClient {
    pub fn new(url: &str) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base: url.trim_end_matches('/').to_string(),
        }
    }

    pub fn hello(&self) -> Result<Reply> {
        self.get(HELLO_PATH)
    }

    pub fn status(&self) -> Result<Reply> {
        self.get(STATUS_PATH)
    }

    /// PUT a JSON array of rows
    pub fn insert(&self, body: &str) -> Result<Reply> {
        let url = self.url(INSERT_PATH);
        let mut response = self
            .agent
            .put(&url)
            .header("Content-Type", "application/json")
            .send(body)
            .with_context(|| format!("PUT {} failed", url))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .with_context(|| format!("failed to read response from {}", url))?;
        Ok(Reply { status, body })
    }

    fn get(&self, path: &str) -> Result<Reply> {
        let url = self.url(path);
        let mut response = self
            .agent
            .get(&url)
            .call()
            .with_context(|| format!("GET {} failed", url))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .with_context(|| format!("failed to read response from {}", url))?;
        Ok(Reply { status, body })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
