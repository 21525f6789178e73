// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Snowpipe relay daemon (sprd)
//!
//! Accepts JSON rows over HTTP and relays them to the sink through the WAL
//! engine.

pub mod config;
pub mod lifecycle;
pub mod server;

pub use config::{Config, ConfigError};
pub use lifecycle::{startup, Daemon, LifecycleError};
