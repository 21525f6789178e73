// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, recovery, shutdown.

use std::fs::{File, OpenOptions};
use std::future::Future;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use spr_adapters::{LocalChannel, LocalSink, Sink, SinkError, TracedChannel};
use spr_engine::{EngineError, WalEngine};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::server;

/// Channel type used by the daemon (wrapped with tracing)
pub type DaemonChannel = TracedChannel<LocalChannel>;

/// Daemon engine with its concrete channel type
pub type DaemonEngine = WalEngine<DaemonChannel>;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to acquire WAL lock at {0}: daemon already running?")]
    LockFailed(PathBuf, #[source] std::io::Error),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("Server error: {0}")]
    Serve(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exclusive lock on the WAL directory, removed on release
struct WalLock {
    path: PathBuf,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    file: File,
}

impl WalLock {
    fn acquire(path: PathBuf) -> Result<Self, LifecycleError> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|e| LifecycleError::LockFailed(path.clone(), e))?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        Ok(Self { path, file })
    }

    fn release(self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove WAL lock file: {}", e);
        }
    }
}

/// Daemon state during operation
pub struct Daemon {
    pub config: Config,
    lock: Option<WalLock>,
    pub listener: TcpListener,
    pub engine: Arc<DaemonEngine>,
    /// When the daemon started
    pub start_time: Instant,
}

impl Daemon {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve HTTP until `shutdown` resolves, then shut down gracefully
    pub async fn run<F>(self, shutdown: F) -> Result<(), LifecycleError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Daemon {
            config: _,
            lock,
            listener,
            engine,
            start_time,
        } = self;

        let app = server::router(Arc::clone(&engine), start_time);
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(LifecycleError::Serve);

        // Close the engine even when the server failed
        let closed = shutdown_engine(&engine, lock).await;
        served?;
        closed
    }
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    match startup_inner(config).await {
        Ok(daemon) => Ok(daemon),
        // The lock belongs to another daemon; leave its file alone
        Err(e @ LifecycleError::LockFailed(..)) => Err(e),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<Daemon, LifecycleError> {
    // 1. Validate before touching anything
    let table = config.table_ref()?;
    let sink_root = config.sink_root()?;

    // 2. Acquire WAL lock FIRST - prevents two daemons replaying the same WAL
    let lock = if config.wal.enabled {
        std::fs::create_dir_all(&config.wal.dir)?;
        Some(WalLock::acquire(config.lock_path())?)
    } else {
        None
    };

    // 3. Open the sink channel; a missing table is fatal
    let sink = LocalSink::new(sink_root, config.sink.commit_interval);
    let channel = sink.open_channel(&config.sink.channel, &table).await?;
    let channel = TracedChannel::new(channel);

    // 4. Recover from the WAL before serving anything
    let engine = WalEngine::open(config.engine_config(), channel).await?;
    let replay = engine.replay_summary();
    if replay.rows > 0 && !replay.confirmed {
        warn!(
            "Sink has not confirmed {} replayed rows yet, serving anyway",
            replay.rows
        );
    }

    // 5. Bind (LAST - only after recovery completes)
    let listener = TcpListener::bind(config.server.listen)
        .await
        .map_err(|e| LifecycleError::BindFailed(config.server.listen, e))?;

    info!(
        "Daemon started for table {} on {}",
        table,
        listener.local_addr()?
    );

    Ok(Daemon {
        config: config.clone(),
        lock,
        listener,
        engine: Arc::new(engine),
        start_time: Instant::now(),
    })
}

/// Shut down the engine and release the WAL lock
async fn shutdown_engine(
    engine: &DaemonEngine,
    lock: Option<WalLock>,
) -> Result<(), LifecycleError> {
    info!("Shutting down daemon...");

    let result = engine.close().await;
    match &result {
        Ok(Some(report)) if !report.success() => {
            warn!("Last WAL purge left {} segments behind", report.failed.len());
        }
        Ok(_) => {}
        Err(e) => warn!("Engine did not close cleanly: {}", e),
    }

    // Lock is released only after the WAL is synced
    if let Some(lock) = lock {
        lock.release();
    }

    info!("Daemon shutdown complete");
    result.map(|_| ()).map_err(LifecycleError::from)
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    let lock_path = config.lock_path();
    if config.wal.enabled && lock_path.exists() {
        let _ = std::fs::remove_file(&lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
