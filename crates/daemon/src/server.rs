// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP routes.
//!
//! Engine errors are mapped to status codes here and nowhere else.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Serialize;
use spr_adapters::{Channel, SinkError};
use spr_engine::{EngineStats, InsertError, WalEngine};
use tracing::{debug, warn};

/// Liveness text returned by `GET /snowpipe/hello`
pub const HELLO: &str = "Hello, there.";

struct AppState<C> {
    engine: Arc<WalEngine<C>>,
    started: Instant,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            started: self.started,
        }
    }
}

/// Build the router over an open engine
pub fn router<C: Channel>(engine: Arc<WalEngine<C>>, started: Instant) -> Router {
    Router::new()
        .route("/snowpipe/hello", get(hello))
        .route("/snowpipe/insert", put(insert::<C>))
        .route("/snowpipe/status", get(status::<C>))
        .with_state(AppState { engine, started })
}

async fn hello() -> &'static str {
    HELLO
}

async fn insert<C: Channel>(
    State(app): State<AppState<C>>,
    body: String,
) -> Result<String, ApiError> {
    let outcome = app.engine.insert_json(&body).await?;
    debug!(
        attempted = outcome.attempted,
        rejected = outcome.error_count,
        "insert handled"
    );
    Ok(outcome.to_string())
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    uptime_secs: u64,
    #[serde(flatten)]
    stats: EngineStats,
}

async fn status<C: Channel>(State(app): State<AppState<C>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        uptime_secs: app.started.elapsed().as_secs(),
        stats: app.engine.stats().await,
    })
}

/// An insert failure on its way to the caller
#[derive(Debug)]
pub struct ApiError(InsertError);

impl From<InsertError> for ApiError {
    fn from(e: InsertError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            InsertError::MalformedBatch(_) => StatusCode::BAD_REQUEST,
            InsertError::Sink(SinkError::TableNotFound(_)) => StatusCode::NOT_FOUND,
            InsertError::Wal(_) | InsertError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            InsertError::Sink(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "insert failed");
        }
        (status, self.0.to_string()).into_response()
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
