//! Operational endpoints.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::server::{AppState, APP_NAME};

/// Body of `/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` while the process answers at all.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Live notification channels.
    pub channels: usize,
}

/// Body of `/version`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AboutResponse {
    /// Application name.
    pub name: String,
    /// Crate version baked in at build time.
    pub version: String,
    /// RFC 3339 start timestamp.
    pub started: String,
}

/// Build the health body for the current moment.
#[must_use]
pub fn health_snapshot(start: Instant, channels: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".to_string(),
        uptime_secs: start.elapsed().as_secs(),
        channels,
    }
}

/// Build the version body.
#[must_use]
pub fn about_snapshot(started_at: DateTime<Utc>) -> AboutResponse {
    AboutResponse {
        name: APP_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started: started_at.to_rfc3339(),
    }
}

/// `GET /ping`, answers with the application name.
pub async fn ping() -> &'static str {
    APP_NAME
}

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health_snapshot(state.start_time, state.registry.len()))
}

/// `GET /version`.
pub async fn about(State(state): State<AppState>) -> Json<AboutResponse> {
    Json(about_snapshot(state.started_at))
}
