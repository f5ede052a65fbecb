//! Server assembly and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uplink_core::protocol;

use crate::config::ServerConfig;
use crate::registry::SessionRegistry;
use crate::shutdown::ShutdownCoordinator;
use crate::{health, upload, ws};

/// Application name answered on `/ping` and reported on `/version`.
pub const APP_NAME: &str = "uplink";

/// Failures that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was attempted.
        addr: String,
        /// Underlying bind error.
        #[source]
        source: std::io::Error,
    },
    /// Filesystem preparation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Shared state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Live session map.
    pub registry: Arc<SessionRegistry>,
    /// Shutdown fan-out.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Effective configuration.
    pub config: Arc<ServerConfig>,
    /// Monotonic start instant, for uptime.
    pub start_time: Instant,
    /// Wall-clock start time, for `/version`.
    pub started_at: DateTime<Utc>,
}

/// One uplink server instance.
pub struct UplinkServer {
    state: AppState,
}

impl UplinkServer {
    /// Assemble a server from its configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let state = AppState {
            registry: Arc::new(SessionRegistry::new(config.max_send_queue)),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            config: Arc::new(config),
            start_time: Instant::now(),
            started_at: Utc::now(),
        };
        Self { state }
    }

    /// The full route table with tracing and permissive CORS applied.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route(protocol::CHANNEL_PATH, get(ws::channel_handler))
            .route(
                protocol::UPLOAD_PATH,
                post(upload::upload_handler)
                    .layer(DefaultBodyLimit::max(self.state.config.max_upload_bytes)),
            )
            .route("/ping", get(health::ping))
            .route("/version", get(health::about))
            .route("/health", get(health::health))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Bind the listener, make sure the upload directory exists, and serve
    /// until shutdown.
    ///
    /// Returns the bound address (meaningful when the configured port was
    /// zero) and the join handle of the accept loop.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        tokio::fs::create_dir_all(&self.state.config.upload_dir).await?;

        let addr = self.state.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, upload_dir = %self.state.config.upload_dir.display(), "uplink listening");

        let router = self.router();
        let token = self.state.shutdown.token();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = served {
                error!(error = %e, "serve loop ended with error");
            }
        });

        Ok((local_addr, handle))
    }

    /// The live session map.
    #[must_use]
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.state.registry)
    }

    /// The shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.state.shutdown)
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> Arc<ServerConfig> {
        Arc::clone(&self.state.config)
    }
}
