//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Largest accepted upload body, 32 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Tunable knobs for one [`UplinkServer`](crate::UplinkServer).
///
/// Values come from defaults, then environment overrides via
/// [`apply_env_overrides`](Self::apply_env_overrides), then whatever the
/// binary's flags set on top.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind. Zero asks the OS for a free port.
    pub port: u16,
    /// Directory artifacts are stored in, created at startup.
    pub upload_dir: PathBuf,
    /// Upper bound on the upload request body in bytes.
    pub max_upload_bytes: usize,
    /// Seconds between keepalive probes on each channel.
    pub keepalive_interval_secs: u64,
    /// Seconds a fresh channel connection may take to announce itself.
    pub announce_timeout_secs: u64,
    /// Seconds granted to in-flight work during shutdown.
    pub shutdown_grace_secs: u64,
    /// Outbound frames buffered per channel before pushes are dropped.
    pub max_send_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8771,
            upload_dir: PathBuf::from("artifacts"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            keepalive_interval_secs: 30,
            announce_timeout_secs: 10,
            shutdown_grace_secs: 5,
            max_send_queue: 64,
        }
    }
}

impl ServerConfig {
    /// `host:port` string for the TCP listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Interval between keepalive probes.
    #[must_use]
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    /// How long a connection may stay silent before announcing.
    #[must_use]
    pub fn announce_timeout(&self) -> Duration {
        Duration::from_secs(self.announce_timeout_secs)
    }

    /// Grace period for shutdown.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Fold recognized `UPLINK_*` environment variables into the config.
    ///
    /// Unparseable values are logged and ignored rather than failing
    /// startup.
    #[must_use]
    pub fn apply_env_overrides(mut self) -> Self {
        if let Some(host) = env_string("UPLINK_HOST") {
            self.host = host;
        }
        if let Some(raw) = env_string("UPLINK_PORT") {
            match parse_port(&raw) {
                Some(port) => self.port = port,
                None => warn!(value = %raw, "ignoring unparseable UPLINK_PORT"),
            }
        }
        if let Some(dir) = env_string("UPLINK_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(raw) = env_string("UPLINK_KEEPALIVE_SECS") {
            match parse_secs(&raw) {
                Some(secs) => self.keepalive_interval_secs = secs,
                None => warn!(value = %raw, "ignoring unparseable UPLINK_KEEPALIVE_SECS"),
            }
        }
        self
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_port(raw: &str) -> Option<u16> {
    raw.trim().parse().ok()
}

/// Positive seconds only; zero would degenerate into a busy loop.
fn parse_secs(raw: &str) -> Option<u64> {
    raw.trim().parse().ok().filter(|secs| *secs > 0)
}
