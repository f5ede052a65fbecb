//! Server side of uplink.
//!
//! One [`UplinkServer`] hosts three surfaces on a single listener:
//!
//! - the notification channel endpoint at `/websockreg`, where clients
//!   announce a session identifier and then receive pushed text frames,
//! - the artifact intake at `/upload`, a multipart POST correlated to a
//!   session by identifier only,
//! - small operational endpoints (`/ping`, `/version`, `/health`).
//!
//! The [`SessionRegistry`] maps live session identifiers to channel
//! handles and is the only shared state between the surfaces.

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod upload;
pub mod ws;

pub use config::ServerConfig;
pub use registry::{ChannelHandle, SessionRegistry};
pub use server::{AppState, ServerError, UplinkServer, APP_NAME};
pub use shutdown::ShutdownCoordinator;
