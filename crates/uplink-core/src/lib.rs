//! # uplink-core
//!
//! Shared vocabulary for the uplink client and server crates:
//!
//! - [`SessionId`]: version-4 structured identifier, generated once per
//!   client session, parseable with structural validation
//! - [`ChannelState`] and the [`ChannelEvent`] alphabet produced by a
//!   notification channel connection
//! - [`StatusHistory`]: bounded buffer of received status messages, oldest
//!   evicted first
//! - [`protocol`]: announcement frame codec, keepalive sentinel, and the
//!   well-known endpoint paths
//! - [`ReconnectPolicy`]: caller-owned retry parameters with exponential
//!   backoff

#![deny(unsafe_code)]

pub mod events;
pub mod history;
pub mod ids;
pub mod protocol;
pub mod retry;

pub use events::{ChannelEvent, ChannelState};
pub use history::{DEFAULT_HISTORY_CAPACITY, StatusHistory};
pub use ids::{IdParseError, SessionId};
pub use retry::ReconnectPolicy;
