//! Client-side session plumbing.
//!
//! Everything a client session needs lives behind an explicit
//! [`SessionContext`]; there is no ambient global state. The context owns
//! the session identifier, the shared [`StatusHandle`] that surfaces channel
//! activity, and the HTTP client used for uploads.
//!
//! - [`NotificationChannel`] opens the server's notification endpoint and
//!   exposes it as a single consumable stream of [`ChannelEvent`]s.
//! - [`ChannelDriver`] folds that stream into status state.
//! - [`UploadRequest`] submits an artifact over plain HTTP, independent of
//!   the channel.
//! - [`supervisor::run_channel`] reopens channels under a caller-owned
//!   [`ReconnectPolicy`](uplink_core::ReconnectPolicy).

#![deny(unsafe_code)]

pub mod channel;
pub mod context;
pub mod driver;
pub mod status;
pub mod supervisor;
pub mod upload;

pub use channel::{ChannelEventStream, NotificationChannel};
pub use context::{Artifact, ClientConfig, SessionContext};
pub use driver::{ChannelDriver, DriveOutcome};
pub use status::StatusHandle;
pub use supervisor::{SupervisorReport, SupervisorStop};
pub use upload::{UploadConfig, UploadError, UploadReceipt, UploadRequest};

pub use uplink_core::{ChannelEvent, ChannelState};
