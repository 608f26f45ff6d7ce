//! Client Sessions
//!
//! One session per HTTP connection, wrapping a hub subscription.
//!
//! ## Architecture
//!
//! - **StreamSession**: `multipart/x-mixed-replace` feed, runs until the
//!   client leaves, the hub closes, or writes keep failing
//! - **SnapshotSession**: waits for exactly one frame
//! - **MultipartWriter**: renders frames as MIME parts onto a `PartSink`
//! - **ChannelSink**: `PartSink` backed by the HTTP response body channel
//!
//! ## Lifecycle
//!
//! ```text
//!   Registered ──► Streaming ──┬─► ClientClosed ──┐
//!                              ├─► FatalError ────┼─► Deregistered
//!                              └─► HubClosed ─────┘
//! ```
//!
//! Deregistration is tied to dropping the `Subscription`, so it happens
//! exactly once on every path.

mod error;
mod multipart;
mod sink;
mod snapshot;
mod stream;

pub use error::{SessionError, SinkError};
pub use multipart::{MultipartWriter, BOUNDARY};
pub use sink::{ChannelSink, PartSink};
pub use snapshot::SnapshotSession;
pub use stream::{SessionOutcome, SessionReport, StreamConfig, StreamSession};
