//! Frame Broadcast Hub
//!
//! Fans every frame cut by the reader out to all connected viewers.
//!
//! ## Architecture
//!
//! - **FrameHub**: Owns the subscriber registry and the publish path
//! - **FrameQueue**: Per-subscriber bounded queue with drop-on-backlog
//! - **Subscription**: RAII handle held by a session; deregisters on drop
//!
//! ```text
//!   FrameReader ──publish──► FrameHub ─┬─ offer ─► FrameQueue ─► StreamSession
//!                            (RwLock)  ├─ offer ─► FrameQueue ─► StreamSession
//!                                      └─ offer ─► FrameQueue ─► SnapshotSession
//! ```
//!
//! Publishing never waits: a subscriber whose backlog has reached the
//! watermark simply misses the frame.

mod queue;
mod registry;
mod subscription;

pub use queue::{FrameQueue, Offer};
pub use registry::{FrameHub, HubConfig, HubStats, PublishReport, SubscriberId};
pub use subscription::Subscription;
