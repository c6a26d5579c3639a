//! filetail - polling-based file tailing
//!
//! Watches a single file for appended or truncated content and streams
//! newly-written bytes to a consumer over a bounded channel, in the spirit
//! of a continuous `tail -f`. Detection is poll-based by construction:
//! there is no inotify/kqueue integration and no durability guarantee if
//! the file is deleted and recreated between polls.
//!
//! # Core Concepts
//!
//! - **One task per session**: each watch runs its detect-then-stream loop
//!   on a dedicated tokio task; the creator and the task communicate only
//!   through channels
//! - **Bounded delivery**: consumers exert backpressure by not draining the
//!   event channel, which blocks the session mid-burst
//! - **Terminal errors**: any runtime error ends the session; at most one
//!   error event is delivered, always last, and the channel closes exactly
//!   once
//!
//! # Modules
//!
//! - [`config`] - session tunables and environment loading
//! - [`detect`] - poll-to-poll change and truncation detection
//! - [`session`] - the append-only incremental variant and subscription plumbing
//! - [`tail`] - the truncation-aware replication variant
//! - [`split`] - change pulses and full-reread streaming

pub mod config;
pub mod detect;
pub mod error;
pub mod event;
pub mod session;
pub mod split;
mod stream;
pub mod tail;

// Re-export commonly used types
pub use config::WatchConfig;
pub use detect::Observation;
pub use error::WatchError;
pub use event::{ChangeEvent, Chunk, WatchEvent};
pub use session::{StopHandle, Subscription, watch};
pub use split::{ChangeSubscription, watch_changes, watch_full};
pub use tail::tail;
