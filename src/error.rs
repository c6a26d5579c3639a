//! Watch error types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by watch sessions
///
/// All in-loop errors are terminal: a session that hits one delivers it as
/// its final event, closes the event channel, and exits. There is no
/// retry-and-continue; callers wanting to keep watching start a new session.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The file could not be opened at watch start.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Metadata could not be obtained during a poll.
    #[error("failed to stat watched file: {0}")]
    Stat(#[source] io::Error),

    /// A read failed mid-burst (not end-of-file).
    #[error("read failed during burst: {0}")]
    Read(#[source] io::Error),

    /// A tunable was invalid at startup.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl WatchError {
    /// Check if this error is returned synchronously from a start operation
    /// rather than delivered on a running session's event channel.
    pub fn is_startup(&self) -> bool {
        matches!(self, WatchError::Open { .. } | WatchError::Config(_))
    }

    /// Get the underlying I/O error kind, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            WatchError::Open { source, .. } | WatchError::Stat(source) | WatchError::Read(source) => {
                Some(source.kind())
            }
            WatchError::Config(_) => None,
        }
    }
}
