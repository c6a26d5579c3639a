//! Poll-to-poll change and truncation detection

use std::path::Path;
use std::time::SystemTime;

use tracing::trace;

use crate::error::WatchError;

/// File metadata captured at one poll.
///
/// Transient: held only across consecutive polls to compute a delta
/// decision, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// File length in bytes.
    pub len: u64,
    /// Modification timestamp.
    pub modified: SystemTime,
}

impl Observation {
    /// Capture a fresh observation for the file at `path`.
    ///
    /// Stats by path rather than by open handle so that deleting the
    /// watched file surfaces as a failure on the next poll instead of
    /// silently succeeding against the unlinked inode. Failure is fatal to
    /// the session.
    pub async fn probe(path: &Path) -> Result<Self, WatchError> {
        let meta = tokio::fs::metadata(path).await.map_err(WatchError::Stat)?;
        let modified = meta.modified().map_err(WatchError::Stat)?;
        let obs = Self {
            len: meta.len(),
            modified,
        };
        trace!(path = %path.display(), len = obs.len, "observation captured");
        Ok(obs)
    }

    /// Check whether this observation's mtime is strictly newer than
    /// `prev`'s.
    ///
    /// Blind to truncation: a rewrite that leaves the file shorter still
    /// only moves the mtime forward.
    pub fn newer_than(&self, prev: &Observation) -> bool {
        prev.modified < self.modified
    }

    /// Check whether the file shrank since `prev`.
    ///
    /// Strict decrease only: shrinking to exactly the previous size does
    /// not count as truncation.
    pub fn truncated_since(&self, prev: &Observation) -> bool {
        self.len < prev.len
    }
}
