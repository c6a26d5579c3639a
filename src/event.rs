//! Events delivered to watch consumers

use crate::error::WatchError;

/// One contiguous run of file bytes from a single burst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Bytes in file order.
    pub bytes: Vec<u8>,
    /// True for the first chunk emitted since the most recent detected
    /// change. Consumers use this flag to segment bursts.
    pub first: bool,
}

/// Tagged event stream for a watch session.
///
/// The channel closing is the terminal event; at most one `Error` is ever
/// delivered, always last.
#[derive(Debug)]
pub enum WatchEvent {
    /// Newly-read file content.
    Data(Chunk),
    /// The terminal error that ended the session.
    Error(WatchError),
}

impl WatchEvent {
    /// Extract the data chunk, if this is a data event.
    pub fn into_data(self) -> Option<Chunk> {
        match self {
            WatchEvent::Data(chunk) => Some(chunk),
            WatchEvent::Error(_) => None,
        }
    }
}

/// Pulse stream for the split watch variant: change notifications carrying
/// no file content.
#[derive(Debug)]
pub enum ChangeEvent {
    /// The file's modification time advanced since the previous poll.
    Changed,
    /// The terminal error that ended the session.
    Error(WatchError),
}
