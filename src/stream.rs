//! Burst reader: forwards newly-available bytes to the event channel

use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::WatchError;
use crate::event::{Chunk, WatchEvent};

/// Outcome of one read burst.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Burst {
    /// Reached end-of-file; carries the total bytes forwarded.
    Complete { bytes: u64 },
    /// The consumer dropped its receiver mid-burst.
    Disconnected,
}

/// Read from the handle's current position to end-of-file, forwarding each
/// buffer-sized chunk over `tx`.
///
/// The cursor is never repositioned here; on success it is left at the new
/// end of file, ready for the next cycle's change check. The first chunk of
/// the burst is flagged `first`. A read error aborts the burst without
/// rolling back already-forwarded chunks. Sends block when the channel is
/// full, so a stalled consumer backpressures the whole session.
pub(crate) async fn forward_to_eof(
    file: &mut File,
    tx: &mpsc::Sender<WatchEvent>,
    buffer_bytes: usize,
) -> Result<Burst, WatchError> {
    let mut buf = vec![0u8; buffer_bytes];
    let mut total = 0u64;
    let mut first = true;

    loop {
        let n = file.read(&mut buf).await.map_err(WatchError::Read)?;
        if n == 0 {
            trace!(total, "burst reached end of file");
            return Ok(Burst::Complete { bytes: total });
        }

        let chunk = Chunk {
            bytes: buf[..n].to_vec(),
            first,
        };
        first = false;
        total += n as u64;

        if tx.send(WatchEvent::Data(chunk)).await.is_err() {
            debug!(total, "consumer gone mid-burst");
            return Ok(Burst::Disconnected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    async fn open(file: &NamedTempFile) -> File {
        File::open(file.path()).await.expect("open temp file")
    }

    #[tokio::test]
    async fn test_forwards_all_bytes_in_order() {
        let mut tmp = NamedTempFile::new().expect("temp file");
        tmp.write_all(b"hello world").expect("write");
        tmp.flush().expect("flush");

        let mut file = open(&tmp).await;
        let (tx, mut rx) = mpsc::channel(16);

        // tiny buffer forces multiple chunks
        let outcome = forward_to_eof(&mut file, &tx, 4).await.expect("burst");
        assert_eq!(outcome, Burst::Complete { bytes: 11 });
        drop(tx);

        let mut collected = Vec::new();
        let mut firsts = Vec::new();
        while let Some(event) = rx.recv().await {
            let chunk = event.into_data().expect("data event");
            firsts.push(chunk.first);
            collected.extend_from_slice(&chunk.bytes);
        }

        assert_eq!(collected, b"hello world");
        assert_eq!(firsts, vec![true, false, false]);
    }

    #[tokio::test]
    async fn test_resumes_from_cursor() {
        let mut tmp = NamedTempFile::new().expect("temp file");
        tmp.write_all(b"ab").expect("write");
        tmp.flush().expect("flush");

        let mut file = open(&tmp).await;
        let (tx, mut rx) = mpsc::channel(16);

        forward_to_eof(&mut file, &tx, 64).await.expect("first burst");
        assert_eq!(rx.recv().await.and_then(WatchEvent::into_data).expect("chunk").bytes, b"ab");

        // append after the cursor reached EOF
        tmp.write_all(b"cd").expect("append");
        tmp.flush().expect("flush");

        let outcome = forward_to_eof(&mut file, &tx, 64).await.expect("second burst");
        assert_eq!(outcome, Burst::Complete { bytes: 2 });

        let chunk = rx.recv().await.and_then(WatchEvent::into_data).expect("chunk");
        assert_eq!(chunk.bytes, b"cd");
        // each burst re-tags its first chunk
        assert!(chunk.first);
    }

    #[tokio::test]
    async fn test_empty_read_sends_nothing() {
        let tmp = NamedTempFile::new().expect("temp file");
        let mut file = open(&tmp).await;
        let (tx, mut rx) = mpsc::channel(16);

        let outcome = forward_to_eof(&mut file, &tx, 64).await.expect("burst");
        assert_eq!(outcome, Burst::Complete { bytes: 0 });

        drop(tx);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_receiver_disconnects() {
        let mut tmp = NamedTempFile::new().expect("temp file");
        tmp.write_all(b"data").expect("write");
        tmp.flush().expect("flush");

        let mut file = open(&tmp).await;
        let (tx, rx) = mpsc::channel(16);
        drop(rx);

        let outcome = forward_to_eof(&mut file, &tx, 64).await.expect("burst");
        assert_eq!(outcome, Burst::Disconnected);
    }
}
