//! Truncation-aware tail replication
//!
//! Models log-rotation-safe tailing: no change flag, a read attempt every
//! cycle, and a cursor reset to offset 0 whenever the file's size strictly
//! decreases between polls. The first round replays the file as it exists
//! at watch-start.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncSeekExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::config::WatchConfig;
use crate::detect::Observation;
use crate::error::WatchError;
use crate::event::WatchEvent;
use crate::session::{self, Subscription};
use crate::stream::{self, Burst};

/// Start replicating `path`, rotation-safe.
///
/// Unlike [`crate::watch`], the cursor starts at offset 0, so existing
/// content is streamed on the first round. Each cycle stats the file before
/// and after its read: a strict size decrease since the previously recorded
/// size resets the cursor to 0 before reading, so the burst restarts from
/// the beginning of the now-shorter file. Shrinking to exactly the previous
/// size does not reset.
pub async fn tail(path: impl AsRef<Path>, config: WatchConfig) -> Result<Subscription, WatchError> {
    config.validate()?;
    let path = path.as_ref().to_path_buf();

    let file = session::open(&path).await?;
    let recorded = Observation::probe(&path).await?;

    let (tx, stop_rx, subscription) = session::channels(&config);
    info!(path = %path.display(), "tail session started");
    tokio::spawn(run_replication(file, path, config, recorded, tx, stop_rx));
    Ok(subscription)
}

async fn run_replication(
    mut file: File,
    path: PathBuf,
    config: WatchConfig,
    mut recorded: Observation,
    tx: mpsc::Sender<WatchEvent>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        let before = match Observation::probe(&path).await {
            Ok(observation) => observation,
            Err(e) => {
                error!(path = %path.display(), error = %e, "stat failed, tail session ending");
                let _ = tx.send(WatchEvent::Error(e)).await;
                return;
            }
        };

        if before.truncated_since(&recorded) {
            info!(
                path = %path.display(),
                old_len = recorded.len,
                new_len = before.len,
                "file truncated, restarting from offset 0"
            );
            if let Err(source) = file.seek(SeekFrom::Start(0)).await {
                let e = WatchError::Read(source);
                error!(path = %path.display(), error = %e, "seek failed, tail session ending");
                let _ = tx.send(WatchEvent::Error(e)).await;
                return;
            }
        }

        // no change flag: end-of-file naturally yields zero bytes when
        // nothing new exists
        match stream::forward_to_eof(&mut file, &tx, config.buffer_bytes).await {
            Ok(Burst::Complete { bytes }) => {
                if bytes > 0 {
                    debug!(path = %path.display(), bytes, "burst complete");
                }
            }
            Ok(Burst::Disconnected) => return,
            Err(e) => {
                error!(path = %path.display(), error = %e, "read failed, tail session ending");
                let _ = tx.send(WatchEvent::Error(e)).await;
                return;
            }
        }

        recorded = match Observation::probe(&path).await {
            Ok(observation) => observation,
            Err(e) => {
                error!(path = %path.display(), error = %e, "stat failed, tail session ending");
                let _ = tx.send(WatchEvent::Error(e)).await;
                return;
            }
        };

        // fixed pause after each stat-read-stat round, raced by the stop
        // signal
        tokio::select! {
            _ = &mut stop => {
                info!(path = %path.display(), "stop requested, tail session ending");
                return;
            }
            _ = tokio::time::sleep(config.poll_interval()) => {}
        }

        if tx.is_closed() {
            debug!(path = %path.display(), "consumer gone, tail session ending");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Chunk;
    use std::io::Write;
    use std::time::Duration;
    use tokio::time::timeout;

    fn fast_config() -> WatchConfig {
        WatchConfig {
            buffer_bytes: 64,
            channel_capacity: 16,
            poll_interval_ms: 25,
        }
    }

    async fn next_chunk(sub: &mut Subscription) -> Chunk {
        timeout(Duration::from_secs(5), sub.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed unexpectedly")
            .into_data()
            .expect("expected a data event")
    }

    async fn collect_bytes(sub: &mut Subscription, want: usize) -> Vec<u8> {
        let mut collected = Vec::new();
        while collected.len() < want {
            collected.extend_from_slice(&next_chunk(sub).await.bytes);
        }
        collected
    }

    #[tokio::test]
    async fn test_first_round_replays_existing_content() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("app.log");
        std::fs::write(&path, b"already here").expect("write");

        let mut sub = tail(&path, fast_config()).await.expect("tail");

        let chunk = next_chunk(&mut sub).await;
        assert_eq!(chunk.bytes, b"already here");
        assert!(chunk.first);

        sub.stop();
    }

    #[tokio::test]
    async fn test_truncation_restarts_from_offset_zero() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("app.log");
        std::fs::write(&path, b"ab").expect("write");

        let mut sub = tail(&path, fast_config()).await.expect("tail");
        assert_eq!(collect_bytes(&mut sub, 2).await, b"ab");

        // let a few idle rounds record the size of 2 before rotating
        tokio::time::sleep(Duration::from_millis(150)).await;

        // rotate: strictly smaller than the recorded size of 2
        std::fs::write(&path, b"x").expect("rewrite");

        let chunk = next_chunk(&mut sub).await;
        assert_eq!(chunk.bytes, b"x");
        assert!(chunk.first);

        sub.stop();
    }

    #[tokio::test]
    async fn test_shrink_to_equal_size_does_not_reset() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("app.log");
        std::fs::write(&path, b"ab").expect("write");

        let mut sub = tail(&path, fast_config()).await.expect("tail");
        assert_eq!(collect_bytes(&mut sub, 2).await, b"ab");

        // rewrite in place at exactly the recorded size: cursor stays at
        // offset 2 and the size never dips below it
        {
            use std::io::Seek;
            let mut file = std::fs::OpenOptions::new().write(true).open(&path).expect("open");
            file.seek(std::io::SeekFrom::Start(0)).expect("seek");
            file.write_all(b"xy").expect("rewrite");
            file.flush().expect("flush");
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(sub.try_recv().is_none());

        // growth past the cursor resumes streaming from offset 2
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).expect("open");
        file.write_all(b"z").expect("append");
        file.flush().expect("flush");

        let chunk = next_chunk(&mut sub).await;
        assert_eq!(chunk.bytes, b"z");

        sub.stop();
    }

    #[tokio::test]
    async fn test_appends_are_streamed_in_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("app.log");
        std::fs::write(&path, b"").expect("create");

        let mut sub = tail(&path, fast_config()).await.expect("tail");

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).expect("open");
        for piece in [&b"one "[..], &b"two "[..], &b"three"[..]] {
            file.write_all(piece).expect("append");
            file.flush().expect("flush");
            tokio::time::sleep(Duration::from_millis(60)).await;
        }

        assert_eq!(collect_bytes(&mut sub, 13).await, b"one two three");

        sub.stop();
    }
}
