//! Watch sessions: the append-only incremental variant plus the
//! subscription plumbing shared by all variants

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::fs::File;
use tokio::io::AsyncSeekExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::config::WatchConfig;
use crate::detect::Observation;
use crate::error::WatchError;
use crate::event::WatchEvent;
use crate::stream::{self, Burst};

/// Idempotent, cloneable cancellation control for one session.
///
/// Only the first call to [`StopHandle::stop`] signals the session; later
/// calls (from this handle or any clone) are no-ops.
#[derive(Clone)]
pub struct StopHandle {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl StopHandle {
    pub(crate) fn new(tx: oneshot::Sender<()>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Request shutdown. Honored at the top of the session's next poll
    /// cycle; an in-progress read burst always runs to completion first.
    pub fn stop(&self) {
        if let Ok(mut slot) = self.tx.lock() {
            if let Some(tx) = slot.take() {
                let _ = tx.send(());
            }
        }
    }
}

/// Handle to a running watch session.
///
/// Events arrive on a bounded channel: a consumer that stops draining
/// blocks the session mid-burst without dropping or duplicating bytes.
/// Dropping the subscription cancels the session; the background task
/// notices the closed channel and exits.
pub struct Subscription {
    events: mpsc::Receiver<WatchEvent>,
    stop: StopHandle,
}

impl Subscription {
    /// Receive the next event. Returns `None` once the session has
    /// terminated and its channel is closed.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    /// Receive without blocking, if an event is ready.
    pub fn try_recv(&mut self) -> Option<WatchEvent> {
        self.events.try_recv().ok()
    }

    /// Request shutdown. Idempotent; see [`StopHandle::stop`].
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Get a cloneable stop control usable from other tasks.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

/// Build the channel pair shared by every session variant.
pub(crate) fn channels(config: &WatchConfig) -> (mpsc::Sender<WatchEvent>, oneshot::Receiver<()>, Subscription) {
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let (stop_tx, stop_rx) = oneshot::channel();
    let subscription = Subscription {
        events: rx,
        stop: StopHandle::new(stop_tx),
    };
    (tx, stop_rx, subscription)
}

/// Open the watched file, mapping failure to a synchronous start error.
pub(crate) async fn open(path: &Path) -> Result<File, WatchError> {
    File::open(path).await.map_err(|source| WatchError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Start watching `path` for appended content.
///
/// Opens the file, seeds the first observation, and seats the cursor at the
/// current end of file so content already present at watch-start is not
/// replayed. Afterwards each poll compares modification times; when the
/// file changed, everything between the cursor and end-of-file is streamed
/// in order, with the burst's first chunk flagged.
///
/// This variant is truncation-blind: it compares only mtimes, so a file
/// that is rotated out from under it keeps reading from the old offset.
/// Use [`crate::tail`] when rotation matters.
pub async fn watch(path: impl AsRef<Path>, config: WatchConfig) -> Result<Subscription, WatchError> {
    config.validate()?;
    let path = path.as_ref().to_path_buf();

    let mut file = open(&path).await?;
    let seed = Observation::probe(&path).await?;
    file.seek(SeekFrom::End(0)).await.map_err(WatchError::Read)?;

    let (tx, stop_rx, subscription) = channels(&config);
    info!(path = %path.display(), "watch session started");
    tokio::spawn(run_incremental(file, path, config, seed, tx, stop_rx));
    Ok(subscription)
}

async fn run_incremental(
    mut file: File,
    path: PathBuf,
    config: WatchConfig,
    mut last: Observation,
    tx: mpsc::Sender<WatchEvent>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut stop => {
                info!(path = %path.display(), "stop requested, watch session ending");
                return;
            }
            _ = tokio::time::sleep(config.poll_interval()) => {}
        }

        if tx.is_closed() {
            debug!(path = %path.display(), "consumer gone, watch session ending");
            return;
        }

        let current = match Observation::probe(&path).await {
            Ok(observation) => observation,
            Err(e) => {
                error!(path = %path.display(), error = %e, "stat failed, watch session ending");
                let _ = tx.send(WatchEvent::Error(e)).await;
                return;
            }
        };

        let changed = current.newer_than(&last);
        last = current;
        if !changed {
            continue;
        }

        match stream::forward_to_eof(&mut file, &tx, config.buffer_bytes).await {
            Ok(Burst::Complete { bytes }) => {
                debug!(path = %path.display(), bytes, "burst complete");
            }
            Ok(Burst::Disconnected) => return,
            Err(e) => {
                error!(path = %path.display(), error = %e, "read failed, watch session ending");
                let _ = tx.send(WatchEvent::Error(e)).await;
                return;
            }
        }
    }
}
