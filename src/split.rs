//! Split watch/read variant
//!
//! Separates "detect that something changed" from "stream the changed
//! content". [`watch_changes`] emits one pulse per detected change and no
//! data; [`watch_full`] rereads the whole file from offset 0 on every
//! detected change. The full reread trades efficiency for a trivially
//! simple detection/streaming boundary; that inefficiency is accepted, not
//! a bug.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncSeekExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::config::WatchConfig;
use crate::detect::Observation;
use crate::error::WatchError;
use crate::event::{ChangeEvent, WatchEvent};
use crate::session::{self, StopHandle, Subscription};
use crate::stream::{self, Burst};

/// Handle to a running change-pulse session.
///
/// Same lifecycle as [`Subscription`]: bounded delivery, at most one error
/// event (always last), channel closed exactly once when the session ends.
pub struct ChangeSubscription {
    events: mpsc::Receiver<ChangeEvent>,
    stop: StopHandle,
}

impl ChangeSubscription {
    /// Receive the next pulse or terminal error. Returns `None` once the
    /// session has terminated and its channel is closed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Receive without blocking, if an event is ready.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
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

/// Start watching `path` for changes, emitting a single pulse per detected
/// change and no file content.
///
/// The first observation is seeded at start, so content already present
/// does not produce a pulse; only a later mtime advance does.
pub async fn watch_changes(path: impl AsRef<Path>, config: WatchConfig) -> Result<ChangeSubscription, WatchError> {
    config.validate()?;
    let path = path.as_ref().to_path_buf();

    // detection is purely metadata-based; the initial probe doubles as the
    // synchronous existence check
    let seed = Observation::probe(&path).await?;

    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let (stop_tx, stop_rx) = oneshot::channel();
    let subscription = ChangeSubscription {
        events: rx,
        stop: StopHandle::new(stop_tx),
    };

    info!(path = %path.display(), "change watch session started");
    tokio::spawn(run_pulses(path, config, seed, tx, stop_rx));
    Ok(subscription)
}

async fn run_pulses(
    path: PathBuf,
    config: WatchConfig,
    mut last: Observation,
    tx: mpsc::Sender<ChangeEvent>,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut stop => {
                info!(path = %path.display(), "stop requested, change watch ending");
                return;
            }
            _ = tokio::time::sleep(config.poll_interval()) => {}
        }

        if tx.is_closed() {
            debug!(path = %path.display(), "consumer gone, change watch ending");
            return;
        }

        let current = match Observation::probe(&path).await {
            Ok(observation) => observation,
            Err(e) => {
                error!(path = %path.display(), error = %e, "stat failed, change watch ending");
                let _ = tx.send(ChangeEvent::Error(e)).await;
                return;
            }
        };

        if current.newer_than(&last) {
            debug!(path = %path.display(), "change detected");
            if tx.send(ChangeEvent::Changed).await.is_err() {
                return;
            }
        }
        last = current;
    }
}

/// Start watching `path`, streaming the entire file from offset 0 on every
/// detected change.
///
/// Only the very first chunk of each full-file read is flagged first. The
/// full reread makes this variant naturally rotation-tolerant at the cost
/// of rereading unchanged content.
pub async fn watch_full(path: impl AsRef<Path>, config: WatchConfig) -> Result<Subscription, WatchError> {
    config.validate()?;
    let path = path.as_ref().to_path_buf();

    let file = session::open(&path).await?;
    let seed = Observation::probe(&path).await?;

    let (tx, stop_rx, subscription) = session::channels(&config);
    info!(path = %path.display(), "full-reread watch session started");
    tokio::spawn(run_full(file, path, config, seed, tx, stop_rx));
    Ok(subscription)
}

async fn run_full(
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
                info!(path = %path.display(), "stop requested, full-reread watch ending");
                return;
            }
            _ = tokio::time::sleep(config.poll_interval()) => {}
        }

        if tx.is_closed() {
            debug!(path = %path.display(), "consumer gone, full-reread watch ending");
            return;
        }

        let current = match Observation::probe(&path).await {
            Ok(observation) => observation,
            Err(e) => {
                error!(path = %path.display(), error = %e, "stat failed, full-reread watch ending");
                let _ = tx.send(WatchEvent::Error(e)).await;
                return;
            }
        };

        let changed = current.newer_than(&last);
        last = current;
        if !changed {
            continue;
        }

        if let Err(source) = file.seek(SeekFrom::Start(0)).await {
            let e = WatchError::Read(source);
            error!(path = %path.display(), error = %e, "seek failed, full-reread watch ending");
            let _ = tx.send(WatchEvent::Error(e)).await;
            return;
        }

        match stream::forward_to_eof(&mut file, &tx, config.buffer_bytes).await {
            Ok(Burst::Complete { bytes }) => {
                debug!(path = %path.display(), bytes, "full reread complete");
            }
            Ok(Burst::Disconnected) => return,
            Err(e) => {
                error!(path = %path.display(), error = %e, "read failed, full-reread watch ending");
                let _ = tx.send(WatchEvent::Error(e)).await;
                return;
            }
        }
    }
}
