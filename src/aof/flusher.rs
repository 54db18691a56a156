//! AOF Flusher
//!
//! Background thread that syncs the AOF on a fixed interval.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::error::Result;
use super::AofWriter;

/// Handle to the background sync thread
///
/// Dropping the handle stops the thread after one final sync.
pub struct Flusher {
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Flusher {
    /// Start syncing `writer` every `interval`
    pub fn spawn(writer: Arc<AofWriter>, interval: Duration) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = channel::bounded(0);

        let handle = thread::Builder::new()
            .name("aof-flusher".to_string())
            .spawn(move || run(writer, interval, shutdown_rx))?;

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for its final sync
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Disconnecting the channel wakes the thread.
        drop(self.shutdown_tx.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("AOF flusher thread panicked");
            }
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(writer: Arc<AofWriter>, interval: Duration, shutdown: Receiver<()>) {
    tracing::debug!(?interval, "AOF flusher started");
    let ticker = channel::tick(interval);

    loop {
        channel::select! {
            recv(ticker) -> _ => {
                if let Err(e) = writer.sync() {
                    tracing::error!(error = %e, path = %writer.path().display(), "AOF sync failed");
                }
            }
            recv(shutdown) -> _ => break,
        }
    }

    if let Err(e) = writer.sync() {
        tracing::error!(error = %e, "final AOF sync failed");
    }
    tracing::debug!("AOF flusher stopped");
}
