//! Shutdown signaling for the collect loop.
//!
//! Abstracts a tokio watch channel into a shutdown signal: one transmitter can
//! notify any number of loop tasks, and receivers observe the signal at their
//! next await point. The signal carries no payload.

use tokio::sync::watch;

/// Transmitter side of the shutdown channel.
///
/// Cloneable; any clone can trigger shutdown for every subscribed receiver.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<()>);

impl ShutdownTx {
    /// Signals shutdown to all subscribed receivers.
    pub fn shutdown(&self) {
        // send_replace marks the value as seen-changed even with no receivers
        // currently subscribed.
        self.0.send_replace(());
    }

    /// Creates a new receiver subscribed to this transmitter.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Receiver side of the shutdown channel.
pub type ShutdownRx = watch::Receiver<()>;

/// Creates a new shutdown channel.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx(tx), rx)
}
