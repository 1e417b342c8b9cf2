//! Cooperative stop signal shared by the orchestrator and its workers.
//!
//! Built on a [`tokio::sync::watch`] channel carrying `true` once the run
//! deadline passes. Workers poll it between writes and never mid-write.

use tokio::sync::watch;

/// Raising side of the stop signal.
#[derive(Debug)]
pub struct StopHandle(watch::Sender<bool>);

/// Observing side of the stop signal.
#[derive(Debug, Clone)]
pub struct StopSignal(watch::Receiver<bool>);

/// Create a linked handle and signal, initially lowered.
#[must_use]
pub fn channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle(tx), StopSignal(rx))
}

impl StopHandle {
    /// Raise the signal for every subscriber.
    pub fn raise(&self) { self.0.send_replace(true); }

    /// A new observer of this handle.
    #[must_use]
    pub fn subscribe(&self) -> StopSignal { StopSignal(self.0.subscribe()) }
}

impl StopSignal {
    /// A signal that is never raised.
    #[must_use]
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        Self(rx)
    }

    /// Whether the signal has been raised.
    #[must_use]
    pub fn is_raised(&self) -> bool { *self.0.borrow() }

    /// Resolve once the signal is raised. Pends forever if the handle is
    /// dropped while lowered.
    pub async fn raised(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
