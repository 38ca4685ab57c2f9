//! Repeating passes with a fixed pause.

use std::future::pending;
use std::time::Duration;

use tokio::sync::watch;

use crate::platform::PlatformClient;

use super::engine::SyncEngine;

/// Create a linked stop signal pair.
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Sending half of the stop signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Ask every [`Shutdown`] holder to stop. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving half of the stop signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // With the sender gone `wait` pends forever.
        drop(tx);
        Self { rx }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the stop signal fires.
    ///
    /// Pends forever if the trigger is dropped without firing.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|stopped| *stopped).await.is_err() {
            pending::<()>().await;
        }
    }
}

/// Runs sync passes until stopped.
pub struct Scheduler<C: PlatformClient + ?Sized + 'static> {
    engine: SyncEngine<C>,
    interval: Duration,
}

impl<C: PlatformClient + ?Sized + 'static> Scheduler<C> {
    pub fn new(engine: SyncEngine<C>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    pub fn engine(&self) -> &SyncEngine<C> {
        &self.engine
    }

    /// Run passes separated by `interval` until `shutdown` fires.
    ///
    /// A failed pass is logged and the loop carries on. The stop signal is
    /// checked between passes and during the pause; a running pass stops
    /// launching repositories but lets started ones finish. Returns the
    /// number of passes run.
    pub async fn run(&self, shutdown: Shutdown) -> usize {
        let mut passes = 0usize;

        while !shutdown.is_triggered() {
            match self.engine.run_pass(&shutdown).await {
                Ok(report) => {
                    tracing::debug!(pass_id = %report.pass_id, "Pass finished");
                }
                Err(e) => {
                    tracing::error!(error = %e, error_class = %e.class(), "Sync pass failed");
                }
            }
            passes += 1;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.wait() => {}
            }
        }

        tracing::info!(passes, "Scheduler stopped");
        passes
    }
}
