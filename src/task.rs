//! Fault-isolated fixed-rate task scheduling.
//!
//! Every periodic worker in the framework (producer, sender, reconnect loop)
//! runs through [`spawn_periodic`], which guarantees that one failing or
//! panicking tick never terminates the schedule. Errors are logged and the
//! next tick runs on time.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error};

/// Handle to a running periodic worker.
///
/// Dropping the handle does not stop the worker; call [`stop`] (cooperative,
/// lets an in-flight tick finish) or [`abort`].
///
/// [`stop`]: PeriodicTask::stop
/// [`abort`]: PeriodicTask::abort
pub struct PeriodicTask {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Task name used in log output.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Signals the worker to take no further ticks. A worker sleeping until
    /// its next tick wakes and exits immediately; a tick already in progress
    /// is allowed to run to completion.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Stops the worker and waits for it to exit.
    pub async fn join(self) {
        self.stop();
        if let Err(err) = self.handle.await {
            if !err.is_cancelled() {
                error!(task = self.name, error = %err, "periodic task worker failed");
            }
        }
    }

    /// Aborts the worker immediately, interrupting any in-flight tick.
    pub fn abort(&self) {
        self.stop();
        self.handle.abort();
    }
}

/// Spawns a dedicated worker that runs `tick` at a fixed rate.
///
/// Each stream gets its own worker so one stream's slow tick cannot delay
/// another stream's schedule. A tick returning `Err` is logged and skipped; a
/// panicking tick is caught and logged the same way. Delayed ticks do not
/// burst to catch up.
pub fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> PeriodicTask
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.changed() => break,
            }
            if *shutdown_rx.borrow() {
                break;
            }

            match AssertUnwindSafe(tick()).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(task = name, error = %err, "periodic tick failed");
                }
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| (*s).to_owned())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".to_owned());
                    error!(task = name, panic = %message, "periodic tick panicked");
                }
            }
        }

        debug!(task = name, "periodic task stopped");
    });

    PeriodicTask {
        name,
        shutdown,
        handle,
    }
}
