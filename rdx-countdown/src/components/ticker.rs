//! The repeating task that drives scheduled recomputes.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

/// A handle to a running ticker task. Dropping it also stops the task.
pub(crate) struct TickerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl TickerHandle {
    /// Stops the task. The callback is never polled again after this returns.
    pub(crate) fn cancel(self) {
        self.shutdown_tx.send(()).ok();
        self.task.abort();
    }
}

/// Spawns a task on the current Tokio runtime that calls `on_tick` every
/// `period`, starting one period from now.
///
/// The loop ends when `on_tick` breaks or the handle is canceled or dropped.
pub(crate) fn spawn_ticker<F, Fut>(period: Duration, mut on_tick: F) -> TickerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ControlFlow<()>> + Send + 'static,
{
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let task = tokio::spawn(async move {
        trace!("Ticker started with a period of {:?}.", period);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    if on_tick().await.is_break() {
                        break;
                    }
                }
            }
        }
        trace!("Ticker stopped.");
    });

    TickerHandle { shutdown_tx, task }
}
