// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use cellar_tier::CacheTier;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::HybridCache;

/// Shortest period the sweeper accepts.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running background sweep.
///
/// Dropping the handle stops the sweep without waiting; [`shutdown`](Self::shutdown)
/// also waits for the task to finish.
#[derive(Debug)]
pub struct SweepHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    pub(crate) fn spawn<D: CacheTier + 'static>(cache: HybridCache<D>, interval: Duration) -> Self {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let (stop, mut stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + interval, interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(cache.sweep_interval_ms = interval.as_millis(), "cache.sweeper.started");
            loop {
                tokio::select! {
                    // Fires on an explicit stop and when the handle is dropped.
                    _ = &mut stopped => break,
                    _ = ticks.tick() => {
                        cache.sweep().await;
                    }
                }
            }
            tracing::debug!("cache.sweeper.stopped");
        });

        Self { stop, task }
    }

    /// Returns `true` once the sweep task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the sweep and waits for an in-progress pass to complete.
    pub async fn shutdown(self) {
        let Self { stop, task } = self;
        // An error means the task already exited.
        let _ = stop.send(());
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "cache.sweeper.join_failed");
        }
    }
}
