//! # Scheduler
//!
//! Drives the dashboard's three independent activities: the periodic resync,
//! the clock and the live channel. Each runs in its own task and none waits
//! on another. All of them stop when the shared `CancellationToken` fires.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::core::controller::ControllerHandle;

/// Default period between full polls.
pub const DEFAULT_REFRESH: Duration = Duration::from_secs(8);
/// Default clock redraw period.
pub const DEFAULT_CLOCK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Scheduler {
    refresh_every: Duration,
    clock_every: Duration,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH, DEFAULT_CLOCK)
    }
}

impl Scheduler {
    pub fn new(refresh_every: Duration, clock_every: Duration) -> Self {
        Self {
            refresh_every,
            clock_every,
        }
    }

    /// Spawns the poll and clock loops, plus `live` when given.
    ///
    /// The first poll and the first clock tick fire immediately.
    pub fn start<F>(&self, controller: ControllerHandle, cancel: CancellationToken, live: Option<F>) -> ScheduledTasks
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = Vec::with_capacity(3);

        tasks.push(tokio::spawn(every(
            self.refresh_every,
            cancel.clone(),
            controller.clone(),
            "resync",
            ControllerHandle::resync,
        )));
        tasks.push(tokio::spawn(every(
            self.clock_every,
            cancel.clone(),
            controller,
            "clock",
            ControllerHandle::clock_tick,
        )));

        if let Some(live) = live {
            let token = cancel.clone();
            tasks.push(tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = live => log::warn!("Live channel task ended on its own."),
                }
            }));
        }

        ScheduledTasks { cancel, tasks }
    }

    /// Poll and clock loops only.
    pub fn start_timers(&self, controller: ControllerHandle, cancel: CancellationToken) -> ScheduledTasks {
        self.start(controller, cancel, None::<std::future::Ready<()>>)
    }
}

/// Fires `tick` on `controller` every `period` until cancelled or the
/// controller goes away.
async fn every(
    period: Duration,
    cancel: CancellationToken,
    controller: ControllerHandle,
    name: &'static str,
    tick: fn(&ControllerHandle) -> bool,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    log::debug!("{} loop running every {:?}", name, period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                log::debug!("{} loop cancelled", name);
                return;
            }
            _ = interval.tick() => {
                if !tick(&controller) {
                    log::debug!("{} loop stopping: controller closed", name);
                    return;
                }
            }
        }
    }
}

/// Running scheduler tasks.
pub struct ScheduledTasks {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ScheduledTasks {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancels every activity and waits for the tasks to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                log::error!("Scheduler task ended abnormally: {}", e);
            }
        }
    }
}
