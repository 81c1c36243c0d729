//! # Dashboard Controller
//!
//! The controller is a single task that owns the [`Dashboard`] and drains a
//! command queue one message at a time. Timers, the live channel and the
//! console all talk to it through a cloneable [`ControllerHandle`]; network
//! calls run in spawned tasks that report back through the same queue.
//!
//! Ordering is arrival order. Two overlapping polls both complete and the one
//! whose result arrives last is displayed; a delta racing a poll behaves the
//! same way. Nothing in flight is ever cancelled.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::alert_actions::AlertActionCoordinator;
use crate::dashboard::filters::FilterControls;
use crate::dashboard::model::{LiveDelta, Snapshot};
use crate::dashboard::query::QueryBuilder;
use crate::dashboard::render::Renderer;
use crate::dashboard::state::Dashboard;
use crate::dashboard::views::Connectivity;
use crate::error::DashboardError;
use crate::ingestors::snapshot_poll::SnapshotFetcher;
use crate::retrieve::api::DashboardApi;

/// A message for the controller task.
#[derive(Debug)]
pub enum Command {
    /// Start a full poll with the current filters.
    Resync,
    /// A poll completed.
    SnapshotReady(Box<Snapshot>),
    /// A poll failed. The displayed snapshot stays.
    FetchFailed(DashboardError),
    /// Partial update from the live channel.
    Delta(LiveDelta),
    /// Live channel lifecycle.
    Connectivity(Connectivity),
    /// Redraw the clock.
    ClockTick,
    /// Acknowledge an alert, then resync.
    Acknowledge(i64),
    /// Attach an analyst note to an alert, then resync.
    AddNote { alert_id: i64, note: String },
    /// Replace the filter controls used by the next poll.
    SetControls(FilterControls),
}

/// Cloneable sender side of the controller queue.
///
/// Every method returns `false` once the controller has gone away.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ControllerHandle {
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn resync(&self) -> bool {
        self.send(Command::Resync)
    }

    pub fn clock_tick(&self) -> bool {
        self.send(Command::ClockTick)
    }

    pub fn delta(&self, delta: LiveDelta) -> bool {
        self.send(Command::Delta(delta))
    }

    pub fn connectivity(&self, connectivity: Connectivity) -> bool {
        self.send(Command::Connectivity(connectivity))
    }

    pub fn acknowledge(&self, alert_id: i64) -> bool {
        self.send(Command::Acknowledge(alert_id))
    }

    pub fn add_note(&self, alert_id: i64, note: impl Into<String>) -> bool {
        self.send(Command::AddNote {
            alert_id,
            note: note.into(),
        })
    }

    pub fn set_controls(&self, controls: FilterControls) -> bool {
        self.send(Command::SetControls(controls))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// A handle with no controller behind it; the caller reads the queue.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// Owns the dashboard and serializes every write to it.
pub struct DashboardController<A: DashboardApi, R: Renderer> {
    dashboard: Dashboard<R>,
    fetcher: Arc<SnapshotFetcher<Arc<A>>>,
    actions: AlertActionCoordinator<Arc<A>>,
    handle: ControllerHandle,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl<A: DashboardApi, R: Renderer> DashboardController<A, R> {
    /// Builds a controller and the handle used to drive it.
    pub fn new(api: Arc<A>, query: QueryBuilder, controls: FilterControls, renderer: R) -> (Self, ControllerHandle) {
        let fetcher = SnapshotFetcher::new(Arc::clone(&api), query.clone());
        Self::with_fetcher(fetcher, query, controls, renderer)
    }

    /// Same as [`DashboardController::new`] with a preconfigured fetcher.
    pub fn with_fetcher(
        fetcher: SnapshotFetcher<Arc<A>>,
        query: QueryBuilder,
        controls: FilterControls,
        renderer: R,
    ) -> (Self, ControllerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ControllerHandle { tx };
        let actions = AlertActionCoordinator::new(Arc::clone(fetcher.api()), query, handle.clone());
        let controller = Self {
            dashboard: Dashboard::new(controls, renderer),
            fetcher: Arc::new(fetcher),
            actions,
            handle: handle.clone(),
            rx,
        };
        (controller, handle)
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    pub fn dashboard(&self) -> &Dashboard<R> {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut Dashboard<R> {
        &mut self.dashboard
    }

    /// Waits for and processes exactly one command.
    pub async fn step(&mut self) -> bool {
        match self.rx.recv().await {
            Some(command) => {
                self.apply(command);
                true
            }
            None => false,
        }
    }

    /// Processes every command already queued without waiting. Returns how many ran.
    pub fn drain(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(command) = self.rx.try_recv() {
            self.apply(command);
            processed += 1;
        }
        processed
    }

    /// Processes commands until `cancel` fires, then hands the dashboard back.
    pub async fn run(mut self, cancel: CancellationToken) -> Dashboard<R> {
        log::info!("Dashboard controller started.");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                command = self.rx.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
            }
        }
        log::info!("Dashboard controller stopped.");
        self.dashboard
    }

    /// Applies one command to the dashboard.
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Resync => self.spawn_fetch(),
            Command::SnapshotReady(snapshot) => self.dashboard.publish_snapshot(*snapshot),
            Command::FetchFailed(error) => self.dashboard.record_fetch_failure(&error),
            Command::Delta(delta) => self.dashboard.apply_delta(&delta),
            Command::Connectivity(connectivity) => self.dashboard.set_connectivity(connectivity),
            Command::ClockTick => self.dashboard.tick_clock(&Local::now()),
            Command::SetControls(controls) => self.dashboard.set_controls(controls),
            Command::Acknowledge(alert_id) => {
                let actions = self.actions.clone();
                tokio::spawn(async move {
                    // Failures are logged by the coordinator.
                    let _ = actions.acknowledge(alert_id).await;
                });
            }
            Command::AddNote { alert_id, note } => {
                let actions = self.actions.clone();
                tokio::spawn(async move {
                    let _ = actions.add_note(alert_id, &note).await;
                });
            }
        }
    }

    fn spawn_fetch(&self) {
        let predicate = self.dashboard.predicate();
        let fetcher = Arc::clone(&self.fetcher);
        let handle = self.handle.clone();
        log::debug!("Polling snapshot with {:?}", predicate);
        tokio::spawn(async move {
            let command = match fetcher.fetch_all(&predicate).await {
                Ok(snapshot) => Command::SnapshotReady(Box::new(snapshot)),
                Err(error) => Command::FetchFailed(error),
            };
            handle.send(command);
        });
    }
}
