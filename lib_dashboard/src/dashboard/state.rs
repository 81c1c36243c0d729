//! # Dashboard State
//!
//! [`DashboardState`] is the explicit owned replacement for the page-global
//! variables of a browser dashboard: the current snapshot, the filter
//! controls and the header chrome. [`Dashboard`] pairs it with a
//! [`Renderer`] and is the only code that writes to it.
//!
//! Every write is a whole-field replacement. A successful poll swaps the
//! entire snapshot and redraws every widget; a live delta swaps only the
//! fields it carries and redraws only their widgets.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone};

use crate::dashboard::filters::{FilterControls, FilterPredicate};
use crate::dashboard::model::{LiveDelta, Snapshot};
use crate::dashboard::render::Renderer;
use crate::dashboard::views::{self, Connectivity, ViewModel, WidgetId};
use crate::error::DashboardError;
use crate::utils::timefmt::format_clock;

/// Everything the dashboard currently displays.
#[derive(Debug, Clone)]
pub struct DashboardState {
    snapshot: Option<Snapshot>,
    controls: FilterControls,
    connectivity: Connectivity,
    clock: String,
    consecutive_failures: u32,
    last_success: Option<DateTime<Local>>,
}

impl DashboardState {
    pub fn new(controls: FilterControls) -> Self {
        Self {
            snapshot: None,
            controls,
            connectivity: Connectivity::Offline,
            clock: String::new(),
            consecutive_failures: 0,
            last_success: None,
        }
    }

    /// The displayed snapshot, `None` until the first poll or delta lands.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn controls(&self) -> &FilterControls {
        &self.controls
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn clock(&self) -> &str {
        &self.clock
    }

    /// Polls that failed since the last successful one.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_success(&self) -> Option<DateTime<Local>> {
        self.last_success
    }
}

/// The single writer of [`DashboardState`].
pub struct Dashboard<R: Renderer> {
    state: DashboardState,
    renderer: R,
}

impl<R: Renderer> Dashboard<R> {
    pub fn new(controls: FilterControls, renderer: R) -> Self {
        Self {
            state: DashboardState::new(controls),
            renderer,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Predicate for the next poll, resolved from the current controls.
    pub fn predicate(&self) -> FilterPredicate {
        self.state.controls.resolve()
    }

    /// Replaces the filter controls. Takes effect on the next poll.
    pub fn set_controls(&mut self, controls: FilterControls) {
        log::info!("Filter controls updated: {:?}", controls);
        self.state.controls = controls;
    }

    /// Atomically replaces the snapshot and redraws every widget.
    pub fn publish_snapshot(&mut self, snapshot: Snapshot) {
        if self.state.consecutive_failures > 0 {
            log::info!("Snapshot fetch recovered after {} failed attempt(s)", self.state.consecutive_failures);
        }
        self.state.consecutive_failures = 0;
        self.state.last_success = Some(Local::now());
        self.state.snapshot = Some(snapshot);
        self.render_all();
    }

    /// Records a failed poll. The displayed snapshot is left as it was.
    pub fn record_fetch_failure(&mut self, error: &DashboardError) {
        self.state.consecutive_failures += 1;
        log::error!(
            "Snapshot fetch failed ({} in a row), keeping previous data: {}",
            self.state.consecutive_failures,
            error
        );
    }

    /// Merges a live delta and redraws the widgets it covers.
    pub fn apply_delta(&mut self, delta: &LiveDelta) {
        if delta.is_empty() {
            log::debug!("Ignoring live delta without displayable fields");
            return;
        }
        if let (Some(count), Some(alerts)) = (delta.count, delta.alerts_triggered) {
            log::debug!("Live batch: {} events, {} alerts triggered", count, alerts);
        }

        let next = match &self.state.snapshot {
            Some(current) => current.with_delta(delta),
            None => Snapshot::default().with_delta(delta),
        };
        self.state.snapshot = Some(next);

        let Some(snapshot) = self.state.snapshot.as_ref() else {
            return;
        };
        if delta.stats.is_some() {
            self.renderer.draw(WidgetId::Stats, &ViewModel::Stats(views::stats_view(&snapshot.stats)));
        }
        if delta.timeline.is_some() {
            self.renderer.draw(WidgetId::Timeline, &ViewModel::Timeline(views::timeline_view(&snapshot.timeline)));
        }
        if delta.severity.is_some() {
            self.renderer.draw(
                WidgetId::Severity,
                &ViewModel::Severity(views::severity_view(&snapshot.severity_counts)),
            );
        }
        if delta.recent.is_some() {
            self.renderer.draw(
                WidgetId::EventFeed,
                &ViewModel::EventFeed(views::event_feed_view(&snapshot.recent_events)),
            );
        }
    }

    /// Updates the push channel indicator.
    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        if self.state.connectivity != connectivity {
            log::info!("Live channel is now {}", connectivity.label());
        }
        self.state.connectivity = connectivity;
        self.renderer.draw(WidgetId::Connection, &ViewModel::Connection(connectivity));
    }

    /// Redraws the clock face for `now`.
    pub fn tick_clock<Tz>(&mut self, now: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        self.state.clock = format_clock(now);
        self.renderer.draw(WidgetId::Clock, &ViewModel::Clock(self.state.clock.clone()));
    }

    /// Redraws every snapshot-backed widget.
    pub fn render_all(&mut self) {
        let Some(s) = self.state.snapshot.as_ref() else {
            return;
        };
        let r = &mut self.renderer;
        r.draw(WidgetId::Stats, &ViewModel::Stats(views::stats_view(&s.stats)));
        r.draw(WidgetId::Timeline, &ViewModel::Timeline(views::timeline_view(&s.timeline)));
        r.draw(WidgetId::Severity, &ViewModel::Severity(views::severity_view(&s.severity_counts)));
        r.draw(WidgetId::EventFeed, &ViewModel::EventFeed(views::event_feed_view(&s.recent_events)));
        r.draw(WidgetId::EventTypes, &ViewModel::Ranking(views::event_type_ranking(&s.event_type_counts)));
        r.draw(WidgetId::TopSources, &ViewModel::Sources(views::sources_view(&s.top_sources)));
        r.draw(WidgetId::Alerts, &ViewModel::Alerts(views::alerts_view(&s.alerts)));
        r.draw(WidgetId::FailedLogins, &ViewModel::Logins(views::logins_view(&s.failed_logins)));
        r.draw(WidgetId::Protocols, &ViewModel::Ranking(views::protocol_view(&s.protocol_counts)));
        r.draw(WidgetId::Ports, &ViewModel::Ranking(views::port_ranking(&s.port_counts)));
        r.draw(WidgetId::Mitre, &ViewModel::Mitre(views::mitre_view(&s.mitre_hits)));
        r.draw(WidgetId::ThreatIntel, &ViewModel::Intel(views::intel_view(&s.intel_matches)));
        r.draw(WidgetId::GeoMap, &ViewModel::Geo(views::geo_view(&s.geo_points)));
    }
}
