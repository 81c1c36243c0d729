//! # View-Model Transformers
//!
//! Pure functions from snapshot fields to widget-ready structures. None of
//! them touches its input, and applying one twice to the same input yields the
//! same output. Every server-sourced string leaves this module as a
//! [`SafeText`].
//!
//! ## Policies encoded here:
//! - **Rankings** sort by descending count. Ties keep the order of the source
//!   mapping (Rust's `sort_by` is stable).
//! - **Geo markers** use fixed triage breakpoints: more than 3 high/critical
//!   events is the critical tier, any is the high tier. Radius is `count / 3`
//!   clamped to `[5, 25]`.
//! - **Alert badge** is recounted from the alert list on every render.

use serde::Serialize;

use crate::dashboard::model::{
    Alert, CountMap, FailedLogin, GeoPoint, IntelMatch, MitreHit, SecurityEvent, SeverityCounts, Stats,
    TimelineBucket, TopSource,
};
use crate::utils::sanitize::{sanitize, sanitize_opt, SafeText};
use crate::utils::timefmt::{format_epoch_time, group_thousands};

/// Entries kept by the event type and port rankings.
pub const TOP_N: usize = 10;

/// Shown in place of missing table cells.
pub const MISSING_CELL: &str = "—";

/// Shown when no MITRE technique has been observed yet.
pub const MITRE_PLACEHOLDER: &str = "Waiting for correlated events...";

/// Shown when no threat intel indicator matched yet.
pub const INTEL_PLACEHOLDER: &str = "No matches yet";

/// Smallest geo marker radius.
pub const MIN_MARKER_RADIUS: f64 = 5.0;
/// Largest geo marker radius.
pub const MAX_MARKER_RADIUS: f64 = 25.0;

/// Palette shared with the charts.
pub mod colors {
    pub const CRITICAL: &str = "#ef4444";
    pub const HIGH: &str = "#f97316";
    pub const MEDIUM: &str = "#eab308";
    pub const LOW: &str = "#22c55e";
    pub const ACCENT: &str = "#3b82f6";
}

// ---- stats ----

/// Formatted counters of the stats bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub total: String,
    pub critical: String,
    pub high: String,
    pub sources: String,
    pub alerts: String,
    pub logins: String,
    pub intel: String,
}

pub fn stats_view(stats: &Stats) -> StatsView {
    StatsView {
        total: group_thousands(stats.total_events),
        critical: group_thousands(stats.critical_events),
        high: group_thousands(stats.high_events),
        sources: group_thousands(stats.unique_sources),
        alerts: group_thousands(stats.unacked_alerts),
        logins: group_thousands(stats.failed_logins),
        intel: group_thousands(stats.threat_intel_matches),
    }
}

// ---- timeline ----

/// Four severity series over formatted bucket labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineView {
    pub labels: Vec<String>,
    pub critical: Vec<u64>,
    pub high: Vec<u64>,
    pub medium: Vec<u64>,
    pub low: Vec<u64>,
}

pub fn timeline_view(buckets: &[TimelineBucket]) -> TimelineView {
    TimelineView {
        labels: buckets.iter().map(|b| format_epoch_time(b.bucket)).collect(),
        critical: buckets.iter().map(|b| b.critical).collect(),
        high: buckets.iter().map(|b| b.high).collect(),
        medium: buckets.iter().map(|b| b.medium).collect(),
        low: buckets.iter().map(|b| b.low).collect(),
    }
}

// ---- severity ----

/// Doughnut slices in `[critical, high, medium, low]` order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeverityView {
    pub values: [u64; 4],
}

pub fn severity_view(counts: &SeverityCounts) -> SeverityView {
    SeverityView {
        values: [counts.critical, counts.high, counts.medium, counts.low],
    }
}

// ---- event feed ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedLine {
    /// Severity token, also used as the CSS class suffix.
    pub severity: SafeText,
    pub time: String,
    pub source_ip: SafeText,
    pub message: SafeText,
    /// Source matched threat intel.
    pub flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventFeedView {
    pub lines: Vec<FeedLine>,
}

pub fn event_feed_view(events: &[SecurityEvent]) -> EventFeedView {
    EventFeedView {
        lines: events
            .iter()
            .map(|ev| FeedLine {
                severity: sanitize_opt(ev.severity.as_ref()),
                time: format_epoch_time(ev.timestamp),
                source_ip: sanitize_opt(ev.source_ip.as_ref()),
                message: sanitize_opt(ev.message.as_ref()),
                flagged: ev.flagged,
            })
            .collect(),
    }
}

// ---- rankings ----

/// One bar of a ranking chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub label: SafeText,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingView {
    pub entries: Vec<RankedEntry>,
}

/// Sorts `(key, count)` pairs by descending count, ties in source order,
/// and keeps at most `limit` entries (`None` keeps all).
pub fn rank_counts(counts: &CountMap, limit: Option<usize>) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = counts.iter().map(|(k, v)| (k.to_string(), v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    if let Some(n) = limit {
        ranked.truncate(n);
    }
    ranked
}

/// Top event types, underscores shown as spaces.
pub fn event_type_ranking(counts: &CountMap) -> RankingView {
    RankingView {
        entries: rank_counts(counts, Some(TOP_N))
            .into_iter()
            .map(|(k, count)| RankedEntry { label: sanitize(k.as_str()).humanize(), count })
            .collect(),
    }
}

/// Top destination ports, labelled `:port`.
pub fn port_ranking(counts: &CountMap) -> RankingView {
    RankingView {
        entries: rank_counts(counts, Some(TOP_N))
            .into_iter()
            .map(|(k, count)| RankedEntry { label: sanitize(&format!(":{}", k)), count })
            .collect(),
    }
}

/// Protocol breakdown, in payload order.
pub fn protocol_view(counts: &CountMap) -> RankingView {
    RankingView {
        entries: counts
            .iter()
            .map(|(k, count)| RankedEntry { label: sanitize(k), count })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MitreCard {
    pub technique: SafeText,
    pub tactic: SafeText,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MitreView {
    pub cards: Vec<MitreCard>,
    /// Set when there are no cards to show.
    pub placeholder: Option<&'static str>,
}

/// All techniques, descending by count, ties in payload order.
pub fn mitre_view(hits: &[MitreHit]) -> MitreView {
    let mut sorted: Vec<&MitreHit> = hits.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    MitreView {
        cards: sorted
            .into_iter()
            .map(|m| MitreCard {
                technique: sanitize_opt(m.technique.as_ref()),
                tactic: sanitize_opt(m.tactic.as_ref()),
                count: m.count,
            })
            .collect(),
        placeholder: hits.is_empty().then_some(MITRE_PLACEHOLDER),
    }
}

// ---- geo ----

/// Visual triage tier of a map marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MarkerTier {
    Critical,
    High,
    Neutral,
}

impl MarkerTier {
    pub fn color(&self) -> &'static str {
        match self {
            MarkerTier::Critical => colors::CRITICAL,
            MarkerTier::High => colors::HIGH,
            MarkerTier::Neutral => colors::ACCENT,
        }
    }
}

/// Tier for a location with `threat_count` high/critical events.
pub fn marker_tier(threat_count: u64) -> MarkerTier {
    if threat_count > 3 {
        MarkerTier::Critical
    } else if threat_count > 0 {
        MarkerTier::High
    } else {
        MarkerTier::Neutral
    }
}

/// Radius for a location with `count` events.
pub fn marker_radius(count: u64) -> f64 {
    (count as f64 / 3.0).clamp(MIN_MARKER_RADIUS, MAX_MARKER_RADIUS)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoMarker {
    pub lat: f64,
    pub lng: f64,
    pub radius: f64,
    pub tier: MarkerTier,
    pub color: &'static str,
    pub popup: SafeText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoView {
    pub markers: Vec<GeoMarker>,
}

/// Markers for every located point. Points without coordinates, or sitting
/// exactly on a zero latitude or longitude, are not drawn.
pub fn geo_view(points: &[GeoPoint]) -> GeoView {
    GeoView {
        markers: points
            .iter()
            .filter_map(|g| {
                let (lat, lng) = (g.lat?, g.lng?);
                if lat == 0.0 || lng == 0.0 {
                    return None;
                }
                let tier = marker_tier(g.threat_count);
                let popup = SafeText::trusted(format!(
                    "<b>{}, {}</b><br>Events: {}<br>High/Crit: {}",
                    sanitize_opt(g.city.as_ref()),
                    sanitize_opt(g.country.as_ref()),
                    g.count,
                    g.threat_count
                ));
                Some(GeoMarker {
                    lat,
                    lng,
                    radius: marker_radius(g.count),
                    tier,
                    color: tier.color(),
                    popup,
                })
            })
            .collect(),
    }
}

// ---- tables ----

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    pub source_ip: SafeText,
    pub country: SafeText,
    pub city: SafeText,
    pub total: u64,
    pub high_sev: u64,
}

pub fn sources_view(rows: &[TopSource]) -> Vec<SourceRow> {
    rows.iter()
        .map(|s| SourceRow {
            source_ip: sanitize_opt(s.source_ip.as_ref()),
            country: sanitize_opt(s.country.as_ref()).or_placeholder(MISSING_CELL),
            city: sanitize_opt(s.city.as_ref()).or_placeholder(MISSING_CELL),
            total: s.total,
            high_sev: s.high_sev,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginRow {
    pub source_ip: SafeText,
    pub username: SafeText,
    pub attempts: u64,
    /// `city, country`.
    pub location: SafeText,
}

pub fn logins_view(rows: &[FailedLogin]) -> Vec<LoginRow> {
    rows.iter()
        .map(|l| LoginRow {
            source_ip: sanitize_opt(l.source_ip.as_ref()),
            username: sanitize_opt(l.username.as_ref()),
            attempts: l.attempts,
            location: SafeText::trusted(format!(
                "{}, {}",
                sanitize_opt(l.city.as_ref()),
                sanitize_opt(l.country.as_ref())
            )),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRow {
    pub id: i64,
    pub time: String,
    pub alert_type: SafeText,
    pub severity: SafeText,
    pub source_ip: SafeText,
    pub description: SafeText,
    pub technique: SafeText,
    pub event_count: u64,
    pub acknowledged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertsView {
    /// Unacknowledged alerts in `rows`.
    pub badge: usize,
    pub rows: Vec<AlertRow>,
}

/// Number of alerts still waiting for an analyst.
pub fn unacknowledged_count(alerts: &[Alert]) -> usize {
    alerts.iter().filter(|a| !a.acknowledged).count()
}

pub fn alerts_view(alerts: &[Alert]) -> AlertsView {
    AlertsView {
        badge: unacknowledged_count(alerts),
        rows: alerts
            .iter()
            .map(|a| AlertRow {
                id: a.id,
                time: format_epoch_time(a.timestamp),
                alert_type: sanitize_opt(a.alert_type.as_ref()).humanize(),
                severity: sanitize_opt(a.severity.as_ref()),
                source_ip: sanitize_opt(a.source_ip.as_ref()),
                description: sanitize_opt(a.description.as_ref()),
                technique: sanitize_opt(a.mitre_technique.as_ref()).or_placeholder(MISSING_CELL),
                event_count: a.event_count,
                acknowledged: a.acknowledged,
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntelRow {
    pub ip: SafeText,
    pub threat_type: SafeText,
    pub hit_count: u64,
    pub last_seen: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntelView {
    pub rows: Vec<IntelRow>,
    /// Set when there are no rows to show.
    pub placeholder: Option<&'static str>,
}

pub fn intel_view(matches: &[IntelMatch]) -> IntelView {
    IntelView {
        rows: matches
            .iter()
            .map(|i| IntelRow {
                ip: sanitize_opt(i.ip.as_ref()),
                threat_type: sanitize_opt(i.threat_type.as_ref()),
                hit_count: i.hit_count,
                last_seen: format_epoch_time(i.last_seen),
            })
            .collect(),
        placeholder: matches.is_empty().then_some(INTEL_PLACEHOLDER),
    }
}

// ---- chrome ----

/// State of the push channel, as shown in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Connectivity {
    Live,
    Offline,
}

impl Connectivity {
    pub fn label(&self) -> &'static str {
        match self {
            Connectivity::Live => "LIVE",
            Connectivity::Offline => "OFFLINE",
        }
    }
}

/// Identifies the widget a view-model is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WidgetId {
    Stats,
    Timeline,
    Severity,
    EventFeed,
    EventTypes,
    TopSources,
    Alerts,
    FailedLogins,
    Protocols,
    Ports,
    Mitre,
    ThreatIntel,
    GeoMap,
    Clock,
    Connection,
}

/// Any widget-ready structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ViewModel {
    Stats(StatsView),
    Timeline(TimelineView),
    Severity(SeverityView),
    EventFeed(EventFeedView),
    Ranking(RankingView),
    Sources(Vec<SourceRow>),
    Alerts(AlertsView),
    Logins(Vec<LoginRow>),
    Mitre(MitreView),
    Intel(IntelView),
    Geo(GeoView),
    Clock(String),
    Connection(Connectivity),
}
