//! # Snapshot Polling Ingestor
//!
//! Fetches every aggregate the dashboard shows in one concurrent batch and
//! assembles them into a [`Snapshot`].
//!
//! ## Key Design Principles:
//! - **All-or-nothing**: the thirteen requests are joined through
//!   [`join_all_or_fail`]. The first transport failure, non-2xx status or
//!   undecodable body fails the batch, and no partial snapshot is produced.
//! - **No scheduling here**: the fetcher performs one poll per call. Timing
//!   lives in the scheduler and the controller decides what to do with the
//!   outcome.

use std::future::Future;

use futures_util::future::try_join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dashboard::filters::FilterPredicate;
use crate::dashboard::model::Snapshot;
use crate::dashboard::query::{ParameterSet, QueryBuilder, QueryScope};
use crate::error::{DashboardError, DashboardResult};
use crate::retrieve::api::DashboardApi;

/// Number of recent events requested when no other limit is configured.
pub const DEFAULT_EVENTS_LIMIT: u32 = 80;

/// The aggregate endpoints polled on every refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Stats,
    Events,
    Alerts,
    Severity,
    EventTypes,
    TopSources,
    Geo,
    Timeline,
    FailedLogins,
    Protocols,
    Ports,
    Mitre,
    ThreatIntel,
}

impl Endpoint {
    /// Every polled endpoint, in request order.
    pub const ALL: [Endpoint; 13] = [
        Endpoint::Stats,
        Endpoint::Events,
        Endpoint::Alerts,
        Endpoint::Severity,
        Endpoint::EventTypes,
        Endpoint::TopSources,
        Endpoint::Geo,
        Endpoint::Timeline,
        Endpoint::FailedLogins,
        Endpoint::Protocols,
        Endpoint::Ports,
        Endpoint::Mitre,
        Endpoint::ThreatIntel,
    ];

    /// Path relative to the API base.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Stats => "api/stats",
            Endpoint::Events => "api/events",
            Endpoint::Alerts => "api/alerts",
            Endpoint::Severity => "api/severity",
            Endpoint::EventTypes => "api/event-types",
            Endpoint::TopSources => "api/top-sources",
            Endpoint::Geo => "api/geo",
            Endpoint::Timeline => "api/timeline",
            Endpoint::FailedLogins => "api/failed-logins",
            Endpoint::Protocols => "api/protocols",
            Endpoint::Ports => "api/ports",
            Endpoint::Mitre => "api/mitre",
            Endpoint::ThreatIntel => "api/threat-intel",
        }
    }

    /// Only the event feed honours the severity, type and source filters.
    pub fn scope(&self) -> QueryScope {
        match self {
            Endpoint::Events => QueryScope::Filtered,
            _ => QueryScope::Unfiltered,
        }
    }
}

/// Awaits every future concurrently and fails as soon as one of them fails.
///
/// On success the outputs come back in input order. On failure the remaining
/// futures are dropped and only the first error is reported.
pub async fn join_all_or_fail<I, F, T>(futures: I) -> DashboardResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = DashboardResult<T>>,
{
    try_join_all(futures).await
}

/// Issues one full poll against a [`DashboardApi`].
#[derive(Debug, Clone)]
pub struct SnapshotFetcher<A> {
    api: A,
    query: QueryBuilder,
    events_limit: u32,
}

impl<A: DashboardApi> SnapshotFetcher<A> {
    pub fn new(api: A, query: QueryBuilder) -> Self {
        Self {
            api,
            query,
            events_limit: DEFAULT_EVENTS_LIMIT,
        }
    }

    pub fn with_events_limit(mut self, limit: u32) -> Self {
        self.events_limit = limit;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Query parameters sent to `endpoint` for `predicate`.
    pub fn params_for(&self, endpoint: Endpoint, predicate: &FilterPredicate) -> ParameterSet {
        let mut params = self.query.build(endpoint.scope(), Some(predicate));
        if endpoint == Endpoint::Events {
            params.set("limit", self.events_limit.to_string());
        }
        params
    }

    /// Fetches all thirteen aggregates for `predicate`.
    ///
    /// # Errors
    /// The first failing request's error, or `MalformedResponse` when a body
    /// does not decode into its aggregate.
    pub async fn fetch_all(&self, predicate: &FilterPredicate) -> DashboardResult<Snapshot> {
        let requests = Endpoint::ALL.iter().map(|&endpoint| {
            let params = self.params_for(endpoint, predicate);
            async move {
                let body = self.api.get_json(endpoint.path(), &params).await?;
                Ok::<_, DashboardError>((endpoint, body))
            }
        });

        let bodies = join_all_or_fail(requests).await?;

        let mut snapshot = Snapshot::default();
        for (endpoint, body) in bodies {
            assign(&mut snapshot, endpoint, body)?;
        }
        log::debug!(
            "Snapshot fetched: {} events, {} alerts, {} geo points",
            snapshot.recent_events.len(),
            snapshot.alerts.len(),
            snapshot.geo_points.len()
        );
        Ok(snapshot)
    }
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, body: Value) -> DashboardResult<T> {
    serde_json::from_value(body).map_err(|e| DashboardError::MalformedResponse {
        endpoint: endpoint.path().to_string(),
        source: e,
    })
}

fn assign(snapshot: &mut Snapshot, endpoint: Endpoint, body: Value) -> DashboardResult<()> {
    match endpoint {
        Endpoint::Stats => snapshot.stats = decode(endpoint, body)?,
        Endpoint::Events => snapshot.recent_events = decode(endpoint, body)?,
        Endpoint::Alerts => snapshot.alerts = decode(endpoint, body)?,
        Endpoint::Severity => snapshot.severity_counts = decode(endpoint, body)?,
        Endpoint::EventTypes => snapshot.event_type_counts = decode(endpoint, body)?,
        Endpoint::TopSources => snapshot.top_sources = decode(endpoint, body)?,
        Endpoint::Geo => snapshot.geo_points = decode(endpoint, body)?,
        Endpoint::Timeline => snapshot.timeline = decode(endpoint, body)?,
        Endpoint::FailedLogins => snapshot.failed_logins = decode(endpoint, body)?,
        Endpoint::Protocols => snapshot.protocol_counts = decode(endpoint, body)?,
        Endpoint::Ports => snapshot.port_counts = decode(endpoint, body)?,
        Endpoint::Mitre => snapshot.mitre_hits = decode(endpoint, body)?,
        Endpoint::ThreatIntel => snapshot.intel_matches = decode(endpoint, body)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::model::Severity;

    fn predicate() -> FilterPredicate {
        FilterPredicate {
            since: "1h".into(),
            until: String::new(),
            severity: Some(Severity::High),
            event_type: "brute_force".into(),
            source_ip: String::new(),
        }
    }

    struct NoApi;

    impl DashboardApi for NoApi {
        async fn get_json(&self, path: &str, _params: &ParameterSet) -> DashboardResult<Value> {
            Err(DashboardError::Transport {
                endpoint: path.to_string(),
                message: "offline".into(),
            })
        }

        async fn post(&self, path: &str, _params: &ParameterSet, _body: Option<Value>) -> DashboardResult<()> {
            Err(DashboardError::Transport {
                endpoint: path.to_string(),
                message: "offline".into(),
            })
        }
    }

    #[test]
    fn test_only_events_are_filtered() {
        let fetcher = SnapshotFetcher::new(NoApi, QueryBuilder::new("tok"));
        let events = fetcher.params_for(Endpoint::Events, &predicate());
        assert_eq!(events.keys(), vec!["token", "since", "severity", "event_type", "limit"]);
        assert_eq!(events.get("limit"), Some("80"));

        let geo = fetcher.params_for(Endpoint::Geo, &predicate());
        assert_eq!(geo.keys(), vec!["token", "since"]);
    }

    #[test]
    fn test_endpoint_paths_are_distinct() {
        let mut paths: Vec<&str> = Endpoint::ALL.iter().map(|e| e.path()).collect();
        paths.sort_unstable();
        paths.dedup();
        assert_eq!(paths.len(), 13);
    }

    #[tokio::test]
    async fn test_join_all_or_fail_keeps_order() {
        let futures = (1..=3).map(|n| async move { Ok::<_, DashboardError>(n * 10) });
        assert_eq!(join_all_or_fail(futures).await.unwrap(), vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn test_join_all_or_fail_reports_failure() {
        let futures = (1..=3).map(|n| async move {
            if n == 2 {
                Err(DashboardError::InvalidSettings("boom".into()))
            } else {
                Ok(n)
            }
        });
        assert!(matches!(
            join_all_or_fail(futures).await,
            Err(DashboardError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_bad_payload_names_endpoint() {
        let mut snap = Snapshot::default();
        let err = assign(&mut snap, Endpoint::Alerts, serde_json::json!({"not": "a list"})).unwrap_err();
        assert_eq!(err.endpoint(), Some("api/alerts"));
        assert!(matches!(err, DashboardError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_offline_api_fails_batch() {
        let fetcher = SnapshotFetcher::new(NoApi, QueryBuilder::new("tok"));
        assert!(fetcher.fetch_all(&predicate()).await.unwrap_err().is_transport());
    }
}
