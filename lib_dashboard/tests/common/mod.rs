//! Shared fixtures for the integration tests: an in-memory API and canned
//! payloads for every polled endpoint.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde_json::{json, Value};

use lib_dashboard::dashboard::query::ParameterSet;
use lib_dashboard::{DashboardApi, DashboardError, DashboardResult};

/// One recorded API call.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub params: ParameterSet,
    pub body: Option<Value>,
}

/// In-memory `DashboardApi` with per-path responses and failures.
#[derive(Default)]
pub struct FakeApi {
    responses: Mutex<HashMap<String, Value>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    /// An API answering every polled endpoint with [`payloads`].
    pub fn healthy() -> Self {
        let api = FakeApi::default();
        for (path, body) in payloads() {
            api.respond(path, body);
        }
        api
    }

    pub fn respond(&self, path: &str, body: Value) {
        self.responses.lock().unwrap().insert(path.to_string(), body);
    }

    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    pub fn recover(&self, path: &str) {
        self.failing.lock().unwrap().remove(path);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    pub fn gets(&self) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.method == "GET").count()
    }

    fn record(&self, method: &'static str, path: &str, params: &ParameterSet, body: Option<Value>) -> DashboardResult<()> {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            params: params.clone(),
            body,
        });
        if self.failing.lock().unwrap().contains(path) {
            return Err(DashboardError::Status {
                endpoint: path.to_string(),
                status: 500,
                body: "internal error".into(),
            });
        }
        Ok(())
    }
}

impl DashboardApi for FakeApi {
    async fn get_json(&self, path: &str, params: &ParameterSet) -> DashboardResult<Value> {
        self.record("GET", path, params, None)?;
        self.responses
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| DashboardError::Status {
                endpoint: path.to_string(),
                status: 404,
                body: String::new(),
            })
    }

    async fn post(&self, path: &str, params: &ParameterSet, body: Option<Value>) -> DashboardResult<()> {
        self.record("POST", path, params, body)
    }
}

/// Canned bodies shaped like the real API.
pub fn payloads() -> Vec<(&'static str, Value)> {
    vec![
        (
            "api/stats",
            json!({"total_events": 1520, "critical_events": 4, "high_events": 31, "unique_sources": 12,
                   "failed_logins": 88, "threat_intel_matches": 3, "total_alerts": 5, "unacked_alerts": 2}),
        ),
        (
            "api/events",
            json!([{"id": 2, "timestamp": 1700000100.0, "source_ip": "203.0.113.9", "event_type": "auth_failure",
                    "severity": "high", "message": "bad password", "flagged": 1},
                   {"id": 1, "timestamp": 1700000000.0, "source_ip": "10.0.0.4", "event_type": "port_scan",
                    "severity": "medium", "message": "scan", "flagged": 0}]),
        ),
        (
            "api/alerts",
            json!([{"id": 7, "timestamp": 1700000050.0, "alert_type": "brute_force", "severity": "critical",
                    "source_ip": "203.0.113.9", "mitre_technique": "T1110", "event_count": 40, "acknowledged": 0},
                   {"id": 6, "timestamp": 1699999000.0, "alert_type": "port_scan", "severity": "medium",
                    "source_ip": "10.0.0.4", "event_count": 12, "acknowledged": 1}]),
        ),
        ("api/severity", json!({"critical": 4, "high": 31, "medium": 600, "low": 885})),
        ("api/event-types", json!({"auth_failure": 88, "port_scan": 40, "dns_query": 40})),
        (
            "api/top-sources",
            json!([{"source_ip": "203.0.113.9", "country": "NL", "city": null, "total": 90, "high_sev": 30}]),
        ),
        (
            "api/geo",
            json!([{"lat": 52.37, "lng": 4.89, "cnt": 90, "threats": 30, "city": "Amsterdam", "country": "NL"},
                   {"lat": 0, "lng": 0, "cnt": 5, "threats": 0}]),
        ),
        (
            "api/timeline",
            json!([{"bucket": 1700000000, "total": 10, "critical": 1, "high": 2, "medium": 3, "low": 4}]),
        ),
        (
            "api/failed-logins",
            json!([{"source_ip": "203.0.113.9", "username": "root", "attempts": 40}]),
        ),
        ("api/protocols", json!({"TCP": 1000, "UDP": 520})),
        ("api/ports", json!({"22": 300, "443": 120})),
        ("api/mitre", json!([{"mitre_technique": "T1110", "mitre_tactic": "Credential Access", "cnt": 40}])),
        (
            "api/threat-intel",
            json!([{"ip": "203.0.113.9", "threat_type": "botnet", "confidence": 90, "last_seen": 1700000100.0, "hit_count": 3}]),
        ),
    ]
}
