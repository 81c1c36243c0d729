//! # Dashboard Data Model
//!
//! Strongly typed representation of the aggregate payloads served by the
//! dashboard API, and of the push deltas emitted on the live channel.
//!
//! ## Key Features:
//! - **Lenient scalars**: counters accept integers, floats or `null` (SQL
//!   aggregates over empty groups), boolean flags accept `true/false` or `0/1`.
//! - **Ordered count maps**: `name -> count` objects keep their payload order,
//!   which is the tie-break order of every ranking widget.
//! - **Whole-field replacement**: a [`Snapshot`] is never mutated in place;
//!   deltas produce a derived copy through [`Snapshot::with_delta`].

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Event and alert severity levels, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Score 9-10.
    Critical,
    /// Score 7-8.
    High,
    /// Score 4-6.
    Medium,
    /// Score 1-3.
    Low,
}

impl Severity {
    /// All levels in display order.
    pub const ALL: [Severity; 4] = [Severity::Critical, Severity::High, Severity::Medium, Severity::Low];

    /// Wire token of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a severity token is not one of the four levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSeverity(pub String);

impl fmt::Display for UnknownSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown severity '{}'", self.0)
    }
}

impl std::error::Error for UnknownSeverity {}

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}

/// Headline counters of the stats bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    /// Events in the window.
    #[serde(deserialize_with = "de_count")]
    pub total_events: u64,
    /// Critical events in the window.
    #[serde(deserialize_with = "de_count")]
    pub critical_events: u64,
    /// High events in the window.
    #[serde(deserialize_with = "de_count")]
    pub high_events: u64,
    /// Distinct source addresses.
    #[serde(deserialize_with = "de_count")]
    pub unique_sources: u64,
    /// `auth_failure` events.
    #[serde(deserialize_with = "de_count")]
    pub failed_logins: u64,
    /// Events flagged by threat intel.
    #[serde(deserialize_with = "de_count")]
    pub threat_intel_matches: u64,
    /// Alerts raised in the window.
    #[serde(deserialize_with = "de_count")]
    pub total_alerts: u64,
    /// Alerts not yet acknowledged.
    #[serde(deserialize_with = "de_count")]
    pub unacked_alerts: u64,
}

/// One time bucket of the severity timeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineBucket {
    /// Bucket start, epoch seconds.
    pub bucket: f64,
    #[serde(deserialize_with = "de_count")]
    pub total: u64,
    #[serde(deserialize_with = "de_count")]
    pub critical: u64,
    #[serde(deserialize_with = "de_count")]
    pub high: u64,
    #[serde(deserialize_with = "de_count")]
    pub medium: u64,
    #[serde(deserialize_with = "de_count")]
    pub low: u64,
}

/// Event counts per severity level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityCounts {
    #[serde(deserialize_with = "de_count")]
    pub critical: u64,
    #[serde(deserialize_with = "de_count")]
    pub high: u64,
    #[serde(deserialize_with = "de_count")]
    pub medium: u64,
    #[serde(deserialize_with = "de_count")]
    pub low: u64,
}

/// A raw security event as listed by the event feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityEvent {
    pub id: Option<i64>,
    /// Epoch seconds.
    pub timestamp: f64,
    pub source_ip: Option<String>,
    pub dest_ip: Option<String>,
    pub dest_port: Option<i64>,
    pub protocol: Option<String>,
    pub event_type: Option<String>,
    pub severity: Option<String>,
    pub message: Option<String>,
    pub username: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    /// Source address matched a threat intel entry.
    #[serde(deserialize_with = "de_flag")]
    pub flagged: bool,
}

/// A correlated alert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Alert {
    pub id: i64,
    /// Epoch seconds.
    pub timestamp: f64,
    pub alert_type: Option<String>,
    pub severity: Option<String>,
    pub source_ip: Option<String>,
    pub description: Option<String>,
    pub mitre_tactic: Option<String>,
    pub mitre_technique: Option<String>,
    #[serde(deserialize_with = "de_count")]
    pub event_count: u64,
    #[serde(deserialize_with = "de_flag")]
    pub acknowledged: bool,
    pub analyst_notes: Option<String>,
}

/// A row of the top talkers table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopSource {
    pub source_ip: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    #[serde(deserialize_with = "de_count")]
    pub total: u64,
    /// Critical plus high events from this source.
    #[serde(deserialize_with = "de_count")]
    pub high_sev: u64,
}

/// An aggregated map location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoPoint {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(rename = "cnt", alias = "count", deserialize_with = "de_count")]
    pub count: u64,
    /// Critical plus high events at this location.
    #[serde(rename = "threats", alias = "threat_count", deserialize_with = "de_count")]
    pub threat_count: u64,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Failed authentication attempts grouped by source and username.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailedLogin {
    pub source_ip: Option<String>,
    pub username: Option<String>,
    #[serde(deserialize_with = "de_count")]
    pub attempts: u64,
    pub country: Option<String>,
    pub city: Option<String>,
}

/// Events per MITRE ATT&CK technique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MitreHit {
    #[serde(rename = "mitre_technique", alias = "technique")]
    pub technique: Option<String>,
    #[serde(rename = "mitre_tactic", alias = "tactic")]
    pub tactic: Option<String>,
    #[serde(rename = "cnt", alias = "count", deserialize_with = "de_count")]
    pub count: u64,
}

/// A threat intel indicator that matched observed traffic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelMatch {
    pub ip: Option<String>,
    pub threat_type: Option<String>,
    pub confidence: Option<i64>,
    pub first_seen: Option<f64>,
    /// Epoch seconds.
    pub last_seen: f64,
    #[serde(deserialize_with = "de_count")]
    pub hit_count: u64,
}

/// An ordered `name -> count` mapping.
///
/// Entries keep the order of the JSON object they were decoded from. A key
/// repeated in the payload keeps its first position and its last value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountMap(Vec<(String, u64)>);

impl CountMap {
    /// Builds a map from pairs, merging duplicate keys the same way decoding does.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        let mut map = CountMap::default();
        for (k, v) in pairs {
            map.insert(k.into(), v);
        }
        map
    }

    fn insert(&mut self, key: String, value: u64) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Entries in payload order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Count stored for `key`.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for CountMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CountMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountMapVisitor;

        impl<'de> Visitor<'de> for CountMapVisitor {
            type Value = CountMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping names to counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CountMap, A::Error> {
                let mut map = CountMap::default();
                while let Some(key) = access.next_key::<String>()? {
                    let Count(value) = access.next_value::<Count>()?;
                    map.insert(key, value);
                }
                Ok(map)
            }

            fn visit_unit<E: de::Error>(self) -> Result<CountMap, E> {
                Ok(CountMap::default())
            }
        }

        deserializer.deserialize_any(CountMapVisitor)
    }
}

/// A lenient counter: integer, integral float, numeric string or null.
struct Count(u64);

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountVisitor;

        impl<'de> Visitor<'de> for CountVisitor {
            type Value = Count;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative count or null")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Count, E> {
                Ok(Count(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Count, E> {
                u64::try_from(v).map(Count).map_err(|_| E::custom(format!("negative count {}", v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Count, E> {
                if v.is_finite() && v >= 0.0 {
                    Ok(Count(v.round() as u64))
                } else {
                    Err(E::custom(format!("invalid count {}", v)))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Count, E> {
                v.trim().parse::<u64>().map(Count).map_err(|_| E::custom(format!("invalid count '{}'", v)))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Count, E> {
                Ok(Count(0))
            }

            fn visit_none<E: de::Error>(self) -> Result<Count, E> {
                Ok(Count(0))
            }
        }

        deserializer.deserialize_any(CountVisitor)
    }
}

fn de_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Count::deserialize(deserializer).map(|c| c.0)
}

fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    struct FlagVisitor;

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a boolean, 0/1 or null")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<bool, E> {
            Ok(v != 0)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<bool, E> {
            Ok(v != 0.0)
        }

        fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }

        fn visit_none<E: de::Error>(self) -> Result<bool, E> {
            Ok(false)
        }
    }

    deserializer.deserialize_any(FlagVisitor)
}

/// The complete set of dashboard data produced by one successful poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub stats: Stats,
    pub timeline: Vec<TimelineBucket>,
    pub severity_counts: SeverityCounts,
    /// Newest first, as returned by the API.
    pub recent_events: Vec<SecurityEvent>,
    pub alerts: Vec<Alert>,
    pub event_type_counts: CountMap,
    pub top_sources: Vec<TopSource>,
    pub geo_points: Vec<GeoPoint>,
    pub failed_logins: Vec<FailedLogin>,
    pub protocol_counts: CountMap,
    pub port_counts: CountMap,
    pub mitre_hits: Vec<MitreHit>,
    pub intel_matches: Vec<IntelMatch>,
}

impl Snapshot {
    /// Returns a copy with every field carried by `delta` replaced.
    pub fn with_delta(&self, delta: &LiveDelta) -> Snapshot {
        let mut next = self.clone();
        if let Some(stats) = &delta.stats {
            next.stats = stats.clone();
        }
        if let Some(timeline) = &delta.timeline {
            next.timeline = timeline.clone();
        }
        if let Some(severity) = &delta.severity {
            next.severity_counts = severity.clone();
        }
        if let Some(recent) = &delta.recent {
            next.recent_events = recent.clone();
        }
        next
    }
}

/// A partial push update from the live channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveDelta {
    pub stats: Option<Stats>,
    pub timeline: Option<Vec<TimelineBucket>>,
    pub severity: Option<SeverityCounts>,
    pub recent: Option<Vec<SecurityEvent>>,
    /// Size of the ingested batch that produced this delta.
    pub count: Option<u64>,
    /// Alerts the batch raised server-side.
    pub alerts_triggered: Option<u64>,
}

impl LiveDelta {
    /// True when the delta carries no displayable field.
    pub fn is_empty(&self) -> bool {
        self.stats.is_none() && self.timeline.is_none() && self.severity.is_none() && self.recent.is_none()
    }
}
