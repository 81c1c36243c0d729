//! # Filter Resolver
//!
//! Turns the raw state of the dashboard controls into the canonical
//! [`FilterPredicate`] applied to every poll.

use chrono::{Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::dashboard::model::Severity;

/// Selector value that switches the time range to explicit bounds.
pub const CUSTOM_RANGE: &str = "custom";

/// Preset used when nothing else is configured.
pub const DEFAULT_RANGE: &str = "1h";

/// Raw control state, as typed or selected by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterControls {
    /// A preset token (`15m`, `1h`, `24h`...) or `custom`.
    pub time_range: String,
    /// Local date-time input, `YYYY-MM-DDTHH:MM[:SS]`; only read for `custom`.
    pub range_from: String,
    /// Local date-time input, `YYYY-MM-DDTHH:MM[:SS]`; only read for `custom`.
    pub range_to: String,
    pub severity: String,
    pub event_type: String,
    pub source_ip: String,
}

impl Default for FilterControls {
    fn default() -> Self {
        Self {
            time_range: DEFAULT_RANGE.to_string(),
            range_from: String::new(),
            range_to: String::new(),
            severity: String::new(),
            event_type: String::new(),
            source_ip: String::new(),
        }
    }
}

/// The canonical time window and attribute filters of one poll.
///
/// With a preset, `until` is always empty and `since` carries the preset
/// token for the server to interpret. With a custom range both bounds are
/// epoch seconds, and an empty bound means unbounded on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPredicate {
    pub since: String,
    pub until: String,
    pub severity: Option<Severity>,
    pub event_type: String,
    pub source_ip: String,
}

impl FilterControls {
    /// True when the time selector asks for explicit bounds.
    pub fn is_custom(&self) -> bool {
        self.time_range.trim() == CUSTOM_RANGE
    }

    /// Resolves the controls against the local time zone.
    pub fn resolve(&self) -> FilterPredicate {
        self.resolve_in(&Local)
    }

    /// Resolves the controls, interpreting custom bounds in `tz`.
    pub fn resolve_in<Tz: TimeZone>(&self, tz: &Tz) -> FilterPredicate {
        let (since, until) = if self.is_custom() {
            (local_bound_to_epoch(tz, &self.range_from), local_bound_to_epoch(tz, &self.range_to))
        } else {
            (self.time_range.trim().to_string(), String::new())
        };

        let severity = match self.severity.trim() {
            "" => None,
            raw => match raw.parse::<Severity>() {
                Ok(level) => Some(level),
                Err(e) => {
                    log::warn!("Ignoring severity filter: {}", e);
                    None
                }
            },
        };

        FilterPredicate {
            since,
            until,
            severity,
            event_type: self.event_type.trim().to_string(),
            source_ip: self.source_ip.trim().to_string(),
        }
    }
}

/// Converts a `datetime-local` input to epoch seconds. Empty or unparsable
/// input yields an empty bound.
fn local_bound_to_epoch<Tz: TimeZone>(tz: &Tz, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"));

    match parsed {
        // DST gaps have no local mapping; ambiguous folds take the earlier instant.
        Ok(naive) => match tz.from_local_datetime(&naive).earliest() {
            Some(dt) => dt.timestamp().to_string(),
            None => {
                log::warn!("Local time '{}' does not exist in this zone; treating bound as open", raw);
                String::new()
            }
        },
        Err(e) => {
            log::warn!("Unparsable range bound '{}' ({}); treating bound as open", raw, e);
            String::new()
        }
    }
}
