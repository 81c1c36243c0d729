//! # Query Builder
//!
//! Turns a [`FilterPredicate`] into the query parameters sent with every
//! request. The auth token is always present; any other key whose value is
//! empty is left out, because the API reads `severity=` as "match empty"
//! rather than "no filter".

use crate::dashboard::filters::FilterPredicate;

/// Query parameter carrying the API token.
pub const TOKEN_PARAM: &str = "token";

/// Which part of the predicate a request honours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    /// Time window only: aggregates that describe the whole window.
    Unfiltered,
    /// Time window plus severity, event type and source address: the raw feed.
    Filtered,
}

/// An ordered set of non-empty query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet(Vec<(String, String)>);

impl ParameterSet {
    /// Sets `key` to `value`, skipping empty values and replacing an earlier
    /// value for the same key.
    pub fn set(&mut self, key: &str, value: impl AsRef<str>) {
        let value = value.as_ref();
        if value.is_empty() {
            return;
        }
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.0.push((key.to_string(), value.to_string())),
        }
    }

    /// Returns a copy with an extra parameter.
    pub fn with(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> Vec<&str> {
        self.0.iter().map(|(k, _)| k.as_str()).collect()
    }
}

/// Builds parameter sets for a fixed API token.
#[derive(Clone)]
pub struct QueryBuilder {
    token: String,
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder").field("token", &"*****").finish()
    }
}

impl QueryBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// Builds the parameters for `predicate` in the given scope. Without a
    /// predicate only the token is emitted.
    pub fn build(&self, scope: QueryScope, predicate: Option<&FilterPredicate>) -> ParameterSet {
        let mut params = ParameterSet::default();
        // The token is mandatory, even when it is empty.
        params.0.push((TOKEN_PARAM.to_string(), self.token.clone()));

        let Some(p) = predicate else {
            return params;
        };

        params.set("since", &p.since);
        params.set("until", &p.until);

        if scope == QueryScope::Filtered {
            if let Some(severity) = p.severity {
                params.set("severity", severity.as_str());
            }
            params.set("event_type", &p.event_type);
            params.set("source_ip", &p.source_ip);
        }

        params
    }

    /// Time window only.
    pub fn unfiltered(&self, predicate: &FilterPredicate) -> ParameterSet {
        self.build(QueryScope::Unfiltered, Some(predicate))
    }

    /// Time window plus attribute filters.
    pub fn filtered(&self, predicate: &FilterPredicate) -> ParameterSet {
        self.build(QueryScope::Filtered, Some(predicate))
    }

    /// Token only, for commands that take no filters.
    pub fn token_only(&self) -> ParameterSet {
        self.build(QueryScope::Unfiltered, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::model::Severity;

    fn full_predicate() -> FilterPredicate {
        FilterPredicate {
            since: "1700000000".to_string(),
            until: "1700003600".to_string(),
            severity: Some(Severity::High),
            event_type: "port_scan".to_string(),
            source_ip: "10.0.0.9".to_string(),
        }
    }

    #[test]
    fn test_empty_values_never_emitted() {
        let qb = QueryBuilder::new("secret");
        let p = FilterPredicate { event_type: "x".to_string(), ..Default::default() };
        let params = qb.filtered(&p);
        assert_eq!(params.keys(), vec!["token", "event_type"]);
        assert_eq!(params.get("event_type"), Some("x"));
        assert_eq!(params.get("token"), Some("secret"));
    }

    #[test]
    fn test_unfiltered_drops_attribute_filters() {
        let qb = QueryBuilder::new("secret");
        let params = qb.unfiltered(&full_predicate());
        assert_eq!(params.keys(), vec!["token", "since", "until"]);
    }

    #[test]
    fn test_filtered_carries_everything() {
        let qb = QueryBuilder::new("secret");
        let params = qb.filtered(&full_predicate());
        assert_eq!(params.keys(), vec!["token", "since", "until", "severity", "event_type", "source_ip"]);
        assert_eq!(params.get("severity"), Some("high"));
    }

    #[test]
    fn test_no_predicate_is_token_only() {
        let params = QueryBuilder::new("secret").build(QueryScope::Filtered, None);
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("token"), Some("secret"));
    }

    #[test]
    fn test_extra_params_follow_the_same_rule() {
        let params = QueryBuilder::new("t").token_only().with("limit", "80").with("page", "");
        assert_eq!(params.keys(), vec!["token", "limit"]);
    }

    #[test]
    fn test_debug_masks_token() {
        let shown = format!("{:?}", QueryBuilder::new("hunter2"));
        assert!(!shown.contains("hunter2"));
    }
}
