//! Resolved runtime settings for the dashboard engine.
//!
//! Binaries assemble a [`DashboardSettings`] from whatever sources they like
//! (defaults, config file, environment, CLI) and hand it to the library. The
//! library only checks that the values make sense.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dashboard::filters::FilterControls;
use crate::error::{DashboardError, DashboardResult};
use crate::ingestors::snapshot_poll::DEFAULT_EVENTS_LIMIT;

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "SIEM_API_TOKEN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardSettings {
    /// REST API base, e.g. `http://127.0.0.1:5000`.
    pub base_url: String,
    /// Push channel base when it differs from `base_url`.
    pub socket_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_token: String,
    pub refresh_interval_ms: u64,
    pub clock_interval_ms: u64,
    pub events_limit: u32,
    pub request_timeout_ms: u64,
    pub http_retries: u32,
    pub reconnect_delay_ms: u64,
    /// Filters in effect before the operator changes anything.
    pub initial_filters: FilterControls,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            socket_url: None,
            api_token: String::new(),
            refresh_interval_ms: 8_000,
            clock_interval_ms: 1_000,
            events_limit: DEFAULT_EVENTS_LIMIT,
            request_timeout_ms: 10_000,
            http_retries: 0,
            reconnect_delay_ms: 5_000,
            initial_filters: FilterControls::default(),
        }
    }
}

impl DashboardSettings {
    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> DashboardResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(DashboardError::InvalidSettings("base URL is empty".into()));
        }
        url::Url::parse(&self.base_url)?;
        if let Some(socket) = &self.socket_url {
            url::Url::parse(socket)?;
        }

        let zero = [
            ("refresh interval", self.refresh_interval_ms),
            ("clock interval", self.clock_interval_ms),
            ("request timeout", self.request_timeout_ms),
            ("reconnect delay", self.reconnect_delay_ms),
        ]
        .into_iter()
        .find(|(_, v)| *v == 0);
        if let Some((name, _)) = zero {
            return Err(DashboardError::InvalidSettings(format!("{} must be greater than zero", name)));
        }
        if self.events_limit == 0 {
            return Err(DashboardError::InvalidSettings("events limit must be greater than zero".into()));
        }

        if self.api_token.is_empty() {
            log::warn!("No API token configured ({}); the server will likely reject requests.", TOKEN_ENV);
        }
        Ok(())
    }

    /// Base used for the push channel handshake.
    pub fn socket_base(&self) -> &str {
        self.socket_url.as_deref().unwrap_or(&self.base_url)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = DashboardSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.refresh_interval(), Duration::from_secs(8));
        assert_eq!(settings.events_limit, 80);
        assert_eq!(settings.socket_base(), "http://127.0.0.1:5000");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let settings = DashboardSettings { clock_interval_ms: 0, ..Default::default() };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("clock interval"));
    }

    #[test]
    fn test_empty_or_bad_base_rejected() {
        let empty = DashboardSettings { base_url: "  ".into(), ..Default::default() };
        assert!(empty.validate().is_err());
        let relative = DashboardSettings { base_url: "siem.local".into(), ..Default::default() };
        assert!(matches!(relative.validate(), Err(DashboardError::InvalidUrl(_))));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: DashboardSettings =
            serde_json::from_str(r#"{"baseUrl": "https://siem.example", "socketUrl": "wss://push.example"}"#).unwrap();
        assert_eq!(settings.base_url, "https://siem.example");
        assert_eq!(settings.socket_base(), "wss://push.example");
        assert_eq!(settings.clock_interval_ms, 1_000);
        assert_eq!(settings.initial_filters, FilterControls::default());
    }

    #[test]
    fn test_token_never_serialized() {
        let settings = DashboardSettings { api_token: "secret".into(), ..Default::default() };
        assert!(!serde_json::to_string(&settings).unwrap().contains("secret"));
    }
}
