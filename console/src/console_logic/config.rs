use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use lib_dashboard::configs::TOKEN_ENV;
use lib_dashboard::{DashboardSettings, FilterControls};

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Terminal client for the SIEM security dashboard", version)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "SIEM_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "SIEM_BASE_URL", help = "Base URL of the dashboard REST API.")]
    pub base_url: Option<String>,

    #[clap(long, env = "SIEM_SOCKET_URL", help = "Base URL of the live channel when it differs from the API.")]
    pub socket_url: Option<String>,

    #[clap(long, env = TOKEN_ENV, hide_env_values = true, help = "API token sent with every request.")]
    pub api_token: Option<String>,

    #[clap(long, env = "SIEM_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "SIEM_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "SIEM_REFRESH_INTERVAL_MS", help = "Milliseconds between full snapshot polls.")]
    pub refresh_interval_ms: Option<u64>,

    #[clap(long, env = "SIEM_CLOCK_INTERVAL_MS", help = "Milliseconds between clock redraws.")]
    pub clock_interval_ms: Option<u64>,

    #[clap(long, env = "SIEM_EVENTS_LIMIT", help = "Number of recent events requested per poll.")]
    pub events_limit: Option<u32>,

    #[clap(long, env = "SIEM_REQUEST_TIMEOUT_MS", help = "Per-request HTTP timeout in milliseconds.")]
    pub request_timeout_ms: Option<u64>,

    #[clap(long, env = "SIEM_HTTP_RETRIES", help = "Retries for transient HTTP failures.")]
    pub http_retries: Option<u32>,

    #[clap(long, env = "SIEM_RECONNECT_DELAY_MS", help = "Delay in milliseconds before reconnecting the live channel.")]
    pub reconnect_delay_ms: Option<u64>,

    #[clap(long, env = "SIEM_LIVE", help = "Subscribe to the live channel (true/false).")]
    pub live: Option<bool>,

    #[clap(long, env = "SIEM_TIME_RANGE", help = "Initial time range preset, e.g. 15m, 1h, 24h.")]
    pub time_range: Option<String>,

    #[clap(long, env = "SIEM_SEVERITY", help = "Initial severity filter.")]
    pub severity: Option<String>,

    #[clap(long, env = "SIEM_EVENT_TYPE", help = "Initial event type filter.")]
    pub event_type: Option<String>,

    #[clap(long, env = "SIEM_SOURCE_IP", help = "Initial source address filter.")]
    pub source_ip: Option<String>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            config_path: other.config_path.or(self.config_path),
            base_url: other.base_url.or(self.base_url),
            socket_url: other.socket_url.or(self.socket_url),
            api_token: other.api_token.or(self.api_token),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            refresh_interval_ms: other.refresh_interval_ms.or(self.refresh_interval_ms),
            clock_interval_ms: other.clock_interval_ms.or(self.clock_interval_ms),
            events_limit: other.events_limit.or(self.events_limit),
            request_timeout_ms: other.request_timeout_ms.or(self.request_timeout_ms),
            http_retries: other.http_retries.or(self.http_retries),
            reconnect_delay_ms: other.reconnect_delay_ms.or(self.reconnect_delay_ms),
            live: other.live.or(self.live),
            time_range: other.time_range.or(self.time_range),
            severity: other.severity.or(self.severity),
            event_type: other.event_type.or(self.event_type),
            source_ip: other.source_ip.or(self.source_ip),
        }
    }

    fn defaults() -> Config {
        let settings = DashboardSettings::default();
        Config {
            base_url: Some(settings.base_url),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            refresh_interval_ms: Some(settings.refresh_interval_ms),
            clock_interval_ms: Some(settings.clock_interval_ms),
            events_limit: Some(settings.events_limit),
            request_timeout_ms: Some(settings.request_timeout_ms),
            http_retries: Some(settings.http_retries),
            reconnect_delay_ms: Some(settings.reconnect_delay_ms),
            live: Some(true),
            time_range: Some(settings.initial_filters.time_range),
            ..Default::default()
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn live_enabled(&self) -> bool {
        self.live.unwrap_or(true)
    }

    /// Library settings for the merged configuration.
    pub fn to_settings(&self) -> DashboardSettings {
        let d = DashboardSettings::default();
        DashboardSettings {
            base_url: self.base_url.clone().unwrap_or(d.base_url),
            socket_url: self.socket_url.clone().filter(|s| !s.trim().is_empty()),
            api_token: self.api_token.clone().unwrap_or_default(),
            refresh_interval_ms: self.refresh_interval_ms.unwrap_or(d.refresh_interval_ms),
            clock_interval_ms: self.clock_interval_ms.unwrap_or(d.clock_interval_ms),
            events_limit: self.events_limit.unwrap_or(d.events_limit),
            request_timeout_ms: self.request_timeout_ms.unwrap_or(d.request_timeout_ms),
            http_retries: self.http_retries.unwrap_or(d.http_retries),
            reconnect_delay_ms: self.reconnect_delay_ms.unwrap_or(d.reconnect_delay_ms),
            initial_filters: FilterControls {
                time_range: self.time_range.clone().unwrap_or(d.initial_filters.time_range),
                severity: self.severity.clone().unwrap_or_default(),
                event_type: self.event_type.clone().unwrap_or_default(),
                source_ip: self.source_ip.clone().unwrap_or_default(),
                ..d.initial_filters
            },
        }
    }
}

/// Layers the config file (if any) and `cli` over the defaults.
fn resolve(cli: Config) -> Config {
    // 1. Load defaults
    let mut current_config = Config::defaults();

    // 2. Load from config file (siem_console.conf) if present.
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("siem_console.conf"));

    if let Some(file_config) = read_config_file(&config_file_path) {
        current_config = current_config.merge(file_config);
    }

    // 3. Override with environment variables and CLI arguments
    current_config.merge(cli)
}

fn read_config_file(path: &Path) -> Option<Config> {
    if !path.exists() {
        log::info!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display());
        return None;
    }
    match fs::read_to_string(path) {
        Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
            Ok(file_config) => Some(file_config),
            Err(e) => {
                log::warn!("Failed to parse config file {}: {}. Falling back to other sources.", path.display(), e);
                None
            }
        },
        Err(e) => {
            log::warn!("Failed to read config file {}: {}. Falling back to other sources.", path.display(), e);
            None
        }
    }
}

pub fn load_config() -> Config {
    // clap::Parser handles both env vars and CLI args.
    resolve(Config::parse())
}
