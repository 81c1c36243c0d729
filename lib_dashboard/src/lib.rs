//! # lib_dashboard
//!
//! View-state synchronization engine for the SIEM monitoring dashboard. It
//! keeps a local picture of the security posture in step with a remote API by
//! combining periodic full snapshots with live partial deltas, and turns that
//! picture into per-widget view-models for a renderer.
//!
//! Transport modules are feature gated: `retrieve` brings the HTTP client and
//! `ingestors` the websocket push channel. Both are on by default.

// Declare the modules to re-export
pub mod configs;
pub mod core;
pub mod dashboard;
pub mod error;
pub mod ingestors;
pub mod retrieve;
pub mod utils;

// Re-export everything callers normally need
pub use configs::DashboardSettings;
pub use crate::core::{Command, ControllerHandle, DashboardController, Scheduler};
pub use dashboard::{Connectivity, FilterControls, Renderer, Snapshot, ViewModel, WidgetId};
pub use error::{DashboardError, DashboardResult};
pub use retrieve::DashboardApi;

#[cfg(feature = "retrieve")]
pub use retrieve::ky_http::{ApiClient, ClientOptions};
#[cfg(feature = "ingestors")]
pub use ingestors::live_socket::{LiveSocketConfig, LiveSocketIngestor};
