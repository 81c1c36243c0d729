//! # Configuration Modules
//!
//! Settings consumed by the library. Loading them from files, environment or
//! command line is left to the binaries.

/// Validated runtime settings for the dashboard engine.
pub mod settings;

pub use settings::{DashboardSettings, TOKEN_ENV};
