//! # Data Retrieval Module
//!
//! This module owns every request/response interaction with the dashboard
//! REST API.
//!
//! ## Contained Modules:
//!
//! - **`api`**: The `DashboardApi` trait. Everything above this module talks
//!   to the server only through it, so tests can swap in an in-memory API.
//! - **`ky_http`**: A generic HTTP `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, with optional retries using exponential backoff.
//!   It is the production `DashboardApi`. Compiled with the `retrieve` feature.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Transport seam for the REST API.
pub mod api;

/// Generic HTTP API client with retry middleware.
#[cfg(feature = "retrieve")]
pub mod ky_http;

pub use api::DashboardApi;
