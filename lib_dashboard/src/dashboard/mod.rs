//! # Dashboard Module
//!
//! Transport-agnostic heart of the engine: the data model, the filter and
//! query pipeline, the view-model transformers, and the owned dashboard state
//! that ties them to a renderer.
//!
//! ## Contained Modules:
//!
//! - **`model`**: snapshot, live delta and the aggregate payload types.
//! - **`filters`**: control state to canonical filter predicate.
//! - **`query`**: predicate to query parameters, always carrying the token.
//! - **`views`**: pure per-widget transformers (rankings, markers, tables).
//! - **`render`**: the `Renderer` capability and a recording implementation.
//! - **`state`**: `DashboardState` and its single writer, `Dashboard`.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Snapshot, live delta and payload types.
pub mod model;
/// Filter resolver.
pub mod filters;
/// Query builder.
pub mod query;
/// View-model transformers.
pub mod views;
/// Renderer capability.
pub mod render;
/// Owned dashboard state.
pub mod state;

// --- Public API Re-exports ---
pub use filters::{FilterControls, FilterPredicate};
pub use model::{LiveDelta, Severity, Snapshot};
pub use query::{ParameterSet, QueryBuilder, QueryScope};
pub use render::{RecordingRenderer, Renderer};
pub use state::{Dashboard, DashboardState};
pub use views::{Connectivity, ViewModel, WidgetId};
