//! # Data Ingestors Module
//!
//! The two ways data enters the dashboard: a full concurrent poll of the REST
//! aggregates, and the live push channel that streams partial deltas.
//!
//! ## Contained Modules:
//! - **`snapshot_poll`**: one all-or-nothing poll of the thirteen aggregate
//!   endpoints, producing a `Snapshot`.
//! - **`socketio_frame`**: pure Engine.IO/Socket.IO text frame codec and the
//!   handshake URL builder.
//! - **`live_socket`**: a reconnecting websocket client for the push channel.
//!   Compiled with the `ingestors` feature.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Concurrent all-or-nothing snapshot poll.
pub mod snapshot_poll;
/// Socket.IO frame codec.
pub mod socketio_frame;
/// Websocket client for live deltas.
#[cfg(feature = "ingestors")]
pub mod live_socket;

// --- Public API Re-exports ---
pub use snapshot_poll::{join_all_or_fail, Endpoint, SnapshotFetcher};
#[cfg(feature = "ingestors")]
pub use live_socket::{LiveSocketConfig, LiveSocketIngestor};
