//! # Core Engine Module
//!
//! Orchestration of the dashboard: who owns the state, what runs when, and
//! how mutating alert actions feed back into a resync.
//!
//! ## Core Components:
//!
//! - **`controller`**: the single task that owns `DashboardState` and applies
//!   commands from a queue in arrival order.
//! - **`alert_actions`**: acknowledge and annotate alerts, then request one resync.
//! - **`scheduler`**: periodic resync, clock ticks and the live channel, each
//!   independently cancellable.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Command-queue controller owning the dashboard state.
pub mod controller;
/// Acknowledge/annotate alerts followed by a resync.
pub mod alert_actions;
/// Interval-driven activities under a cancellation token.
pub mod scheduler;

pub use alert_actions::AlertActionCoordinator;
pub use controller::{Command, ControllerHandle, DashboardController};
pub use scheduler::{ScheduledTasks, Scheduler};
