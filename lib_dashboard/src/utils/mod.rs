//! # Utilities Module
//!
//! Small, dependency-light helpers shared by the view-model transformers and
//! the controller.
//!
//! ## Contained Modules:
//!
//! - **`sanitize`**: the single HTML-escaping choke point for server-sourced
//!   text, and the `SafeText` newtype that proves a string went through it.
//! - **`timefmt`**: epoch-seconds and wall-clock formatting for labels, rows
//!   and the clock widget, plus thousands grouping for counters.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// HTML escaping of untrusted strings.
pub mod sanitize;
/// Time and number formatting helpers.
pub mod timefmt;

pub use sanitize::{sanitize, sanitize_opt, SafeText};
pub use timefmt::{format_clock, format_epoch_time, group_thousands};
