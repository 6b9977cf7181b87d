//! # Pricewatch Tracker
//!
//! The tracker scheduling engine: one lightweight tokio worker per running
//! tracker, each independently timer-driven, plus the concurrency-safe
//! registry that enforces at most one live tracker per code.

pub mod registry;
pub mod tracker;

pub use registry::TrackerRegistry;
pub use tracker::{ExecutionError, Tracker, TrackerStatus};
