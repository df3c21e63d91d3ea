//! Pipeline execution.
//!
//! This module provides:
//! - The orchestrator that walks every module through the stages
//! - Per-stage state tracking and lifecycle events
//! - Bounded, ordered fan-out across modules

mod orchestrator;

pub use orchestrator::Orchestrator;
