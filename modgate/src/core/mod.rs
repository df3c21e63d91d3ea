//! Core domain model types for modgate.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage names and the stage state machine
//! - Stage outcomes with skip reasons
//! - Module and run reports

mod outcome;
mod report;
mod status;

pub use outcome::{SkipReason, StageOutcome};
pub use report::{FatalRecord, ModuleReport, RunReport, RunSummary};
pub use status::{StageName, StageStatus};
