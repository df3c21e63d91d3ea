//! Stage outcome type with factory methods.

use super::{StageName, StageStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why a stage did not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// A `SKIP_<MODULE>_<STAGE>` flag was set.
    ModuleFlag {
        /// The flag that forced the skip.
        flag: String,
    },
    /// The global plan skip flag was set.
    GlobalPlanFlag {
        /// The flag that forced the skip.
        flag: String,
    },
    /// A mutating stage lacked one of its two opt-in flags.
    MissingOptIn {
        /// The first flag found not affirmative.
        flag: String,
    },
    /// The module directory is absent, so there is nothing to validate.
    ModuleDirectoryMissing {
        /// The directory that was checked.
        path: PathBuf,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleFlag { flag } => write!(f, "{flag}=true"),
            Self::GlobalPlanFlag { flag } => write!(f, "{flag}=true"),
            Self::MissingOptIn { flag } => write!(f, "{flag} != true"),
            Self::ModuleDirectoryMissing { path } => {
                write!(f, "module directory not found: {}", path.display())
            }
        }
    }
}

/// The result of running, or not running, one stage for one module.
///
/// Violations accumulate; a stage with any violation or cleanup failure is
/// `Failed`. Notes are informational and never affect the status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    /// The stage this outcome belongs to.
    pub stage: StageName,

    /// Terminal status.
    pub status: StageStatus,

    /// Every violation the stage found.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,

    /// Skip reason (for skipped stages).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,

    /// Cleanup steps that failed. Live resources may be orphaned.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_failures: Vec<String>,

    /// Informational findings, such as undocumented declarations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,

    /// Wall time spent in the stage body.
    #[serde(default)]
    pub duration_ms: f64,
}

impl StageOutcome {
    /// Creates a passing outcome.
    #[must_use]
    pub fn passed(stage: StageName) -> Self {
        Self {
            stage,
            status: StageStatus::Passed,
            violations: Vec::new(),
            skip_reason: None,
            cleanup_failures: Vec::new(),
            notes: Vec::new(),
            duration_ms: 0.0,
        }
    }

    /// Creates a failing outcome with the given violations.
    #[must_use]
    pub fn failed(stage: StageName, violations: Vec<String>) -> Self {
        Self {
            status: StageStatus::Failed,
            violations,
            ..Self::passed(stage)
        }
    }

    /// Creates a skipped outcome.
    #[must_use]
    pub fn skipped(stage: StageName, reason: SkipReason) -> Self {
        Self {
            status: StageStatus::Skipped,
            skip_reason: Some(reason),
            ..Self::passed(stage)
        }
    }

    /// Passed when `violations` is empty, failed otherwise.
    #[must_use]
    pub fn from_violations(stage: StageName, violations: Vec<String>) -> Self {
        if violations.is_empty() {
            Self::passed(stage)
        } else {
            Self::failed(stage, violations)
        }
    }

    /// Adds informational notes.
    #[must_use]
    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes.extend(notes);
        self
    }

    /// Records a cleanup failure. The outcome becomes `Failed`.
    #[must_use]
    pub fn with_cleanup_failure(mut self, failure: impl Into<String>) -> Self {
        self.cleanup_failures.push(failure.into());
        self.status = StageStatus::Failed;
        self
    }

    /// Sets the measured duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Returns true if the stage passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status == StageStatus::Passed
    }

    /// Returns true if the stage failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status.is_failure()
    }

    /// Returns true if the stage was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status == StageStatus::Skipped
    }
}
