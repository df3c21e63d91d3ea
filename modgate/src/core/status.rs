//! Stage names and the stage state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The verification stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Required files and the declared input/output contract.
    Structure,
    /// Initialize and validate the module directory with the external tool.
    Syntax,
    /// Plan a generated wrapper and search the plan text for expected resources.
    Plan,
    /// Apply, read outputs and destroy against a live backend.
    Apply,
}

impl StageName {
    /// All stages in the order they run.
    pub const ORDER: [Self; 4] = [Self::Structure, Self::Syntax, Self::Plan, Self::Apply];

    /// Upper-case token used in skip flag names (`SKIP_<MODULE>_<STAGE>`).
    #[must_use]
    pub fn flag_token(self) -> &'static str {
        match self {
            Self::Structure => "STRUCTURE",
            Self::Syntax => "SYNTAX",
            Self::Plan => "PLAN",
            Self::Apply => "APPLY",
        }
    }

    /// Parses a stage from its flag token, ignoring case.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ORDER
            .into_iter()
            .find(|stage| stage.flag_token().eq_ignore_ascii_case(token))
    }

    /// Returns true for stages that plan against the backend.
    #[must_use]
    pub fn is_plan_class(self) -> bool {
        matches!(self, Self::Plan)
    }

    /// Returns true for stages that mutate the backend.
    #[must_use]
    pub fn is_apply_class(self) -> bool {
        matches!(self, Self::Apply)
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structure => write!(f, "structure"),
            Self::Syntax => write!(f, "syntax"),
            Self::Plan => write!(f, "plan"),
            Self::Apply => write!(f, "apply"),
        }
    }
}

/// The execution status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not started yet.
    #[default]
    Pending,
    /// The stage body is executing.
    Running,
    /// The stage completed without violations.
    Passed,
    /// The stage recorded at least one violation.
    Failed,
    /// The stage did not run.
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Skipped)
    }

    /// Returns true if the status counts against the run.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Returns true if moving to `next` is a legal transition.
    ///
    /// `Pending` may go to `Running` or straight to `Skipped`; `Running` ends
    /// in any terminal state. Terminal states never change.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Running | Self::Skipped),
            Self::Running => next.is_terminal(),
            Self::Passed | Self::Failed | Self::Skipped => false,
        }
    }
}
