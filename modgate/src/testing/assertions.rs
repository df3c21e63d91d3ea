//! Assertions for stage outcomes and module reports.

use crate::core::{ModuleReport, SkipReason, StageOutcome, StageStatus};

/// Asserts that the stage passed.
pub fn assert_passed(outcome: &StageOutcome) {
    assert!(
        outcome.is_passed(),
        "Expected {} to pass, got {:?} with violations {:?} and cleanup failures {:?}",
        outcome.stage,
        outcome.status,
        outcome.violations,
        outcome.cleanup_failures
    );
}

/// Asserts that the stage failed with exactly `violations`, in order.
pub fn assert_failed_with(outcome: &StageOutcome, violations: &[&str]) {
    assert_eq!(
        outcome.status,
        StageStatus::Failed,
        "Expected {} to fail, got {:?}",
        outcome.stage,
        outcome.status
    );
    let actual: Vec<&str> = outcome.violations.iter().map(String::as_str).collect();
    assert_eq!(actual, violations, "Unexpected violations for {}", outcome.stage);
}

/// Asserts that the stage was skipped.
pub fn assert_skipped(outcome: &StageOutcome) {
    assert!(
        outcome.is_skipped(),
        "Expected {} to be skipped, got {:?}",
        outcome.stage,
        outcome.status
    );
}

/// Asserts that the stage was skipped because of `flag`.
pub fn assert_skipped_by_flag(outcome: &StageOutcome, flag: &str) {
    assert_skipped(outcome);
    let actual = match &outcome.skip_reason {
        Some(
            SkipReason::ModuleFlag { flag: found }
            | SkipReason::GlobalPlanFlag { flag: found }
            | SkipReason::MissingOptIn { flag: found },
        ) => Some(found.as_str()),
        _ => None,
    };
    assert_eq!(
        actual,
        Some(flag),
        "Expected {} to be skipped by {}, got {:?}",
        outcome.stage,
        flag,
        outcome.skip_reason
    );
}

/// Asserts that the module was aborted with an error of `kind`.
pub fn assert_fatal(report: &ModuleReport, kind: &str) {
    let fatal = report.fatal.as_ref();
    assert_eq!(
        fatal.map(|f| f.kind.as_str()),
        Some(kind),
        "Expected module '{}' to be fatal with {}, got {:?}",
        report.module,
        kind,
        report.fatal
    );
    assert!(
        report.stages.is_empty(),
        "Fatal module '{}' should carry no stage outcomes",
        report.module
    );
}
