//! Per-module and per-run reports.

use super::{StageName, StageOutcome, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fatal error that aborted a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FatalRecord {
    /// The stage that raised the error.
    pub stage: StageName,
    /// Error category.
    pub kind: String,
    /// Rendered error message.
    pub message: String,
}

/// Everything recorded for one module.
///
/// A fatal error discards the stage outcomes gathered so far: the report then
/// carries only the fatal record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleReport {
    /// The module name.
    pub module: String,
    /// Stage outcomes in pipeline order.
    #[serde(default)]
    pub stages: Vec<StageOutcome>,
    /// Set when the module was aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<FatalRecord>,
}

impl ModuleReport {
    /// Creates a report from completed stage outcomes.
    #[must_use]
    pub fn completed(module: impl Into<String>, stages: Vec<StageOutcome>) -> Self {
        Self {
            module: module.into(),
            stages,
            fatal: None,
        }
    }

    /// Creates a report for an aborted module.
    #[must_use]
    pub fn fatal(module: impl Into<String>, fatal: FatalRecord) -> Self {
        Self {
            module: module.into(),
            stages: Vec::new(),
            fatal: Some(fatal),
        }
    }

    /// Returns the outcome for a stage, if it was recorded.
    #[must_use]
    pub fn stage(&self, stage: StageName) -> Option<&StageOutcome> {
        self.stages.iter().find(|o| o.stage == stage)
    }

    /// Returns true if the module was aborted.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    /// Returns true if no stage failed and the module was not aborted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.is_fatal() && !self.stages.iter().any(StageOutcome::is_failed)
    }
}

/// Aggregate counts over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Stages that passed.
    pub passed: usize,
    /// Stages that failed.
    pub failed: usize,
    /// Stages that were skipped.
    pub skipped: usize,
    /// Modules aborted by a fatal error.
    pub fatal: usize,
    /// Cleanup steps that failed.
    pub cleanup_failures: usize,
}

/// The result of running a suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Identifier of this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Reports in suite order.
    pub modules: Vec<ModuleReport>,
}

impl RunReport {
    /// Counts stage statuses and fatal modules.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for module in &self.modules {
            if module.is_fatal() {
                summary.fatal += 1;
            }
            for outcome in &module.stages {
                match outcome.status {
                    StageStatus::Passed => summary.passed += 1,
                    StageStatus::Failed => summary.failed += 1,
                    StageStatus::Skipped => summary.skipped += 1,
                    StageStatus::Pending | StageStatus::Running => {}
                }
                summary.cleanup_failures += outcome.cleanup_failures.len();
            }
        }
        summary
    }

    /// Returns true if every module succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.modules.iter().all(ModuleReport::is_success)
    }

    /// Returns the report for a module.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.module == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SkipReason;
    use pretty_assertions::assert_eq;

    fn sample_report() -> RunReport {
        let vlan = ModuleReport::completed(
            "vlan",
            vec![
                StageOutcome::passed(StageName::Structure),
                StageOutcome::failed(StageName::Syntax, vec!["validate failed".to_string()]),
                StageOutcome::skipped(
                    StageName::Plan,
                    SkipReason::GlobalPlanFlag {
                        flag: "SKIP_PLAN".to_string(),
                    },
                ),
                StageOutcome::passed(StageName::Apply).with_cleanup_failure("destroy failed"),
            ],
        );
        let dns = ModuleReport::fatal(
            "dns",
            FatalRecord {
                stage: StageName::Structure,
                kind: "module_not_found".to_string(),
                message: "Module directory does not exist: modules/dns".to_string(),
            },
        );
        RunReport {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            modules: vec![vlan, dns],
        }
    }

    #[test]
    fn test_summary_counts() {
        let report = sample_report();
        assert_eq!(
            report.summary(),
            RunSummary {
                passed: 1,
                failed: 2,
                skipped: 1,
                fatal: 1,
                cleanup_failures: 1,
            }
        );
        assert!(!report.is_success());
    }

    #[test]
    fn test_fatal_report_has_no_stages() {
        let report = sample_report();
        let dns = report.module("dns").unwrap();
        assert!(dns.is_fatal());
        assert!(dns.stages.is_empty());
        assert!(!dns.is_success());
    }

    #[test]
    fn test_stage_lookup() {
        let report = sample_report();
        let vlan = report.module("vlan").unwrap();
        assert!(vlan.stage(StageName::Plan).unwrap().is_skipped());
        assert!(vlan.stage(StageName::Structure).unwrap().is_passed());
    }

    #[test]
    fn test_skipped_only_module_is_success() {
        let module = ModuleReport::completed(
            "ntp",
            vec![StageOutcome::skipped(
                StageName::Apply,
                SkipReason::MissingOptIn {
                    flag: "USE_REAL_ROUTER".to_string(),
                },
            )],
        );
        assert!(module.is_success());
    }
}
