//! Execution gate.
//!
//! Decides from layered flags whether a stage runs for a module. Resolution
//! order, first match wins:
//!
//! 1. `SKIP_<MODULE>_<STAGE>` skips that stage for that module.
//! 2. Plan-class stages are skipped by the global plan skip flag.
//! 3. Apply-class stages need both the real-backend flag and the mutation
//!    opt-in flag. A missing flag skips; it is never an error.
//! 4. Otherwise the stage runs.

use crate::core::{SkipReason, StageName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Global flag that skips every plan stage.
pub const SKIP_PLAN_FLAG: &str = "SKIP_PLAN";

/// Flag selecting the real backend instead of mock credentials.
pub const REAL_BACKEND_FLAG: &str = "USE_REAL_ROUTER";

/// Flag enabling mutating operations.
pub const MUTATION_FLAG: &str = "ENABLE_APPLY";

/// Name of the per-module, per-stage skip flag.
#[must_use]
pub fn skip_flag_name(module: &str, stage: StageName) -> String {
    format!("SKIP_{}_{}", module.to_uppercase(), stage.flag_token())
}

/// The rule that produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateReason {
    /// No skip rule applied; the stage runs.
    Proceed,
    /// A module/stage skip flag was set.
    SkippedByModuleFlag,
    /// A global skip flag was set.
    SkippedByGlobalFlag,
    /// A mutating stage lacked an opt-in flag.
    SkippedByMissingOptIn,
}

/// Whether a stage runs, and why. Computed once per stage per module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDecision {
    /// True if the stage body should run.
    pub run: bool,
    /// The rule that decided.
    pub reason: GateReason,
    /// The flag behind a skip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

impl ExecutionDecision {
    fn proceed() -> Self {
        Self {
            run: true,
            reason: GateReason::Proceed,
            flag: None,
        }
    }

    fn skip(reason: GateReason, flag: impl Into<String>) -> Self {
        Self {
            run: false,
            reason,
            flag: Some(flag.into()),
        }
    }

    /// The skip reason to record, or `None` when the stage runs.
    #[must_use]
    pub fn skip_reason(&self) -> Option<SkipReason> {
        let flag = self.flag.clone().unwrap_or_default();
        match self.reason {
            GateReason::Proceed => None,
            GateReason::SkippedByModuleFlag => Some(SkipReason::ModuleFlag { flag }),
            GateReason::SkippedByGlobalFlag => Some(SkipReason::GlobalPlanFlag { flag }),
            GateReason::SkippedByMissingOptIn => Some(SkipReason::MissingOptIn { flag }),
        }
    }
}

/// The flags the gate consults. Read once before orchestration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateFlags {
    /// Affirmative `SKIP_<MODULE>_<STAGE>` flag names.
    #[serde(default)]
    pub skip_flags: BTreeSet<String>,
    /// Skip every plan stage.
    #[serde(default)]
    pub skip_all_plans: bool,
    /// Target the live backend.
    #[serde(default)]
    pub real_backend: bool,
    /// Allow create/destroy against the backend.
    #[serde(default)]
    pub allow_mutation: bool,
}

impl GateFlags {
    /// Creates flags with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips one stage for one module.
    #[must_use]
    pub fn with_skip(mut self, module: &str, stage: StageName) -> Self {
        self.skip_flags.insert(skip_flag_name(module, stage));
        self
    }

    /// Sets the global plan skip.
    #[must_use]
    pub fn with_skip_all_plans(mut self, skip: bool) -> Self {
        self.skip_all_plans = skip;
        self
    }

    /// Sets real-backend mode.
    #[must_use]
    pub fn with_real_backend(mut self, real: bool) -> Self {
        self.real_backend = real;
        self
    }

    /// Sets the mutation opt-in.
    #[must_use]
    pub fn with_mutation(mut self, allow: bool) -> Self {
        self.allow_mutation = allow;
        self
    }
}

/// Resolves execution decisions from [`GateFlags`].
#[derive(Debug, Clone, Default)]
pub struct ExecutionGate {
    flags: GateFlags,
}

impl ExecutionGate {
    /// Creates a gate over the given flags.
    #[must_use]
    pub fn new(flags: GateFlags) -> Self {
        Self { flags }
    }

    /// The flags in use.
    #[must_use]
    pub fn flags(&self) -> &GateFlags {
        &self.flags
    }

    /// Decides whether `stage` runs for `module`.
    #[must_use]
    pub fn decide(&self, module: &str, stage: StageName) -> ExecutionDecision {
        let flag = skip_flag_name(module, stage);
        if self.flags.skip_flags.contains(&flag) {
            return ExecutionDecision::skip(GateReason::SkippedByModuleFlag, flag);
        }

        if stage.is_plan_class() && self.flags.skip_all_plans {
            return ExecutionDecision::skip(GateReason::SkippedByGlobalFlag, SKIP_PLAN_FLAG);
        }

        if stage.is_apply_class() {
            // Both flags are required so that no single switch mutates a live system.
            if !self.flags.real_backend {
                return ExecutionDecision::skip(
                    GateReason::SkippedByMissingOptIn,
                    REAL_BACKEND_FLAG,
                );
            }
            if !self.flags.allow_mutation {
                return ExecutionDecision::skip(GateReason::SkippedByMissingOptIn, MUTATION_FLAG);
            }
        }

        ExecutionDecision::proceed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_flags_run_everything_but_apply() {
        let gate = ExecutionGate::default();
        assert!(gate.decide("vlan", StageName::Structure).run);
        assert!(gate.decide("vlan", StageName::Syntax).run);
        assert!(gate.decide("vlan", StageName::Plan).run);

        let apply = gate.decide("vlan", StageName::Apply);
        assert!(!apply.run);
        assert_eq!(apply.reason, GateReason::SkippedByMissingOptIn);
        assert_eq!(apply.flag.as_deref(), Some(REAL_BACKEND_FLAG));
    }

    #[test]
    fn test_module_flag_only_affects_its_module_and_stage() {
        let gate = ExecutionGate::new(GateFlags::new().with_skip("vlan", StageName::Syntax));

        let decision = gate.decide("vlan", StageName::Syntax);
        assert!(!decision.run);
        assert_eq!(decision.reason, GateReason::SkippedByModuleFlag);
        assert_eq!(decision.flag.as_deref(), Some("SKIP_VLAN_SYNTAX"));

        assert!(gate.decide("vlan", StageName::Structure).run);
        assert!(gate.decide("dns", StageName::Syntax).run);
    }

    #[test]
    fn test_module_flag_wins_over_global_flag() {
        let gate = ExecutionGate::new(
            GateFlags::new()
                .with_skip("dns", StageName::Plan)
                .with_skip_all_plans(true),
        );
        assert_eq!(
            gate.decide("dns", StageName::Plan).reason,
            GateReason::SkippedByModuleFlag
        );
        assert_eq!(
            gate.decide("ntp", StageName::Plan).reason,
            GateReason::SkippedByGlobalFlag
        );
    }

    #[test]
    fn test_global_plan_flag_does_not_touch_apply() {
        let gate = ExecutionGate::new(
            GateFlags::new()
                .with_skip_all_plans(true)
                .with_real_backend(true)
                .with_mutation(true),
        );
        assert!(!gate.decide("vlan", StageName::Plan).run);
        assert!(gate.decide("vlan", StageName::Apply).run);
    }

    #[test]
    fn test_apply_requires_both_flags() {
        let real_only = ExecutionGate::new(GateFlags::new().with_real_backend(true));
        let decision = real_only.decide("vlan", StageName::Apply);
        assert!(!decision.run);
        assert_eq!(decision.flag.as_deref(), Some(MUTATION_FLAG));

        let mutation_only = ExecutionGate::new(GateFlags::new().with_mutation(true));
        let decision = mutation_only.decide("vlan", StageName::Apply);
        assert!(!decision.run);
        assert_eq!(decision.flag.as_deref(), Some(REAL_BACKEND_FLAG));

        let both = ExecutionGate::new(
            GateFlags::new()
                .with_real_backend(true)
                .with_mutation(true),
        );
        assert!(both.flags().real_backend);
        let decision = both.decide("vlan", StageName::Apply);
        assert!(decision.run);
        assert_eq!(decision.reason, GateReason::Proceed);
        assert_eq!(decision.skip_reason(), None);
    }

    #[test]
    fn test_module_flag_skips_apply_even_when_opted_in() {
        let gate = ExecutionGate::new(
            GateFlags::new()
                .with_real_backend(true)
                .with_mutation(true)
                .with_skip("firewall", StageName::Apply),
        );
        assert_eq!(
            gate.decide("firewall", StageName::Apply).reason,
            GateReason::SkippedByModuleFlag
        );
    }

    #[test]
    fn test_skip_reason_mapping() {
        let gate = ExecutionGate::new(GateFlags::new().with_skip_all_plans(true));
        assert_eq!(
            gate.decide("vlan", StageName::Plan).skip_reason(),
            Some(SkipReason::GlobalPlanFlag {
                flag: SKIP_PLAN_FLAG.to_string()
            })
        );
    }

    #[test]
    fn test_skip_flag_name_upper_cases_module() {
        assert_eq!(
            skip_flag_name("monitoring", StageName::Structure),
            "SKIP_MONITORING_STRUCTURE"
        );
    }
}
