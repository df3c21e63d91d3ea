//! Runs every stage for every module and gathers the report.

use crate::config::{BackendSettings, RunConfig};
use crate::core::{FatalRecord, ModuleReport, RunReport, StageName, StageOutcome, StageStatus};
use crate::errors::ModgateError;
use crate::events::{
    EventSink, NoOpEventSink, MODULE_COMPLETED, MODULE_FATAL, MODULE_STARTED, STAGE_COMPLETED,
    STAGE_SKIPPED, STAGE_STARTED,
};
use crate::gate::ExecutionGate;
use crate::stages::{default_stages, Stage, StageContext};
use crate::suite::{ModuleSuite, ModuleUnderTest};
use crate::tool::{TerraformCli, ToolRunner};
use crate::workspace::WorkspaceProvisioner;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Tracks one stage through its state machine.
#[derive(Debug)]
struct StageTracker {
    stage: StageName,
    status: StageStatus,
}

impl StageTracker {
    const fn new(stage: StageName) -> Self {
        Self {
            stage,
            status: StageStatus::Pending,
        }
    }

    fn advance(&mut self, to: StageStatus) -> Result<(), ModgateError> {
        if !self.status.can_transition_to(to) {
            return Err(ModgateError::InvalidTransition {
                stage: self.stage,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// A fatal error raised while running a module's stages.
struct Aborted {
    stage: StageName,
    error: ModgateError,
}

/// Drives the stage pipeline over a module suite.
///
/// All flags are resolved before construction; nothing here reads the
/// process environment.
pub struct Orchestrator {
    gate: ExecutionGate,
    backend: BackendSettings,
    provisioner: WorkspaceProvisioner,
    tool: Arc<dyn ToolRunner>,
    events: Arc<dyn EventSink>,
    stages: Vec<Box<dyn Stage>>,
    parallelism: usize,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("gate", &self.gate)
            .field("stages", &self.stages)
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator with the default stages and `tool`.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration patterns fail to compile.
    pub fn new(config: &RunConfig, tool: Arc<dyn ToolRunner>) -> Result<Self, ModgateError> {
        Ok(Self {
            gate: ExecutionGate::new(config.gate.clone()),
            backend: config.backend.clone(),
            provisioner: WorkspaceProvisioner::new(
                config.workspace.clone(),
                config.provider.clone(),
            ),
            tool,
            events: Arc::new(NoOpEventSink),
            stages: default_stages()?,
            parallelism: config.parallelism.max(1),
        })
    }

    /// Creates an orchestrator that runs the configured tool binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration patterns fail to compile.
    pub fn from_config(config: &RunConfig) -> Result<Self, ModgateError> {
        let tool = TerraformCli::new(&config.tool.binary).with_timeout(config.tool.timeout());
        debug!(
            binary = %tool.binary().display(),
            timeout_secs = config.tool.timeout_secs,
            "Using external tool"
        );
        Self::new(config, Arc::new(tool))
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Replaces the stage list.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<Box<dyn Stage>>) -> Self {
        self.stages = stages;
        self
    }

    /// Modules validated concurrently.
    #[must_use]
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Runs every module and returns reports in suite order.
    pub async fn run_all(&self, suite: &ModuleSuite) -> RunReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            run_id = %run_id,
            modules = suite.len(),
            parallelism = self.parallelism,
            "Starting run"
        );

        let modules = stream::iter(suite.modules())
            .map(|module| self.run_module(module))
            .buffered(self.parallelism)
            .collect::<Vec<_>>()
            .await;

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            modules,
        };
        let summary = report.summary();
        info!(
            run_id = %run_id,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            fatal = summary.fatal,
            "Run finished"
        );
        report
    }

    /// Runs the stages for one module.
    ///
    /// A fatal error aborts the module and discards its partial outcomes.
    /// It never affects other modules.
    pub async fn run_module(&self, module: &ModuleUnderTest) -> ModuleReport {
        self.events
            .emit(MODULE_STARTED, Some(json!({ "module": module.name })))
            .await;

        match self.run_stages(module).await {
            Ok(stages) => {
                let failed = stages.iter().filter(|o| o.is_failed()).count();
                info!(module = %module.name, failed, "Module completed");
                self.events
                    .emit(
                        MODULE_COMPLETED,
                        Some(json!({ "module": module.name, "failed_stages": failed })),
                    )
                    .await;
                ModuleReport::completed(&module.name, stages)
            }
            Err(Aborted { stage, error }) => {
                error!(
                    module = %module.name,
                    stage = %stage,
                    kind = error.kind(),
                    error = %error,
                    "Module aborted"
                );
                let record = FatalRecord {
                    stage,
                    kind: error.kind().to_string(),
                    message: error.to_string(),
                };
                self.events
                    .emit(
                        MODULE_FATAL,
                        Some(json!({
                            "module": module.name,
                            "stage": stage,
                            "kind": record.kind,
                            "error": record.message,
                        })),
                    )
                    .await;
                ModuleReport::fatal(&module.name, record)
            }
        }
    }

    async fn run_stages(&self, module: &ModuleUnderTest) -> Result<Vec<StageOutcome>, Aborted> {
        let ctx = StageContext {
            module,
            tool: &*self.tool,
            provisioner: &self.provisioner,
            real_backend: self.gate.flags().real_backend,
            backend: &self.backend,
            events: &*self.events,
        };

        let mut outcomes = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let kind = stage.kind();
            let outcome = self
                .run_stage(stage.as_ref(), &ctx)
                .await
                .map_err(|error| Aborted { stage: kind, error })?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn run_stage(
        &self,
        stage: &dyn Stage,
        ctx: &StageContext<'_>,
    ) -> Result<StageOutcome, ModgateError> {
        let kind = stage.kind();
        let module = &ctx.module.name;
        let mut tracker = StageTracker::new(kind);

        let decision = self.gate.decide(module, kind);
        if let Some(reason) = decision.skip_reason() {
            tracker.advance(StageStatus::Skipped)?;
            info!(module = %module, stage = %kind, reason = %reason, "Stage skipped");
            self.events
                .emit(
                    STAGE_SKIPPED,
                    Some(json!({
                        "module": module,
                        "stage": kind,
                        "reason": reason.to_string(),
                    })),
                )
                .await;
            return Ok(StageOutcome::skipped(kind, reason));
        }

        tracker.advance(StageStatus::Running)?;
        debug!(module = %module, stage = %kind, "Stage started");
        self.events
            .emit(STAGE_STARTED, Some(json!({ "module": module, "stage": kind })))
            .await;

        let start = Instant::now();
        let outcome = stage.execute(ctx).await?;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracker.advance(outcome.status)?;
        let outcome = outcome.with_duration_ms(duration_ms);
        info!(
            module = %module,
            stage = %kind,
            status = %outcome.status,
            violations = outcome.violations.len(),
            duration_ms,
            "Stage completed"
        );
        self.events
            .emit(
                STAGE_COMPLETED,
                Some(json!({
                    "module": module,
                    "stage": kind,
                    "status": outcome.status,
                    "violations": outcome.violations,
                    "duration_ms": duration_ms,
                })),
            )
            .await;
        Ok(outcome)
    }
}
