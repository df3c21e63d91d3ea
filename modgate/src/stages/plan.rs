//! Plan stage: plan a generated wrapper and search the plan text.

use super::{Stage, StageContext};
use crate::core::{StageName, StageOutcome};
use crate::errors::ModgateError;
use crate::tool::ToolCommand;
use crate::workspace::Workspace;
use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

/// Plans the module inside an ephemeral workspace.
///
/// In mock mode the plan is expected to fail authentication; only the
/// rendered resource graph in the output text is scored.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanStage;

impl PlanStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn plan(
        ctx: &StageContext<'_>,
        workspace: &Workspace,
        patterns: &[Regex],
    ) -> Result<Vec<String>, ModgateError> {
        let module = ctx.module;
        let env = ctx.backend.plan_env(ctx.real_backend);

        let init = ToolCommand::Init { backendless: false };
        let output = ctx.run_tool(init, workspace.root_dir(), &env).await?;
        if !output.success() {
            return Ok(vec![output.failure_message(init)]);
        }

        let plan = ToolCommand::Plan { no_color: true };
        let output = ctx.run_tool(plan, workspace.root_dir(), &env).await?;

        let mut violations = Vec::new();
        if !output.success() {
            if ctx.real_backend {
                violations.push(output.failure_message(plan));
            } else {
                info!(
                    module = %module.name,
                    exit = %output.describe_exit(),
                    "Plan did not succeed against mock credentials; scoring output only"
                );
            }
        }

        for pattern in patterns {
            if !pattern.is_match(&output.output) {
                violations.push(format!(
                    "Expected pattern '{}' not found in plan output",
                    pattern.as_str()
                ));
            }
        }

        Ok(violations)
    }
}

#[async_trait]
impl Stage for PlanStage {
    fn kind(&self) -> StageName {
        StageName::Plan
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StageOutcome, ModgateError> {
        let module = ctx.module;
        let patterns = module.compile_expected_resources()?;

        let workspace = ctx.provisioner.create(
            &module.name,
            &module.path,
            &module.variables,
            &module.wrapper_outputs(),
        )?;
        debug!(
            module = %module.name,
            workspace = %workspace.root_dir().display(),
            patterns = patterns.len(),
            "Planning module"
        );

        // On `?` the workspace is dropped, which removes its directory.
        let violations = Self::plan(ctx, &workspace, &patterns).await?;
        let outcome = StageOutcome::from_violations(StageName::Plan, violations);
        Ok(ctx.release(workspace, outcome).await)
    }
}
