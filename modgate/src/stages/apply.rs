//! Apply stage: apply, read outputs and destroy against a live backend.

use super::{Stage, StageContext};
use crate::core::{StageName, StageOutcome};
use crate::errors::ModgateError;
use crate::events::APPLY_DESTROY_FAILED;
use crate::tool::ToolCommand;
use crate::workspace::Workspace;
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::{error, info};

/// Runs init, apply, output and destroy in one workspace.
///
/// Once apply has been attempted, destroy always runs. A destroy failure is
/// recorded as a cleanup failure separate from the apply result.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyStage;

impl ApplyStage {
    /// Creates the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Reads outputs and checks every exported name is present.
    async fn check_outputs(
        ctx: &StageContext<'_>,
        workspace: &Workspace,
        env: &BTreeMap<String, String>,
    ) -> Vec<String> {
        let command = ToolCommand::Output { json: true };
        let output = match ctx.run_tool(command, workspace.root_dir(), env).await {
            Ok(output) if output.success() => output,
            Ok(output) => {
                return vec![format!(
                    "Failed to get outputs: {}",
                    output.failure_message(command)
                )]
            }
            Err(e) => return vec![format!("Failed to get outputs: {e}")],
        };

        info!(module = %ctx.module.name, outputs = %output.output.trim(), "Module outputs");

        ctx.module
            .wrapper_outputs()
            .into_iter()
            .filter(|name| !output.output.contains(&format!("\"{name}\"")))
            .map(|name| format!("Expected output '{name}' not found in outputs"))
            .collect()
    }

    /// Destroys what apply created. Returns a failure description.
    async fn destroy(
        ctx: &StageContext<'_>,
        workspace: &Workspace,
        env: &BTreeMap<String, String>,
    ) -> Option<String> {
        let command = ToolCommand::Destroy { auto_approve: true };
        let failure = match ctx.run_tool(command, workspace.root_dir(), env).await {
            Ok(output) if output.success() => return None,
            Ok(output) => output.failure_message(command),
            Err(e) => format!("Command '{command}' could not run: {e}"),
        };

        error!(
            module = %ctx.module.name,
            workspace = %workspace.root_dir().display(),
            error = %failure,
            "Destroy failed after apply; live resources may be orphaned"
        );
        ctx.events
            .emit(
                APPLY_DESTROY_FAILED,
                Some(json!({
                    "module": ctx.module.name,
                    "error": failure,
                })),
            )
            .await;
        Some(failure)
    }
}

#[async_trait]
impl Stage for ApplyStage {
    fn kind(&self) -> StageName {
        StageName::Apply
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StageOutcome, ModgateError> {
        let module = ctx.module;
        // Intent to mutate was explicit, so missing credentials abort.
        let env = ctx.backend.apply_env()?;

        let workspace = ctx.provisioner.create(
            &module.name,
            &module.path,
            &module.variables,
            &module.wrapper_outputs(),
        )?;

        let init = ToolCommand::Init { backendless: false };
        let output = ctx.run_tool(init, workspace.root_dir(), &env).await?;
        if !output.success() {
            let violations = vec![output.failure_message(init)];
            let outcome = StageOutcome::failed(StageName::Apply, violations);
            return Ok(ctx.release(workspace, outcome).await);
        }

        let apply = ToolCommand::Apply { auto_approve: true };
        let applied = ctx.run_tool(apply, workspace.root_dir(), &env).await;

        let mut violations = Vec::new();
        match &applied {
            Ok(output) if output.success() => {
                violations.extend(Self::check_outputs(ctx, &workspace, &env).await);
            }
            Ok(output) => violations.push(output.failure_message(apply)),
            Err(_) => {}
        }

        let destroy_failure = Self::destroy(ctx, &workspace, &env).await;
        if let Err(e) = applied {
            return Err(match destroy_failure {
                Some(failure) => ModgateError::ApplyAborted {
                    source: Box::new(e),
                    destroy_failure: failure,
                },
                None => e,
            });
        }

        let mut outcome = StageOutcome::from_violations(StageName::Apply, violations);
        if let Some(failure) = destroy_failure {
            outcome = outcome.with_cleanup_failure(failure);
        }
        Ok(ctx.release(workspace, outcome).await)
    }
}
