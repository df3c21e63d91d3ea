//! Syntax stage: initialize and validate the module directory.

use super::{Stage, StageContext};
use crate::core::{SkipReason, StageName, StageOutcome};
use crate::errors::ModgateError;
use crate::tool::ToolCommand;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::info;

/// Literal the validate command prints on success.
pub const SUCCESS_MARKER: &str = "Success!";

/// Runs `init -backend=false` and `validate` inside the module directory.
#[derive(Debug, Clone)]
pub struct SyntaxStage {
    success_marker: String,
}

impl Default for SyntaxStage {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxStage {
    /// Creates the stage with the standard success marker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            success_marker: SUCCESS_MARKER.to_string(),
        }
    }
}

#[async_trait]
impl Stage for SyntaxStage {
    fn kind(&self) -> StageName {
        StageName::Syntax
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StageOutcome, ModgateError> {
        let module = ctx.module;
        if !module.path.is_dir() {
            info!(
                module = %module.name,
                path = %module.path.display(),
                "Module directory not found; skipping syntax"
            );
            return Ok(StageOutcome::skipped(
                StageName::Syntax,
                SkipReason::ModuleDirectoryMissing {
                    path: module.path.clone(),
                },
            ));
        }

        let env = BTreeMap::new();

        let init = ToolCommand::Init { backendless: true };
        let output = ctx.run_tool(init, &module.path, &env).await?;
        if !output.success() {
            return Ok(StageOutcome::failed(
                StageName::Syntax,
                vec![output.failure_message(init)],
            ));
        }

        let output = ctx.run_tool(ToolCommand::Validate, &module.path, &env).await?;
        if !output.success() {
            return Ok(StageOutcome::failed(
                StageName::Syntax,
                vec![output.failure_message(ToolCommand::Validate)],
            ));
        }

        if !output.output.contains(&self.success_marker) {
            return Ok(StageOutcome::failed(
                StageName::Syntax,
                vec![format!(
                    "Validate did not report success: {}",
                    output.output.trim_end()
                )],
            ));
        }

        Ok(StageOutcome::passed(StageName::Syntax))
    }
}
