//! Verification stages.
//!
//! Each stage inspects one module and yields a [`StageOutcome`]. Validation
//! failures are values inside the outcome; an `Err` is reserved for fatal
//! configuration problems that abort the module.

mod apply;
mod plan;
mod structure;
mod syntax;

pub use apply::ApplyStage;
pub use plan::PlanStage;
pub use structure::StructureStage;
pub use syntax::{SyntaxStage, SUCCESS_MARKER};

use crate::config::BackendSettings;
use crate::core::{StageName, StageOutcome};
use crate::errors::ModgateError;
use crate::events::{EventSink, WORKSPACE_CLEANUP_FAILED};
use crate::suite::ModuleUnderTest;
use crate::tool::{ToolCommand, ToolInvocation, ToolOutput, ToolRunner};
use crate::workspace::{Workspace, WorkspaceProvisioner};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use tracing::error;

/// Everything a stage may touch while it runs.
#[derive(Clone, Copy)]
pub struct StageContext<'a> {
    /// The module under test.
    pub module: &'a ModuleUnderTest,
    /// Runs external tool commands.
    pub tool: &'a dyn ToolRunner,
    /// Creates ephemeral workspaces.
    pub provisioner: &'a WorkspaceProvisioner,
    /// Whether commands target the live backend.
    pub real_backend: bool,
    /// Credentials and the variables that carry them.
    pub backend: &'a BackendSettings,
    /// Lifecycle event sink.
    pub events: &'a dyn EventSink,
}

impl StageContext<'_> {
    /// Runs one tool command.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tool cannot be started.
    pub async fn run_tool(
        &self,
        command: ToolCommand,
        working_dir: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<ToolOutput, ModgateError> {
        let invocation = ToolInvocation::new(command, working_dir).with_env(env.clone());
        self.tool.run(&invocation).await
    }

    /// Removes `workspace`, recording a failure on `outcome`.
    pub(crate) async fn release(
        &self,
        workspace: Workspace,
        outcome: StageOutcome,
    ) -> StageOutcome {
        let stage = outcome.stage;
        match workspace.destroy() {
            Ok(()) => outcome,
            Err(e) => {
                let message = e.to_string();
                error!(
                    module = %self.module.name,
                    stage = %stage,
                    error = %message,
                    "Workspace cleanup failed"
                );
                self.events
                    .emit(
                        WORKSPACE_CLEANUP_FAILED,
                        Some(json!({
                            "module": self.module.name,
                            "stage": stage,
                            "error": message,
                        })),
                    )
                    .await;
                outcome.with_cleanup_failure(message)
            }
        }
    }
}

/// One verification stage.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Which stage this is.
    fn kind(&self) -> StageName;

    /// Runs the stage body.
    ///
    /// # Errors
    ///
    /// Returns an error for fatal problems that abort the module.
    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StageOutcome, ModgateError>;
}

/// The four stages in pipeline order.
///
/// # Errors
///
/// Returns an error if the declaration patterns fail to compile.
pub fn default_stages() -> Result<Vec<Box<dyn Stage>>, ModgateError> {
    Ok(vec![
        Box::new(StructureStage::new()?),
        Box::new(SyntaxStage::new()),
        Box::new(PlanStage::new()),
        Box::new(ApplyStage::new()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stages_are_in_order() {
        let kinds: Vec<StageName> = default_stages()
            .unwrap()
            .iter()
            .map(|stage| stage.kind())
            .collect();
        assert_eq!(kinds, StageName::ORDER.to_vec());
    }
}
