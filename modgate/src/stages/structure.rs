//! Structure stage: required files and the declared contract.

use super::{Stage, StageContext};
use crate::contracts::{validate_contract, ContractExtractor, ExtractionResult};
use crate::core::{StageName, StageOutcome};
use crate::errors::ModgateError;
use crate::events::CONTRACT_UNDOCUMENTED;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};

/// Checks required files, then diffs declarations against the contract.
#[derive(Debug, Clone)]
pub struct StructureStage {
    inputs: ContractExtractor,
    outputs: ContractExtractor,
}

impl StructureStage {
    /// Creates the stage with the standard declaration keywords.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration patterns fail to compile.
    pub fn new() -> Result<Self, ModgateError> {
        Ok(Self {
            inputs: ContractExtractor::inputs()?,
            outputs: ContractExtractor::outputs()?,
        })
    }

    fn extract(
        extractor: &ContractExtractor,
        module: &str,
        path: &Path,
    ) -> Result<Option<ExtractionResult>, ModgateError> {
        let found = extractor.extract_file(path)?;
        if let Some(found) = &found {
            for name in found.duplicates() {
                warn!(
                    module,
                    keyword = extractor.keyword(),
                    name = %name,
                    "Declaration appears more than once; the last one wins"
                );
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl Stage for StructureStage {
    fn kind(&self) -> StageName {
        StageName::Structure
    }

    async fn execute(&self, ctx: &StageContext<'_>) -> Result<StageOutcome, ModgateError> {
        let module = ctx.module;
        if !module.path.is_dir() {
            return Err(ModgateError::ModuleNotFound {
                module: module.name.clone(),
                path: module.path.clone(),
            });
        }

        let mut violations: Vec<String> = module
            .required_files
            .iter()
            .filter(|file| !module.path.join(file).exists())
            .map(|file| format!("Required file missing: {file}"))
            .collect();

        let inputs = Self::extract(&self.inputs, &module.name, &module.input_declarations_path())?;
        let outputs =
            Self::extract(&self.outputs, &module.name, &module.output_declarations_path())?;

        let report = validate_contract(&module.contract, inputs.as_ref(), outputs.as_ref());
        violations.extend(report.violation_messages());

        let notes = report.undocumented_notes();
        if !notes.is_empty() {
            for note in &notes {
                info!(module = %module.name, "{note}");
            }
            ctx.events
                .emit(
                    CONTRACT_UNDOCUMENTED,
                    Some(json!({
                        "module": module.name,
                        "inputs": report.undocumented_inputs,
                        "outputs": report.undocumented_outputs,
                    })),
                )
                .await;
        }

        Ok(StageOutcome::from_violations(StageName::Structure, violations).with_notes(notes))
    }
}
