//! Contract validation against extracted declarations.

use super::ExtractionResult;
use crate::errors::ContractDefinitionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The expected interface of a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleContract {
    /// Inputs that must be declared without a default.
    #[serde(default)]
    pub required_inputs: BTreeSet<String>,
    /// Inputs that must be declared with a default.
    #[serde(default)]
    pub optional_inputs: BTreeSet<String>,
    /// Outputs that must be declared.
    #[serde(default)]
    pub outputs: BTreeSet<String>,
}

impl ModuleContract {
    /// Builds a contract, rejecting names listed as both required and optional.
    ///
    /// # Errors
    ///
    /// Returns `ContractDefinitionError` naming the overlapping inputs.
    pub fn new<R, O, P, S>(
        module: &str,
        required_inputs: R,
        optional_inputs: O,
        outputs: P,
    ) -> Result<Self, ContractDefinitionError>
    where
        R: IntoIterator<Item = S>,
        O: IntoIterator<Item = S>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let contract = Self {
            required_inputs: required_inputs.into_iter().map(Into::into).collect(),
            optional_inputs: optional_inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        };
        contract.check(module)?;
        Ok(contract)
    }

    /// Verifies that required and optional inputs are disjoint.
    ///
    /// # Errors
    ///
    /// Returns `ContractDefinitionError` naming the overlapping inputs.
    pub fn check(&self, module: &str) -> Result<(), ContractDefinitionError> {
        let overlapping: Vec<String> = self
            .required_inputs
            .intersection(&self.optional_inputs)
            .cloned()
            .collect();
        if overlapping.is_empty() {
            Ok(())
        } else {
            Err(ContractDefinitionError::new(module, overlapping))
        }
    }

    /// Returns true if the contract expects any input.
    #[must_use]
    pub fn has_inputs(&self) -> bool {
        !self.required_inputs.is_empty() || !self.optional_inputs.is_empty()
    }

    /// Returns true if the contract expects any output.
    #[must_use]
    pub fn has_outputs(&self) -> bool {
        !self.outputs.is_empty()
    }

    /// Returns true if `name` is a documented input.
    #[must_use]
    pub fn documents_input(&self, name: &str) -> bool {
        self.required_inputs.contains(name) || self.optional_inputs.contains(name)
    }
}

/// Which declarations file a violation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationsFile {
    /// The input declarations.
    Inputs,
    /// The output declarations.
    Outputs,
}

/// One mismatch between the expected contract and the declarations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ContractViolation {
    /// A required input is not declared.
    MissingRequiredInput(String),
    /// A required input carries a default.
    RequiredInputHasDefault(String),
    /// An optional input is not declared.
    MissingOptionalInput(String),
    /// An optional input has no recognizable default.
    OptionalInputWithoutDefault(String),
    /// An expected output is not declared.
    MissingOutput(String),
    /// A declarations file is absent although the contract expects entries.
    MissingDeclarationsFile(DeclarationsFile),
}

impl ContractViolation {
    /// The declaration name the violation refers to, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredInput(name)
            | Self::RequiredInputHasDefault(name)
            | Self::MissingOptionalInput(name)
            | Self::OptionalInputWithoutDefault(name)
            | Self::MissingOutput(name) => Some(name),
            Self::MissingDeclarationsFile(_) => None,
        }
    }
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequiredInput(name) => write!(f, "Required input not found: {name}"),
            Self::RequiredInputHasDefault(name) => {
                write!(f, "Required input should not have default value: {name}")
            }
            Self::MissingOptionalInput(name) => write!(f, "Optional input not found: {name}"),
            Self::OptionalInputWithoutDefault(name) => {
                write!(f, "Optional input should have default value: {name}")
            }
            Self::MissingOutput(name) => write!(f, "Output not found: {name}"),
            Self::MissingDeclarationsFile(DeclarationsFile::Inputs) => {
                write!(f, "Input declarations file not found, but inputs are required")
            }
            Self::MissingDeclarationsFile(DeclarationsFile::Outputs) => {
                write!(f, "Output declarations file not found, but outputs are required")
            }
        }
    }
}

/// Result of comparing a contract with the declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractReport {
    /// Every violation, inputs first, each group in name order.
    pub violations: Vec<ContractViolation>,
    /// Declared inputs the contract does not mention.
    pub undocumented_inputs: BTreeSet<String>,
    /// Declared outputs the contract does not mention.
    pub undocumented_outputs: BTreeSet<String>,
}

impl ContractReport {
    /// Returns true if there are no violations. Undocumented names never count.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations rendered as messages.
    #[must_use]
    pub fn violation_messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    /// Informational lines for undocumented declarations.
    #[must_use]
    pub fn undocumented_notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if !self.undocumented_inputs.is_empty() {
            notes.push(format!(
                "Undocumented inputs found: {}",
                join(&self.undocumented_inputs)
            ));
        }
        if !self.undocumented_outputs.is_empty() {
            notes.push(format!(
                "Undocumented outputs found: {}",
                join(&self.undocumented_outputs)
            ));
        }
        notes
    }
}

fn join(names: &BTreeSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Compares `contract` with the extracted declarations.
///
/// `None` means the declarations file does not exist. That is tolerated only
/// when the contract expects nothing from that file. Every check runs; all
/// violations are reported together.
#[must_use]
pub fn validate_contract(
    contract: &ModuleContract,
    inputs: Option<&ExtractionResult>,
    outputs: Option<&ExtractionResult>,
) -> ContractReport {
    let mut report = ContractReport::default();

    match inputs {
        Some(found) => {
            for name in &contract.required_inputs {
                match found.get(name) {
                    None => report
                        .violations
                        .push(ContractViolation::MissingRequiredInput(name.clone())),
                    Some(symbol) if symbol.has_default => report
                        .violations
                        .push(ContractViolation::RequiredInputHasDefault(name.clone())),
                    Some(_) => {}
                }
            }
            for name in &contract.optional_inputs {
                match found.get(name) {
                    None => report
                        .violations
                        .push(ContractViolation::MissingOptionalInput(name.clone())),
                    Some(symbol) if !symbol.has_default => report
                        .violations
                        .push(ContractViolation::OptionalInputWithoutDefault(name.clone())),
                    Some(_) => {}
                }
            }
            report.undocumented_inputs = found
                .names()
                .filter(|name| !contract.documents_input(name))
                .map(str::to_string)
                .collect();
        }
        None if contract.has_inputs() => report
            .violations
            .push(ContractViolation::MissingDeclarationsFile(DeclarationsFile::Inputs)),
        None => {}
    }

    match outputs {
        Some(found) => {
            for name in &contract.outputs {
                if !found.contains(name) {
                    report
                        .violations
                        .push(ContractViolation::MissingOutput(name.clone()));
                }
            }
            report.undocumented_outputs = found
                .names()
                .filter(|name| !contract.outputs.contains(*name))
                .map(str::to_string)
                .collect();
        }
        None if contract.has_outputs() => report
            .violations
            .push(ContractViolation::MissingDeclarationsFile(DeclarationsFile::Outputs)),
        None => {}
    }

    report
}
