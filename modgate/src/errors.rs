//! Error types for modgate.
//!
//! Only fatal, configuration-class problems are errors. Contract mismatches,
//! missing plan patterns and failing tool commands are recorded as values in
//! the stage outcome instead.

use crate::core::{StageName, StageStatus};
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for modgate operations.
#[derive(Debug, Error)]
pub enum ModgateError {
    /// The module directory does not exist.
    #[error("Module directory does not exist: {}", path.display())]
    ModuleNotFound {
        /// The module name.
        module: String,
        /// The path that was checked.
        path: PathBuf,
    },

    /// A declarations file exists but could not be read.
    #[error("Could not read {}: {source}", path.display())]
    DeclarationsUnreadable {
        /// The declarations file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Apply was requested without a complete set of credentials.
    #[error("{host_var}, {user_var} and {password_var} must be set for real backend apply tests")]
    MissingCredentials {
        /// Name of the host setting.
        host_var: String,
        /// Name of the user setting.
        user_var: String,
        /// Name of the password setting.
        password_var: String,
    },

    /// The expected contract is inconsistent.
    #[error("{0}")]
    InvalidContract(#[from] ContractDefinitionError),

    /// A structural or expected-resource pattern failed to compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The regex compile error.
        #[source]
        source: regex::Error,
    },

    /// Module selection named a module the suite does not contain.
    #[error("Module '{name}' not found. Available modules: {}", available.join(", "))]
    UnknownModule {
        /// The requested module.
        name: String,
        /// Modules the suite knows about.
        available: Vec<String>,
    },

    /// The external tool could not be started.
    #[error("Failed to start '{}': {source}", binary.display())]
    ToolUnavailable {
        /// The tool binary.
        binary: PathBuf,
        /// The spawn error.
        #[source]
        source: std::io::Error,
    },

    /// Apply aborted and the destroy that followed it failed too.
    #[error("{source}; destroy also failed and live resources may be orphaned: {destroy_failure}")]
    ApplyAborted {
        /// Why apply aborted.
        #[source]
        source: Box<ModgateError>,
        /// The destroy failure.
        destroy_failure: String,
    },

    /// An ephemeral workspace could not be created or written.
    #[error("Workspace error: {message}")]
    Workspace {
        /// What went wrong.
        message: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The suite file could not be loaded.
    #[error("Suite error in {}: {message}", path.display())]
    Suite {
        /// The suite file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// A configuration value could not be interpreted.
    #[error("Invalid configuration value for {key}: {message}")]
    Config {
        /// The setting name.
        key: String,
        /// What went wrong.
        message: String,
    },

    /// A stage tried to move between states illegally.
    #[error("Stage '{stage}' cannot move from {from} to {to}")]
    InvalidTransition {
        /// The stage.
        stage: StageName,
        /// Current state.
        from: StageStatus,
        /// Requested state.
        to: StageStatus,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModgateError {
    /// Creates a workspace error with a message.
    #[must_use]
    pub fn workspace(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Workspace {
            message: message.into(),
            source,
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }

    /// Short machine-readable category used in reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModuleNotFound { .. } => "module_not_found",
            Self::DeclarationsUnreadable { .. } => "declarations_unreadable",
            Self::MissingCredentials { .. } => "missing_credentials",
            Self::InvalidContract(_) => "invalid_contract",
            Self::InvalidPattern { .. } => "invalid_pattern",
            Self::UnknownModule { .. } => "unknown_module",
            Self::ToolUnavailable { .. } => "tool_unavailable",
            Self::ApplyAborted { source, .. } => source.kind(),
            Self::Workspace { .. } => "workspace",
            Self::Suite { .. } => "suite",
            Self::Config { .. } => "config",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Io(_) => "io",
        }
    }
}

/// Error raised when a contract names the same input as required and optional.
#[derive(Debug, Clone, Error)]
#[error("Contract for '{module}' lists inputs as both required and optional: {}", overlapping.join(", "))]
pub struct ContractDefinitionError {
    /// The module whose contract is inconsistent.
    pub module: String,
    /// Names present in both sets.
    pub overlapping: Vec<String>,
}

impl ContractDefinitionError {
    /// Creates a new contract definition error.
    #[must_use]
    pub fn new(module: impl Into<String>, overlapping: Vec<String>) -> Self {
        Self {
            module: module.into(),
            overlapping,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_module_lists_available() {
        let err = ModgateError::UnknownModule {
            name: "wifi".to_string(),
            available: vec!["vlan".to_string(), "dns".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Module 'wifi' not found. Available modules: vlan, dns"
        );
        assert_eq!(err.kind(), "unknown_module");
    }

    #[test]
    fn test_missing_credentials_message() {
        let err = ModgateError::MissingCredentials {
            host_var: "MIKROTIK_HOST".to_string(),
            user_var: "MIKROTIK_USER".to_string(),
            password_var: "MIKROTIK_PASSWORD".to_string(),
        };
        assert!(err.to_string().contains("MIKROTIK_PASSWORD"));
    }

    #[test]
    fn test_apply_aborted_keeps_cause_kind() {
        let cause = ModgateError::ToolUnavailable {
            binary: PathBuf::from("terraform"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let err = ModgateError::ApplyAborted {
            source: Box::new(cause),
            destroy_failure: "Command 'destroy -auto-approve' failed: exit status 1".to_string(),
        };
        assert_eq!(err.kind(), "tool_unavailable");
        let message = err.to_string();
        assert!(message.starts_with("Failed to start 'terraform'"));
        assert!(message.contains("live resources may be orphaned"));
        assert!(message.contains("destroy -auto-approve"));
    }

    #[test]
    fn test_contract_definition_error_converts() {
        let err: ModgateError =
            ContractDefinitionError::new("vlan", vec!["disabled".to_string()]).into();
        assert_eq!(err.kind(), "invalid_contract");
        assert!(err.to_string().contains("disabled"));
    }
}
