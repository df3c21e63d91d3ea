//! External configuration tool invocation.
//!
//! The tool is a black box: each command runs in a working directory and
//! yields its combined output text and exit code. Nothing beyond the exit
//! code and substring/pattern search over the output is interpreted.

mod terraform;

pub use terraform::TerraformCli;

use crate::errors::ModgateError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// The logical operations the stages need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ToolCommand {
    /// Initialize the working directory.
    Init {
        /// Skip backend configuration.
        backendless: bool,
    },
    /// Validate the configuration.
    Validate,
    /// Compute a plan.
    Plan {
        /// Disable colored output.
        no_color: bool,
    },
    /// Apply the configuration.
    Apply {
        /// Skip the interactive approval.
        auto_approve: bool,
    },
    /// Destroy everything the configuration manages.
    Destroy {
        /// Skip the interactive approval.
        auto_approve: bool,
    },
    /// Read outputs.
    Output {
        /// Emit JSON.
        json: bool,
    },
}

impl ToolCommand {
    /// The subcommand name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Validate => "validate",
            Self::Plan { .. } => "plan",
            Self::Apply { .. } => "apply",
            Self::Destroy { .. } => "destroy",
            Self::Output { .. } => "output",
        }
    }

    /// Command-line arguments for the tool.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.name().to_string()];
        let flag = match self {
            Self::Init { backendless: true } => Some("-backend=false"),
            Self::Plan { no_color: true } => Some("-no-color"),
            Self::Apply { auto_approve: true } | Self::Destroy { auto_approve: true } => {
                Some("-auto-approve")
            }
            Self::Output { json: true } => Some("-json"),
            _ => None,
        };
        if let Some(flag) = flag {
            args.push(flag.to_string());
        }
        args
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args().join(" "))
    }
}

/// One command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    /// The command.
    pub command: ToolCommand,
    /// Directory the command runs in.
    pub working_dir: PathBuf,
    /// Extra environment for the child process.
    pub env: BTreeMap<String, String>,
}

impl ToolInvocation {
    /// Creates an invocation with no extra environment.
    #[must_use]
    pub fn new(command: ToolCommand, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            working_dir: working_dir.into(),
            env: BTreeMap::new(),
        }
    }

    /// Sets the extra environment.
    #[must_use]
    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

/// What a command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Exit code; `None` if the process was killed or timed out.
    pub exit_code: Option<i32>,
    /// Captured stdout followed by stderr.
    pub output: String,
    /// The command exceeded the configured timeout.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub timed_out: bool,
}

impl ToolOutput {
    /// A completed command.
    #[must_use]
    pub fn exited(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            output: output.into(),
            timed_out: false,
        }
    }

    /// A command killed after the timeout.
    #[must_use]
    pub fn timed_out(output: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            output: output.into(),
            timed_out: true,
        }
    }

    /// Returns true if the command exited with status zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human-readable description of how the command ended.
    #[must_use]
    pub fn describe_exit(&self) -> String {
        match (self.exit_code, self.timed_out) {
            (_, true) => "timed out".to_string(),
            (Some(code), false) => format!("exit status {code}"),
            (None, false) => "terminated by signal".to_string(),
        }
    }

    /// Failure message for a command that did not succeed.
    #[must_use]
    pub fn failure_message(&self, command: ToolCommand) -> String {
        format!(
            "Command '{command}' failed: {}\nOutput: {}",
            self.describe_exit(),
            self.output.trim_end()
        )
    }
}

/// Runs external tool commands.
///
/// Errors are reserved for the tool being impossible to start; a command
/// that runs and fails is an `Ok` output with a nonzero exit code.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Runs one command to completion or timeout.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ModgateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_args() {
        assert_eq!(ToolCommand::Init { backendless: true }.args(), vec!["init", "-backend=false"]);
        assert_eq!(ToolCommand::Init { backendless: false }.args(), vec!["init"]);
        assert_eq!(ToolCommand::Validate.args(), vec!["validate"]);
        assert_eq!(ToolCommand::Plan { no_color: true }.args(), vec!["plan", "-no-color"]);
        assert_eq!(
            ToolCommand::Apply { auto_approve: true }.args(),
            vec!["apply", "-auto-approve"]
        );
        assert_eq!(
            ToolCommand::Destroy { auto_approve: true }.args(),
            vec!["destroy", "-auto-approve"]
        );
        assert_eq!(ToolCommand::Output { json: true }.args(), vec!["output", "-json"]);
    }

    #[test]
    fn test_command_display() {
        assert_eq!(ToolCommand::Plan { no_color: true }.to_string(), "plan -no-color");
    }

    #[test]
    fn test_output_success() {
        assert!(ToolOutput::exited(0, "ok").success());
        assert!(!ToolOutput::exited(1, "Error").success());
        assert!(!ToolOutput::timed_out("").success());
    }

    #[test]
    fn test_failure_message() {
        let output = ToolOutput::exited(1, "Error: Invalid reference\n");
        let message = output.failure_message(ToolCommand::Validate);
        assert_eq!(
            message,
            "Command 'validate' failed: exit status 1\nOutput: Error: Invalid reference"
        );
        assert_eq!(ToolOutput::timed_out("").describe_exit(), "timed out");
    }
}
