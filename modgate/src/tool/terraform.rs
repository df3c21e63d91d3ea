//! Subprocess-backed tool runner.

use super::{ToolInvocation, ToolOutput, ToolRunner};
use crate::errors::ModgateError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs the configuration tool binary as a child process.
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl Default for TerraformCli {
    fn default() -> Self {
        Self::new("terraform")
    }
}

impl TerraformCli {
    /// Creates a runner for `binary` with no timeout.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    /// Kills commands that run longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The binary in use.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl ToolRunner for TerraformCli {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ModgateError> {
        let mut command = Command::new(&self.binary);
        command
            .args(invocation.command.args())
            .current_dir(&invocation.working_dir)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| ModgateError::ToolUnavailable {
            binary: self.binary.clone(),
            source,
        })?;

        let start = Instant::now();
        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    // Dropping the future kills the child.
                    warn!(
                        command = %invocation.command,
                        dir = %invocation.working_dir.display(),
                        timeout_secs = limit.as_secs_f64(),
                        "Tool command timed out"
                    );
                    return Ok(ToolOutput::timed_out(format!(
                        "command timed out after {:.1}s",
                        limit.as_secs_f64()
                    )));
                }
            },
            None => child.wait_with_output().await,
        };
        let output = waited?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let result = ToolOutput {
            exit_code: output.status.code(),
            output: text,
            timed_out: false,
        };

        debug!(
            command = %invocation.command,
            dir = %invocation.working_dir.display(),
            exit_code = ?result.exit_code,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Tool command finished"
        );

        Ok(result)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::tool::ToolCommand;

    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-tool.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "echo \"args: $@\"\necho \"host=$MIKROTIK_HOST\" >&2\nexit 3");
        let runner = TerraformCli::new(bin);

        let invocation = ToolInvocation::new(ToolCommand::Plan { no_color: true }, dir.path())
            .with_env([("MIKROTIK_HOST".to_string(), "dummy.example.com".to_string())].into());
        let output = runner.run(&invocation).await.unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert!(output.output.contains("args: plan -no-color"));
        assert!(output.output.contains("host=dummy.example.com"));
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "pwd");
        let work = tempfile::tempdir().unwrap();
        let runner = TerraformCli::new(bin);

        let output = runner
            .run(&ToolInvocation::new(ToolCommand::Validate, work.path()))
            .await
            .unwrap();

        assert!(output.success());
        let reported = PathBuf::from(output.output.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            work.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "sleep 5");
        let runner = TerraformCli::new(bin).with_timeout(Some(Duration::from_millis(100)));

        let output = runner
            .run(&ToolInvocation::new(ToolCommand::Validate, dir.path()))
            .await
            .unwrap();

        assert!(output.timed_out);
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-tool");
        let runner = TerraformCli::new(&missing);
        assert_eq!(runner.binary(), missing.as_path());

        let err = runner
            .run(&ToolInvocation::new(ToolCommand::Validate, dir.path()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "tool_unavailable");
        assert!(err.to_string().contains("no-such-tool"));
    }
}
