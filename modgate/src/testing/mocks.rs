//! Scripted tool runner for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use crate::errors::ModgateError;
use crate::tool::{ToolInvocation, ToolOutput, ToolRunner};

/// File name the wrapper is written to.
const WRAPPER_FILE: &str = "main.tf";

/// One recorded tool call.
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    /// What was requested.
    pub invocation: ToolInvocation,
    /// Contents of the wrapper file in the working directory at call time.
    pub wrapper: Option<String>,
}

#[derive(Debug, Clone)]
enum Scripted {
    Output(ToolOutput),
    Unavailable,
}

/// A tool runner that answers from per-command scripts.
///
/// Responses for a command are consumed in order; the last one repeats.
/// Unscripted commands exit 0 with empty output.
#[derive(Debug, Default)]
pub struct ScriptedToolRunner {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedInvocation>>,
}

impl ScriptedToolRunner {
    /// Creates a runner where every command succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `command` (e.g. "plan").
    pub fn respond(&self, command: &str, output: ToolOutput) {
        self.push(command, Scripted::Output(output));
    }

    /// Makes `command` fail as if the tool binary were missing.
    pub fn fail_with_unavailable(&self, command: &str) {
        self.push(command, Scripted::Unavailable);
    }

    fn push(&self, command: &str, response: Scripted) {
        self.scripts
            .lock()
            .entry(command.to_string())
            .or_default()
            .push_back(response);
    }

    fn next(&self, command: &str) -> Option<Scripted> {
        let mut scripts = self.scripts.lock();
        let queue = scripts.get_mut(command)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    /// Returns every recorded call in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.calls.lock().clone()
    }

    /// Returns how many times `command` ran.
    #[must_use]
    pub fn call_count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.invocation.command.name() == command)
            .count()
    }

    /// Clears recorded calls. Scripts are kept.
    pub fn reset(&self) {
        self.calls.lock().clear();
    }
}

#[async_trait]
impl ToolRunner for ScriptedToolRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ModgateError> {
        let wrapper = std::fs::read_to_string(invocation.working_dir.join(WRAPPER_FILE)).ok();
        self.calls.lock().push(RecordedInvocation {
            invocation: invocation.clone(),
            wrapper,
        });

        match self.next(invocation.command.name()) {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Unavailable) => Err(ModgateError::ToolUnavailable {
                binary: PathBuf::from("terraform"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted failure"),
            }),
            None => Ok(ToolOutput::exited(0, "")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolCommand;

    #[tokio::test]
    async fn test_unscripted_commands_succeed() {
        let runner = ScriptedToolRunner::new();
        let output = runner
            .run(&ToolInvocation::new(ToolCommand::Validate, "."))
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(runner.call_count("validate"), 1);
    }

    #[tokio::test]
    async fn test_last_response_repeats() {
        let runner = ScriptedToolRunner::new();
        runner.respond("plan", ToolOutput::exited(1, "first"));
        runner.respond("plan", ToolOutput::exited(2, "second"));

        let invocation = ToolInvocation::new(ToolCommand::Plan { no_color: true }, ".");
        let outputs = [
            runner.run(&invocation).await.unwrap(),
            runner.run(&invocation).await.unwrap(),
            runner.run(&invocation).await.unwrap(),
        ];
        assert_eq!(outputs[0].output, "first");
        assert_eq!(outputs[1].output, "second");
        assert_eq!(outputs[2].output, "second");
    }

    #[tokio::test]
    async fn test_records_wrapper_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tf"), "module \"test_module\" {}").unwrap();

        let runner = ScriptedToolRunner::new();
        runner
            .run(&ToolInvocation::new(ToolCommand::Init { backendless: false }, dir.path()))
            .await
            .unwrap();

        let calls = runner.invocations();
        assert_eq!(calls[0].wrapper.as_deref(), Some("module \"test_module\" {}"));

        runner.reset();
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let runner = ScriptedToolRunner::new();
        runner.fail_with_unavailable("init");
        let err = runner
            .run(&ToolInvocation::new(ToolCommand::Init { backendless: true }, "."))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "tool_unavailable");
    }
}
