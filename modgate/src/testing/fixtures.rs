//! Module fixtures and a single-stage harness.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::ScriptedToolRunner;
use crate::config::BackendSettings;
use crate::contracts::ModuleContract;
use crate::core::StageOutcome;
use crate::errors::ModgateError;
use crate::events::CollectingEventSink;
use crate::stages::{Stage, StageContext};
use crate::suite::{ModuleUnderTest, INPUT_DECLARATIONS_FILE, OUTPUT_DECLARATIONS_FILE};
use crate::workspace::{ProviderSpec, WorkspaceConfig, WorkspaceProvisioner};

/// A module directory in a temporary location.
#[derive(Debug)]
pub struct ModuleFixture {
    dir: TempDir,
}

impl ModuleFixture {
    /// Creates an empty module directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// Creates a module whose declarations satisfy `contract` exactly.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be written.
    pub fn satisfying(contract: &ModuleContract) -> io::Result<Self> {
        let mut inputs = String::new();
        for name in &contract.required_inputs {
            let _ = writeln!(inputs, "variable \"{name}\" {{\n  type = string\n}}\n");
        }
        for name in &contract.optional_inputs {
            let _ = writeln!(inputs, "variable \"{name}\" {{\n  default = null\n}}\n");
        }
        let mut outputs = String::new();
        for name in &contract.outputs {
            let _ = writeln!(outputs, "output \"{name}\" {{\n  value = null\n}}\n");
        }

        Self::new()?
            .with_file("main.tf", "")?
            .with_file(INPUT_DECLARATIONS_FILE, &inputs)?
            .with_file(OUTPUT_DECLARATIONS_FILE, &outputs)
    }

    /// The module directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file relative to the module directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, name: &str, contents: &str) -> io::Result<()> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }

    /// Writes a file and returns the fixture.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn with_file(self, name: &str, contents: &str) -> io::Result<Self> {
        self.write(name, contents)?;
        Ok(self)
    }

    /// A module under test pointing at this directory.
    #[must_use]
    pub fn module(&self, name: &str, contract: ModuleContract) -> ModuleUnderTest {
        ModuleUnderTest::new(name, self.dir.path(), contract)
    }
}

/// Runs one stage against one module with scripted tooling.
#[derive(Debug)]
pub struct StageHarness {
    /// The module under test.
    pub module: ModuleUnderTest,
    /// Tool runner used by the stage.
    pub tool: ScriptedToolRunner,
    /// Events emitted by the stage.
    pub events: CollectingEventSink,
    /// Backend settings handed to the stage.
    pub backend: BackendSettings,
    /// Whether the stage targets the live backend.
    pub real_backend: bool,
    workspaces: TempDir,
    provisioner: WorkspaceProvisioner,
}

impl StageHarness {
    /// Creates a harness in mock-backend mode.
    ///
    /// # Panics
    ///
    /// Panics if the workspace parent directory cannot be created.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(module: ModuleUnderTest) -> Self {
        let workspaces = tempfile::tempdir().expect("create workspace parent directory");
        let provisioner = WorkspaceProvisioner::new(
            WorkspaceConfig {
                parent_dir: Some(workspaces.path().to_path_buf()),
                ..WorkspaceConfig::default()
            },
            ProviderSpec::default(),
        );
        Self {
            module,
            tool: ScriptedToolRunner::new(),
            events: CollectingEventSink::new(),
            backend: BackendSettings::default(),
            real_backend: false,
            workspaces,
            provisioner,
        }
    }

    /// Replaces the backend settings.
    #[must_use]
    pub fn with_backend(mut self, backend: BackendSettings) -> Self {
        self.backend = backend;
        self
    }

    /// Targets the live backend instead of the mock one.
    #[must_use]
    pub fn with_real_backend(mut self, real: bool) -> Self {
        self.real_backend = real;
        self
    }

    /// Runs `stage` once.
    ///
    /// # Errors
    ///
    /// Returns the stage's fatal error.
    pub async fn run(&self, stage: &dyn Stage) -> Result<StageOutcome, ModgateError> {
        let ctx = StageContext {
            module: &self.module,
            tool: &self.tool,
            provisioner: &self.provisioner,
            real_backend: self.real_backend,
            backend: &self.backend,
            events: &self.events,
        };
        stage.execute(&ctx).await
    }

    /// Workspace directories that still exist.
    #[must_use]
    pub fn leftover_workspaces(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.workspaces.path())
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{validate_contract, ContractExtractor};

    #[test]
    fn test_satisfying_fixture_validates() {
        let contract =
            ModuleContract::new("dns", ["upstream"], ["cache_size", "allow_remote"], ["servers"])
                .unwrap();
        let fixture = ModuleFixture::satisfying(&contract).unwrap();

        let inputs = ContractExtractor::inputs()
            .unwrap()
            .extract_file(&fixture.path().join(INPUT_DECLARATIONS_FILE))
            .unwrap();
        let outputs = ContractExtractor::outputs()
            .unwrap()
            .extract_file(&fixture.path().join(OUTPUT_DECLARATIONS_FILE))
            .unwrap();
        let report = validate_contract(&contract, inputs.as_ref(), outputs.as_ref());
        assert!(report.is_satisfied(), "{:?}", report.violations);
        assert!(report.undocumented_inputs.is_empty());
    }

    #[test]
    fn test_write_nested_file() {
        let fixture = ModuleFixture::new().unwrap();
        fixture.write("templates/rules.tpl", "x").unwrap();
        assert!(fixture.path().join("templates/rules.tpl").is_file());
    }

    #[test]
    fn test_harness_starts_clean() {
        let fixture = ModuleFixture::new().unwrap();
        let harness = StageHarness::new(fixture.module("ntp", ModuleContract::default()));
        assert!(harness.leftover_workspaces().is_empty());
        assert!(!harness.real_backend);
    }
}
