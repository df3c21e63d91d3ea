//! Modules under test.
//!
//! A [`ModuleSuite`] is the ordered list of modules a run validates. It comes
//! from the built-in catalog or from a TOML suite file.

mod catalog;
mod file;

pub use catalog::BUILTIN_MODULES;
pub use file::{ModuleEntry, SuiteFile};

use crate::contracts::ModuleContract;
use crate::errors::ModgateError;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the input declarations file inside a module.
pub const INPUT_DECLARATIONS_FILE: &str = "variables.tf";

/// Name of the output declarations file inside a module.
pub const OUTPUT_DECLARATIONS_FILE: &str = "outputs.tf";

/// One module and everything needed to exercise it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleUnderTest {
    /// Module name.
    pub name: String,
    /// Module directory.
    pub path: PathBuf,
    /// Expected interface.
    pub contract: ModuleContract,
    /// Files that must exist in the module directory.
    pub required_files: Vec<String>,
    /// Pre-quoted literals bound to module inputs in the wrapper.
    pub variables: BTreeMap<String, String>,
    /// Patterns that must appear in plan output.
    pub expected_resources: Vec<String>,
    /// Outputs re-exported by the wrapper. Defaults to the contract outputs.
    pub exported_outputs: Option<Vec<String>>,
}

impl ModuleUnderTest {
    /// Creates a module with nothing beyond its contract.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        contract: ModuleContract,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            contract,
            required_files: Vec::new(),
            variables: BTreeMap::new(),
            expected_resources: Vec::new(),
            exported_outputs: None,
        }
    }

    /// Sets the required files.
    #[must_use]
    pub fn with_required_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the wrapper variable bindings.
    #[must_use]
    pub fn with_variables<I, K, V>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.variables = variables
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Sets the expected plan patterns.
    #[must_use]
    pub fn with_expected_resources<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expected_resources = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the outputs the wrapper re-exports.
    #[must_use]
    pub fn with_exported_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exported_outputs = Some(outputs.into_iter().map(Into::into).collect());
        self
    }

    /// Outputs the wrapper re-exports.
    #[must_use]
    pub fn wrapper_outputs(&self) -> Vec<String> {
        self.exported_outputs
            .clone()
            .unwrap_or_else(|| self.contract.outputs.iter().cloned().collect())
    }

    /// Compiles the expected plan patterns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` for the first pattern that does not compile.
    pub fn compile_expected_resources(&self) -> Result<Vec<Regex>, ModgateError> {
        self.expected_resources
            .iter()
            .map(|p| Regex::new(p).map_err(|e| ModgateError::pattern(p.clone(), e)))
            .collect()
    }

    /// Path of the input declarations file.
    #[must_use]
    pub fn input_declarations_path(&self) -> PathBuf {
        self.path.join(INPUT_DECLARATIONS_FILE)
    }

    /// Path of the output declarations file.
    #[must_use]
    pub fn output_declarations_path(&self) -> PathBuf {
        self.path.join(OUTPUT_DECLARATIONS_FILE)
    }
}

/// An ordered set of modules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSuite {
    modules: Vec<ModuleUnderTest>,
}

impl ModuleSuite {
    /// Creates a suite from modules.
    #[must_use]
    pub fn new(modules: Vec<ModuleUnderTest>) -> Self {
        Self { modules }
    }

    /// The built-in router modules, resolved under `root`.
    #[must_use]
    pub fn builtin(root: &Path) -> Self {
        Self::new(catalog::builtin(root))
    }

    /// Parses a TOML suite read from `origin`.
    ///
    /// Entries without a path resolve to `<root>/<name>`; relative paths
    /// resolve against the directory of `origin`.
    ///
    /// # Errors
    ///
    /// Returns a suite error for unparseable text, and contract or pattern
    /// errors for inconsistent entries.
    pub fn from_toml_str(text: &str, origin: &Path, root: &Path) -> Result<Self, ModgateError> {
        let file: SuiteFile = toml::from_str(text).map_err(|e| ModgateError::Suite {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        file.into_suite(origin, root)
    }

    /// Reads and parses a TOML suite file.
    ///
    /// # Errors
    ///
    /// Returns a suite error if the file cannot be read or parsed.
    pub fn load(path: &Path, root: &Path) -> Result<Self, ModgateError> {
        let text = std::fs::read_to_string(path).map_err(|e| ModgateError::Suite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let suite = Self::from_toml_str(&text, path, root)?;
        debug!(path = %path.display(), modules = suite.len(), "Suite loaded");
        Ok(suite)
    }

    /// Module names in suite order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name.clone()).collect()
    }

    /// The modules in suite order.
    #[must_use]
    pub fn modules(&self) -> &[ModuleUnderTest] {
        &self.modules
    }

    /// Looks up a module by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModuleUnderTest> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns true if the suite has no modules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Narrows the suite to one module. `None` keeps every module.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModule` listing the available names.
    pub fn select(self, filter: Option<&str>) -> Result<Self, ModgateError> {
        let Some(wanted) = filter else {
            return Ok(self);
        };
        let wanted = wanted.to_lowercase();
        match self.modules.iter().position(|m| m.name.to_lowercase() == wanted) {
            Some(index) => {
                let mut modules = self.modules;
                Ok(Self::new(vec![modules.swap_remove(index)]))
            }
            None => Err(ModgateError::UnknownModule {
                name: wanted,
                available: self.names(),
            }),
        }
    }

    /// Replaces module directories named in `overrides`.
    #[must_use]
    pub fn with_path_overrides(mut self, overrides: &BTreeMap<String, PathBuf>) -> Self {
        for module in &mut self.modules {
            if let Some(path) = overrides.get(&module.name) {
                module.path.clone_from(path);
            }
        }
        self
    }
}

impl IntoIterator for ModuleSuite {
    type Item = ModuleUnderTest;
    type IntoIter = std::vec::IntoIter<ModuleUnderTest>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.into_iter()
    }
}
