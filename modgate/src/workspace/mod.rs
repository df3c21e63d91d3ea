//! Ephemeral workspaces.
//!
//! A [`Workspace`] is a uniquely named temporary directory holding one
//! generated wrapper file. It belongs to exactly one stage invocation and is
//! removed when that stage ends: explicitly through [`Workspace::destroy`],
//! or on drop for early returns and panics.

mod wrapper;

pub use wrapper::{render_wrapper, ProviderSpec, MODULE_LABEL};

use crate::errors::ModgateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Where and how workspaces are created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Parent directory; the system temp directory when unset.
    #[serde(default)]
    pub parent_dir: Option<PathBuf>,
    /// File name of the generated wrapper.
    #[serde(default = "default_wrapper_file")]
    pub wrapper_file: String,
}

fn default_wrapper_file() -> String {
    "main.tf".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            parent_dir: None,
            wrapper_file: default_wrapper_file(),
        }
    }
}

/// An ephemeral directory with a generated wrapper configuration.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    generated_config_path: PathBuf,
    variable_bindings: BTreeMap<String, String>,
}

impl Workspace {
    /// The workspace directory.
    #[must_use]
    pub fn root_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the generated wrapper file.
    #[must_use]
    pub fn generated_config_path(&self) -> &Path {
        &self.generated_config_path
    }

    /// The bindings written into the wrapper.
    #[must_use]
    pub fn variable_bindings(&self) -> &BTreeMap<String, String> {
        &self.variable_bindings
    }

    /// Removes the directory and everything in it.
    ///
    /// # Errors
    ///
    /// Returns a workspace error if removal fails.
    pub fn destroy(self) -> Result<(), ModgateError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|e| {
            ModgateError::workspace(format!("failed to remove {}", path.display()), e)
        })?;
        debug!(dir = %path.display(), "Workspace removed");
        Ok(())
    }
}

/// Creates workspaces for stage invocations.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceProvisioner {
    config: WorkspaceConfig,
    provider: ProviderSpec,
}

impl WorkspaceProvisioner {
    /// Creates a provisioner.
    #[must_use]
    pub fn new(config: WorkspaceConfig, provider: ProviderSpec) -> Self {
        Self { config, provider }
    }

    /// Allocates a fresh directory and writes the wrapper into it.
    ///
    /// The module is referenced by its absolute path when it can be resolved,
    /// so the wrapper works from any parent directory.
    ///
    /// # Errors
    ///
    /// Returns a workspace error if the directory or file cannot be created.
    pub fn create(
        &self,
        module_name: &str,
        module_path: &Path,
        bindings: &BTreeMap<String, String>,
        outputs: &[String],
    ) -> Result<Workspace, ModgateError> {
        let prefix = format!("{module_name}-test-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match &self.config.parent_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| ModgateError::workspace("failed to create temp dir", e))?;

        let source = std::fs::canonicalize(module_path)
            .unwrap_or_else(|_| module_path.to_path_buf());
        let contents = render_wrapper(
            &self.provider,
            &source.to_string_lossy(),
            bindings,
            outputs,
        );

        let generated_config_path = dir.path().join(&self.config.wrapper_file);
        std::fs::write(&generated_config_path, contents).map_err(|e| {
            ModgateError::workspace(
                format!("failed to write {}", generated_config_path.display()),
                e,
            )
        })?;

        debug!(
            module = module_name,
            dir = %dir.path().display(),
            "Workspace created"
        );

        Ok(Workspace {
            dir,
            generated_config_path,
            variable_bindings: bindings.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provisioner_in(parent: &Path) -> WorkspaceProvisioner {
        WorkspaceProvisioner::new(
            WorkspaceConfig {
                parent_dir: Some(parent.to_path_buf()),
                ..WorkspaceConfig::default()
            },
            ProviderSpec::default(),
        )
    }

    #[test]
    fn test_create_writes_wrapper() {
        let parent = tempfile::tempdir().unwrap();
        let module = tempfile::tempdir().unwrap();
        let bindings: BTreeMap<String, String> =
            [("vlan_id".to_string(), "999".to_string())].into();

        let workspace = provisioner_in(parent.path())
            .create("vlan", module.path(), &bindings, &["vlan_name".to_string()])
            .unwrap();

        assert!(workspace.root_dir().starts_with(parent.path()));
        let name = workspace.root_dir().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("vlan-test-"));

        let text = std::fs::read_to_string(workspace.generated_config_path()).unwrap();
        let canonical = module.path().canonicalize().unwrap();
        assert!(text.contains(&format!("source = \"{}\"", canonical.display())));
        assert!(text.contains("  vlan_id = 999\n"));
        assert!(text.contains("value = module.test_module.vlan_name"));
        assert_eq!(workspace.variable_bindings().get("vlan_id").unwrap(), "999");
    }

    #[test]
    fn test_workspaces_are_unique() {
        let parent = tempfile::tempdir().unwrap();
        let provisioner = provisioner_in(parent.path());
        let a = provisioner.create("dns", Path::new("m"), &BTreeMap::new(), &[]).unwrap();
        let b = provisioner.create("dns", Path::new("m"), &BTreeMap::new(), &[]).unwrap();
        assert_ne!(a.root_dir(), b.root_dir());
    }

    #[test]
    fn test_destroy_removes_directory() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = provisioner_in(parent.path())
            .create("ntp", Path::new("m"), &BTreeMap::new(), &[])
            .unwrap();
        let root = workspace.root_dir().to_path_buf();
        assert!(root.exists());

        workspace.destroy().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let parent = tempfile::tempdir().unwrap();
        let root = {
            let workspace = provisioner_in(parent.path())
                .create("backup", Path::new("m"), &BTreeMap::new(), &[])
                .unwrap();
            std::fs::write(workspace.root_dir().join("terraform.tfstate"), "{}").unwrap();
            workspace.root_dir().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn test_drop_on_panic_removes_directory() {
        let parent = tempfile::tempdir().unwrap();
        let provisioner = provisioner_in(parent.path());
        let seen = std::sync::Mutex::new(None);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let workspace = provisioner
                .create("monitoring", Path::new("m"), &BTreeMap::new(), &[])
                .unwrap();
            *seen.lock().unwrap() = Some(workspace.root_dir().to_path_buf());
            panic!("stage body panicked");
        }));

        assert!(result.is_err());
        let root = seen.lock().unwrap().clone().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_missing_parent_is_workspace_error() {
        let parent = tempfile::tempdir().unwrap();
        let provisioner = provisioner_in(&parent.path().join("absent"));
        let err = provisioner
            .create("vlan", Path::new("m"), &BTreeMap::new(), &[])
            .unwrap_err();
        assert_eq!(err.kind(), "workspace");
    }
}
