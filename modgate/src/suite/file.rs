//! TOML suite files.
//!
//! ```toml
//! [[module]]
//! name = "dns"
//! optional_inputs = ["upstream_dns_servers", "cache_size"]
//! outputs = ["dns_servers"]
//!
//! [[module]]
//! name = "vlan"
//! path = "../modules/vlan"
//! required_inputs = ["vlan_id"]
//! expected_resources = ['vlan_id\s*=\s*999']
//!
//! [module.variables]
//! vlan_id = "999"
//! ```

use super::{ModuleSuite, ModuleUnderTest};
use crate::contracts::ModuleContract;
use crate::errors::ModgateError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Top-level suite document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteFile {
    /// Module entries in run order.
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleEntry>,
}

/// One `[[module]]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleEntry {
    /// Module name.
    pub name: String,
    /// Module directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Inputs that must be declared without a default.
    #[serde(default)]
    pub required_inputs: Vec<String>,
    /// Inputs that must be declared with a default.
    #[serde(default)]
    pub optional_inputs: Vec<String>,
    /// Outputs that must be declared.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Files that must exist.
    #[serde(default)]
    pub required_files: Vec<String>,
    /// Wrapper bindings, as pre-quoted literals.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// Patterns expected in plan output.
    #[serde(default)]
    pub expected_resources: Vec<String>,
    /// Outputs the wrapper re-exports.
    #[serde(default)]
    pub exported_outputs: Option<Vec<String>>,
}

impl ModuleEntry {
    fn into_module(self, base: &Path, root: &Path) -> Result<ModuleUnderTest, ModgateError> {
        let contract = ModuleContract::new(
            &self.name,
            self.required_inputs,
            self.optional_inputs,
            self.outputs,
        )?;
        let path = match self.path {
            Some(path) if path.is_absolute() => path,
            Some(path) => base.join(path),
            None => root.join(&self.name),
        };

        let mut module = ModuleUnderTest::new(self.name, path, contract)
            .with_required_files(self.required_files)
            .with_variables(self.variables)
            .with_expected_resources(self.expected_resources);
        module.exported_outputs = self.exported_outputs;
        module.compile_expected_resources()?;
        Ok(module)
    }
}

impl SuiteFile {
    /// Validates every entry and builds the suite.
    ///
    /// # Errors
    ///
    /// Returns a suite error for empty suites and duplicate names, and
    /// contract or pattern errors for inconsistent entries.
    pub fn into_suite(self, origin: &Path, root: &Path) -> Result<ModuleSuite, ModgateError> {
        let suite_error = |message: String| ModgateError::Suite {
            path: origin.to_path_buf(),
            message,
        };

        if self.modules.is_empty() {
            return Err(suite_error("no [[module]] entries".to_string()));
        }

        let mut seen = BTreeSet::new();
        for entry in &self.modules {
            if entry.name.trim().is_empty() {
                return Err(suite_error("module entry with empty name".to_string()));
            }
            if !seen.insert(entry.name.as_str()) {
                return Err(suite_error(format!("module '{}' is listed twice", entry.name)));
            }
        }

        let base = origin.parent().unwrap_or_else(|| Path::new("."));
        let modules = self
            .modules
            .into_iter()
            .map(|entry| entry.into_module(base, root))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ModuleSuite::new(modules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SUITE: &str = r#"
[[module]]
name = "dns"
optional_inputs = ["upstream_dns_servers", "cache_size"]
outputs = ["dns_servers"]

[[module]]
name = "vlan"
path = "vendored/vlan"
required_inputs = ["vlan_id"]
required_files = ["main.tf"]
expected_resources = ['vlan_id\s*=\s*999']
exported_outputs = ["vlan_name"]

[module.variables]
vlan_id = "999"
bridge_name = '"bridge0"'
"#;

    #[test]
    fn test_parse_suite() {
        let suite = ModuleSuite::from_toml_str(
            SUITE,
            Path::new("/etc/modgate/suite.toml"),
            Path::new("/srv/modules"),
        )
        .unwrap();
        assert_eq!(suite.names(), vec!["dns".to_string(), "vlan".to_string()]);

        let dns = suite.get("dns").unwrap();
        assert_eq!(dns.path, PathBuf::from("/srv/modules/dns"));
        assert_eq!(dns.contract.optional_inputs.len(), 2);
        assert_eq!(dns.wrapper_outputs(), vec!["dns_servers".to_string()]);

        let vlan = suite.get("vlan").unwrap();
        assert_eq!(vlan.path, PathBuf::from("/etc/modgate/vendored/vlan"));
        assert_eq!(vlan.variables.get("bridge_name").unwrap(), "\"bridge0\"");
        assert_eq!(vlan.expected_resources, vec![r"vlan_id\s*=\s*999".to_string()]);
        assert_eq!(vlan.wrapper_outputs(), vec!["vlan_name".to_string()]);
    }

    fn parse_err(text: &str) -> ModgateError {
        ModuleSuite::from_toml_str(text, Path::new("s.toml"), Path::new("m")).unwrap_err()
    }

    #[test]
    fn test_overlapping_contract_is_rejected() {
        let text = r#"
[[module]]
name = "ntp"
required_inputs = ["timezone"]
optional_inputs = ["timezone"]
"#;
        let err = parse_err(text);
        assert_eq!(err.kind(), "invalid_contract");
    }

    #[test]
    fn test_duplicate_and_empty_suites_are_rejected() {
        let text = "[[module]]\nname = \"ntp\"\n\n[[module]]\nname = \"ntp\"\n";
        let err = parse_err(text);
        assert!(err.to_string().contains("listed twice"));

        let err = parse_err("");
        assert_eq!(err.kind(), "suite");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let text = "[[module]]\nname = \"ntp\"\nrequired = [\"x\"]\n";
        let err = parse_err(text);
        assert_eq!(err.kind(), "suite");
    }

    #[test]
    fn test_bad_pattern_is_rejected() {
        let text = "[[module]]\nname = \"ntp\"\nexpected_resources = [\"(\"]\n";
        let err = parse_err(text);
        assert_eq!(err.kind(), "invalid_pattern");
    }
}
