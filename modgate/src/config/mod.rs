//! Run configuration.
//!
//! A [`RunConfig`] is built once before orchestration and threaded into the
//! orchestrator. Nested components receive only their slice of it.

mod env;

pub use env::{
    CREDENTIAL_HOST_VAR, CREDENTIAL_PASSWORD_VAR, CREDENTIAL_USER_VAR, MODULES_ROOT_VAR,
    MODULE_FILTER_VAR, PARALLELISM_VAR, TOOL_TIMEOUT_VAR, TOOL_VAR, WORKSPACE_DIR_VAR,
};

use crate::errors::ModgateError;
use crate::gate::GateFlags;
use crate::workspace::{ProviderSpec, WorkspaceConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Host/user/password settings for the provider.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Backend host.
    #[serde(default)]
    pub host: String,
    /// Backend user.
    #[serde(default)]
    pub user: String,
    /// Backend password.
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Placeholder credentials used when no real backend is targeted.
    #[must_use]
    pub fn mock() -> Self {
        Self::new("dummy.example.com", "dummy", "dummy")
    }

    /// Returns true if every field is non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.host.is_empty() && !self.user.is_empty() && !self.password.is_empty()
    }

    /// Fills empty fields from `fallback`.
    #[must_use]
    pub fn or(&self, fallback: &Self) -> Self {
        let pick = |value: &str, other: &str| {
            if value.is_empty() { other.to_string() } else { value.to_string() }
        };
        Self {
            host: pick(&self.host, &fallback.host),
            user: pick(&self.user, &fallback.user),
            password: pick(&self.password, &fallback.password),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("user", &self.user)
            .field(
                "password",
                &if self.password.is_empty() { "" } else { "<redacted>" },
            )
            .finish()
    }
}

/// Environment variable names the provider reads its credentials from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialVars {
    /// Host variable.
    pub host: String,
    /// User variable.
    pub user: String,
    /// Password variable.
    pub password: String,
}

impl Default for CredentialVars {
    fn default() -> Self {
        Self {
            host: CREDENTIAL_HOST_VAR.to_string(),
            user: CREDENTIAL_USER_VAR.to_string(),
            password: CREDENTIAL_PASSWORD_VAR.to_string(),
        }
    }
}

/// What the plan and apply stages need to reach the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Configured credentials.
    #[serde(default)]
    pub credentials: Credentials,
    /// Fallbacks used in mock mode.
    #[serde(default = "Credentials::mock")]
    pub mock_credentials: Credentials,
    /// Variable names the provider reads.
    #[serde(default)]
    pub credential_vars: CredentialVars,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            mock_credentials: Credentials::mock(),
            credential_vars: CredentialVars::default(),
        }
    }
}

impl BackendSettings {
    /// Child environment for plan.
    ///
    /// Against the mock backend empty credentials are replaced by the mock
    /// values. Against the real backend only the configured values are passed.
    #[must_use]
    pub fn plan_env(&self, real_backend: bool) -> BTreeMap<String, String> {
        let credentials = if real_backend {
            self.credentials.clone()
        } else {
            self.credentials.or(&self.mock_credentials)
        };
        self.env_for(&credentials)
    }

    /// Child environment for apply.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredentials` if any credential is empty.
    pub fn apply_env(&self) -> Result<BTreeMap<String, String>, ModgateError> {
        if !self.credentials.is_complete() {
            return Err(ModgateError::MissingCredentials {
                host_var: self.credential_vars.host.clone(),
                user_var: self.credential_vars.user.clone(),
                password_var: self.credential_vars.password.clone(),
            });
        }
        Ok(self.env_for(&self.credentials))
    }

    fn env_for(&self, credentials: &Credentials) -> BTreeMap<String, String> {
        [
            (&self.credential_vars.host, &credentials.host),
            (&self.credential_vars.user, &credentials.user),
            (&self.credential_vars.password, &credentials.password),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
    }
}

/// External tool settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Tool binary.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    /// Per-command timeout in seconds. Zero disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_binary() -> PathBuf {
    PathBuf::from("terraform")
}

const fn default_timeout_secs() -> u64 {
    600
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ToolConfig {
    /// The timeout, if enabled.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Everything a run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Flags for the execution gate.
    #[serde(default)]
    pub gate: GateFlags,
    /// Backend credentials.
    #[serde(default)]
    pub backend: BackendSettings,
    /// Provider declared in wrappers.
    #[serde(default)]
    pub provider: ProviderSpec,
    /// External tool.
    #[serde(default)]
    pub tool: ToolConfig,
    /// Workspace placement.
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    /// Directory holding one subdirectory per module.
    #[serde(default = "default_modules_root")]
    pub modules_root: PathBuf,
    /// Per-module directory overrides.
    #[serde(default)]
    pub module_paths: BTreeMap<String, PathBuf>,
    /// Run only this module. `None` runs every module.
    #[serde(default)]
    pub module_filter: Option<String>,
    /// Modules validated concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
}

fn default_modules_root() -> PathBuf {
    PathBuf::from("../terraform/modules")
}

const fn default_parallelism() -> usize {
    4
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            gate: GateFlags::default(),
            backend: BackendSettings::default(),
            provider: ProviderSpec::default(),
            tool: ToolConfig::default(),
            workspace: WorkspaceConfig::default(),
            modules_root: default_modules_root(),
            module_paths: BTreeMap::new(),
            module_filter: None,
            parallelism: default_parallelism(),
        }
    }
}

impl RunConfig {
    /// Builds the configuration from the current process environment.
    ///
    /// # Errors
    ///
    /// Returns a config error for values that cannot be interpreted.
    pub fn from_env() -> Result<Self, ModgateError> {
        let snapshot: BTreeMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&snapshot)
    }

    /// Builds the configuration from a snapshot of key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns a config error for values that cannot be interpreted.
    pub fn from_env_map(vars: &BTreeMap<String, String>) -> Result<Self, ModgateError> {
        env::parse(vars)
    }

    /// Directory of `module`: the override when present, else under the root.
    #[must_use]
    pub fn module_path(&self, module: &str) -> PathBuf {
        self.module_paths
            .get(module)
            .cloned()
            .unwrap_or_else(|| self.modules_root.join(module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn with_credentials(credentials: Credentials) -> BackendSettings {
        BackendSettings {
            credentials,
            ..BackendSettings::default()
        }
    }

    #[test]
    fn test_mock_plan_env_uses_placeholders() {
        let env = BackendSettings::default().plan_env(false);
        assert_eq!(env.get("MIKROTIK_HOST").map(String::as_str), Some("dummy.example.com"));
        assert_eq!(env.get("MIKROTIK_USER").map(String::as_str), Some("dummy"));
        assert_eq!(env.get("MIKROTIK_PASSWORD").map(String::as_str), Some("dummy"));
    }

    #[test]
    fn test_mock_plan_env_prefers_configured_values() {
        let settings = BackendSettings {
            credentials: Credentials::new("router.lan", "", ""),
            ..BackendSettings::default()
        };
        let env = settings.plan_env(false);
        assert_eq!(env.get("MIKROTIK_HOST").map(String::as_str), Some("router.lan"));
        assert_eq!(env.get("MIKROTIK_USER").map(String::as_str), Some("dummy"));
    }

    #[test]
    fn test_real_plan_env_never_uses_placeholders() {
        let env = with_credentials(Credentials::default()).plan_env(true);
        assert!(env.is_empty());

        let env = with_credentials(Credentials::new("router.lan", "", "")).plan_env(true);
        assert_eq!(env.len(), 1);
        assert_eq!(env.get("MIKROTIK_HOST").map(String::as_str), Some("router.lan"));
    }

    #[test]
    fn test_apply_env_requires_every_credential() {
        let err = with_credentials(Credentials::new("router.lan", "admin", ""))
            .apply_env()
            .unwrap_err();
        assert_eq!(err.kind(), "missing_credentials");
        assert!(err.to_string().contains("MIKROTIK_PASSWORD"));

        let env = with_credentials(Credentials::new("router.lan", "admin", "secret"))
            .apply_env()
            .unwrap();
        assert_eq!(env.len(), 3);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let text = format!("{:?}", Credentials::new("h", "u", "hunter2"));
        assert!(!text.contains("hunter2"));
        assert!(text.contains("<redacted>"));
    }

    #[test]
    fn test_module_path_override() {
        let mut config = RunConfig::default();
        config.module_paths.insert("dns".to_string(), PathBuf::from("/opt/dns"));
        assert_eq!(config.module_path("dns"), PathBuf::from("/opt/dns"));
        assert_eq!(config.module_path("ntp"), PathBuf::from("../terraform/modules/ntp"));
    }

    #[test]
    fn test_tool_timeout() {
        assert_eq!(ToolConfig::default().timeout(), Some(Duration::from_secs(600)));
        let disabled = ToolConfig {
            timeout_secs: 0,
            ..ToolConfig::default()
        };
        assert_eq!(disabled.timeout(), None);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: RunConfig = toml::from_str(
            r#"
modules_root = "modules"
parallelism = 2

[gate]
skip_all_plans = true
"#,
        )
        .unwrap();
        assert_eq!(config.modules_root, PathBuf::from("modules"));
        assert_eq!(config.parallelism, 2);
        assert!(config.gate.skip_all_plans);
        assert_eq!(config.tool, ToolConfig::default());
        assert_eq!(config.backend.mock_credentials, Credentials::mock());
    }
}
