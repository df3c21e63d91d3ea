//! Environment snapshot parsing.

use super::{Credentials, RunConfig};
use crate::core::StageName;
use crate::errors::ModgateError;
use crate::gate::{MUTATION_FLAG, REAL_BACKEND_FLAG, SKIP_PLAN_FLAG};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Backend host variable.
pub const CREDENTIAL_HOST_VAR: &str = "MIKROTIK_HOST";
/// Backend user variable.
pub const CREDENTIAL_USER_VAR: &str = "MIKROTIK_USER";
/// Backend password variable.
pub const CREDENTIAL_PASSWORD_VAR: &str = "MIKROTIK_PASSWORD";
/// Module selection.
pub const MODULE_FILTER_VAR: &str = "TEST_MODULE";
/// Tool binary.
pub const TOOL_VAR: &str = "MODGATE_TOOL";
/// Tool timeout in seconds.
pub const TOOL_TIMEOUT_VAR: &str = "MODGATE_TOOL_TIMEOUT_SECS";
/// Root of the module directories.
pub const MODULES_ROOT_VAR: &str = "MODGATE_MODULES_ROOT";
/// Parent directory of workspaces.
pub const WORKSPACE_DIR_VAR: &str = "MODGATE_WORKSPACE_DIR";
/// Concurrent module count.
pub const PARALLELISM_VAR: &str = "MODGATE_PARALLELISM";

const MODULE_PATH_SUFFIX: &str = "_MODULE_PATH";

fn is_affirmative(vars: &BTreeMap<String, String>, key: &str) -> bool {
    vars.get(key).is_some_and(|v| v == "true")
}

fn non_empty<'a>(vars: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(
    vars: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ModgateError>
where
    T::Err: std::fmt::Display,
{
    non_empty(vars, key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ModgateError::Config {
                key: key.to_string(),
                message: format!("'{raw}': {e}"),
            })
        })
        .transpose()
}

/// Returns true for `SKIP_<MODULE>_<STAGE>` names.
fn is_stage_skip_flag(key: &str) -> bool {
    let Some(rest) = key.strip_prefix("SKIP_") else {
        return false;
    };
    rest.rsplit_once('_').is_some_and(|(module, stage)| {
        !module.is_empty() && StageName::from_token(stage).is_some()
    })
}

pub(super) fn parse(vars: &BTreeMap<String, String>) -> Result<RunConfig, ModgateError> {
    let mut config = RunConfig::default();

    config.gate.skip_all_plans = is_affirmative(vars, SKIP_PLAN_FLAG);
    config.gate.real_backend = is_affirmative(vars, REAL_BACKEND_FLAG);
    config.gate.allow_mutation = is_affirmative(vars, MUTATION_FLAG);
    config.gate.skip_flags = vars
        .iter()
        .filter(|(key, value)| *value == "true" && is_stage_skip_flag(key))
        .map(|(key, _)| key.to_uppercase())
        .collect();

    config.backend.credentials = Credentials::new(
        non_empty(vars, CREDENTIAL_HOST_VAR).unwrap_or_default(),
        non_empty(vars, CREDENTIAL_USER_VAR).unwrap_or_default(),
        non_empty(vars, CREDENTIAL_PASSWORD_VAR).unwrap_or_default(),
    );

    if let Some(binary) = non_empty(vars, TOOL_VAR) {
        config.tool.binary = PathBuf::from(binary);
    }
    if let Some(secs) = parse_number::<u64>(vars, TOOL_TIMEOUT_VAR)? {
        config.tool.timeout_secs = secs;
    }
    if let Some(root) = non_empty(vars, MODULES_ROOT_VAR) {
        config.modules_root = PathBuf::from(root);
    }
    if let Some(dir) = non_empty(vars, WORKSPACE_DIR_VAR) {
        config.workspace.parent_dir = Some(PathBuf::from(dir));
    }
    if let Some(parallelism) = parse_number::<usize>(vars, PARALLELISM_VAR)? {
        if parallelism == 0 {
            return Err(ModgateError::Config {
                key: PARALLELISM_VAR.to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        config.parallelism = parallelism;
    }

    config.module_filter = non_empty(vars, MODULE_FILTER_VAR)
        .map(str::to_lowercase)
        .filter(|name| name != "all");

    config.module_paths = vars
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .filter_map(|(key, value)| {
            let module = key.strip_suffix(MODULE_PATH_SUFFIX)?;
            (!module.is_empty()).then(|| (module.to_lowercase(), PathBuf::from(value)))
        })
        .collect();

    debug!(
        skip_flags = config.gate.skip_flags.len(),
        skip_all_plans = config.gate.skip_all_plans,
        real_backend = config.gate.real_backend,
        allow_mutation = config.gate.allow_mutation,
        "Configuration read from environment"
    );

    Ok(config)
}
