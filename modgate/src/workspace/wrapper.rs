//! Wrapper configuration rendering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Label of the module block inside the wrapper.
pub const MODULE_LABEL: &str = "test_module";

/// The provider the wrapper declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Local provider name.
    #[serde(default = "default_local_name")]
    pub local_name: String,
    /// Registry source address.
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_local_name() -> String {
    "routeros".to_string()
}

fn default_source() -> String {
    "terraform-routeros/routeros".to_string()
}

impl Default for ProviderSpec {
    fn default() -> Self {
        Self {
            local_name: default_local_name(),
            source: default_source(),
        }
    }
}

/// Renders the wrapper that instantiates the module under test.
///
/// Binding values are written verbatim: they are expected to be literals
/// already quoted for the target language.
#[must_use]
pub fn render_wrapper(
    provider: &ProviderSpec,
    module_source: &str,
    bindings: &BTreeMap<String, String>,
    outputs: &[String],
) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"
terraform {{
  required_providers {{
    {name} = {{
      source = "{source}"
    }}
  }}
}}

provider "{name}" {{
  # Credentials from environment variables
}}

module "{MODULE_LABEL}" {{
  source = "{module_source}"

"#,
        name = provider.local_name,
        source = provider.source,
    );

    for (key, value) in bindings {
        let _ = writeln!(out, "  {key} = {value}");
    }

    out.push_str("}\n\n# Output all module outputs\n");

    for output in outputs {
        let _ = writeln!(
            out,
            "output \"{output}\" {{\n  value = module.{MODULE_LABEL}.{output}\n}}"
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_wrapper() {
        let bindings: BTreeMap<String, String> = [
            ("vlan_id".to_string(), "999".to_string()),
            ("bridge_name".to_string(), "\"bridge0\"".to_string()),
        ]
        .into();
        let rendered = render_wrapper(
            &ProviderSpec::default(),
            "/srv/modules/vlan",
            &bindings,
            &["vlan_name".to_string()],
        );

        let expected = r#"
terraform {
  required_providers {
    routeros = {
      source = "terraform-routeros/routeros"
    }
  }
}

provider "routeros" {
  # Credentials from environment variables
}

module "test_module" {
  source = "/srv/modules/vlan"

  bridge_name = "bridge0"
  vlan_id = 999
}

# Output all module outputs
output "vlan_name" {
  value = module.test_module.vlan_name
}
"#;
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_values_are_not_escaped() {
        let bindings: BTreeMap<String, String> =
            [("interface_lists".to_string(), "[\"vlans\"".to_string())].into();
        let rendered = render_wrapper(&ProviderSpec::default(), "m", &bindings, &[]);
        assert!(rendered.contains("  interface_lists = [\"vlans\"\n"));
    }
}
