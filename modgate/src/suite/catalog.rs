//! Built-in catalog of the router modules.

use super::ModuleUnderTest;
use crate::contracts::ModuleContract;
use std::collections::BTreeSet;
use std::path::Path;

/// Module names in catalog order.
pub const BUILTIN_MODULES: [&str; 6] = ["vlan", "firewall", "dns", "ntp", "backup", "monitoring"];

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn contract(required: &[&str], optional: &[&str], outputs: &[&str]) -> ModuleContract {
    ModuleContract {
        required_inputs: names(required),
        optional_inputs: names(optional),
        outputs: names(outputs),
    }
}

fn vlan(root: &Path) -> ModuleUnderTest {
    let contract = contract(
        &[
            "vlan_id",
            "bridge_name",
            "vlan_cidr",
            "gateway_ip",
            "interface_lists",
            "dns_domain",
            "wan_interface",
        ],
        &[
            "description",
            "disabled",
            "untagged_interfaces",
            "tagged_interfaces",
            "enable_dhcp",
            "dhcp_range_start",
            "dhcp_range_end",
            "dhcp_lease_time",
            "dhcp_dns_servers",
            "dhcp_ntp_servers",
            "dhcp_wins_servers",
            "enable_dhcp_dns_update",
            "static_dhcp_leases",
            "address_lists",
            "security_zone",
            "isolate_vlan",
            "internet_access",
            "use_global_nat",
            "permitted_traffic",
            "custom_firewall_rules",
            "log_firewall",
            "log_prefix",
            "allow_dns",
            "allow_ntp",
            "allow_winbox",
            "allow_ssh",
        ],
        &[
            "vlan_name",
            "vlan_id",
            "network_cidr",
            "gateway_ip",
            "dhcp_range",
            "domain",
            "security_zone",
            "interface_id",
            "is_management",
            "is_dmz",
            "firewall_rule_sets",
        ],
    );

    ModuleUnderTest::new("vlan", root.join("vlan"), contract)
        .with_required_files(["main.tf", "variables.tf", "outputs.tf", "dhcp.tf", "firewall.tf"])
        .with_variables([
            ("vlan_id", "999"),
            ("bridge_name", "\"bridge0\""),
            ("vlan_cidr", "\"10.99.9.0/24\""),
            ("gateway_ip", "\"10.99.9.1\""),
            ("interface_lists", "[\"vlans\"]"),
            ("dns_domain", "\"test.example.com\""),
            ("wan_interface", "\"ether1\""),
            ("security_zone", "\"internal\""),
            ("disabled", "true"),
        ])
        .with_expected_resources([
            "routeros_interface_vlan",
            "routeros_ip_address",
            r"vlan_id\s*=\s*999",
            r#"name\s*=\s*"vlan999""#,
        ])
        .with_exported_outputs(["vlan_name", "vlan_id", "network_cidr", "gateway_ip"])
}

fn basic(root: &Path, name: &str, contract: ModuleContract) -> ModuleUnderTest {
    ModuleUnderTest::new(name, root.join(name), contract)
        .with_required_files(["main.tf", "variables.tf", "outputs.tf"])
}

/// The six router modules with their documented contracts.
pub(super) fn builtin(root: &Path) -> Vec<ModuleUnderTest> {
    vec![
        vlan(root),
        basic(
            root,
            "firewall",
            contract(
                &["wan_interface", "rule_sets"],
                &[
                    "enable_logging",
                    "log_prefix",
                    "enable_global_nat",
                    "ensure_default_drops",
                    "custom_lists",
                    "enable_bogon_blocking",
                    "security_zones",
                ],
                &["address_lists"],
            ),
        ),
        basic(
            root,
            "dns",
            contract(
                &[],
                &["upstream_dns_servers", "allow_remote_requests", "cache_size"],
                &["dns_servers", "cache_size"],
            ),
        ),
        basic(
            root,
            "ntp",
            contract(&[], &["ntp_servers", "timezone"], &["ntp_servers", "timezone"]),
        ),
        basic(
            root,
            "backup",
            contract(
                &[],
                &["backup_name", "backup_password", "backup_interval"],
                &["backup_schedule", "backup_name_pattern"],
            ),
        ),
        basic(
            root,
            "monitoring",
            contract(
                &[],
                &["snmp_community", "snmp_contact", "snmp_location", "allowed_networks"],
                &["snmp_enabled", "snmp_community"],
            ),
        ),
    ]
}
