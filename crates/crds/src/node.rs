//! Node CRD
//!
//! Inventory record for one compute node. Owned by the inventory source; the
//! boot service only reads it.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "boot.dcops.microscaler.io",
    version = "v1alpha1",
    kind = "Node",
    namespaced,
    printcolumn = r#"{"name":"XName","type":"string","jsonPath":".spec.xname"}"#,
    printcolumn = r#"{"name":"NID","type":"integer","jsonPath":".spec.nid"}"#,
    printcolumn = r#"{"name":"MAC","type":"string","jsonPath":".spec.bootMac"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    /// Hardware location name (e.g. `x1000c0s0b0n0`)
    pub xname: String,

    /// Hostname
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,

    /// Numeric node ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nid: Option<i32>,

    /// MAC address of the boot interface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boot_mac: Option<String>,

    /// Inventory group memberships
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl NodeSpec {
    /// Case-insensitive comparison against the boot MAC.
    #[must_use]
    pub fn has_boot_mac(&self, mac: &str) -> bool {
        self.boot_mac
            .as_deref()
            .is_some_and(|boot_mac| boot_mac.eq_ignore_ascii_case(mac))
    }

    /// Whether the node belongs to `group`.
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
