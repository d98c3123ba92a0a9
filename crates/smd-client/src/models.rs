//! SMD API models
//!
//! Field names follow the SMD wire format (PascalCase with acronyms kept
//! upper-case), hence the explicit renames.

use serde::{Deserialize, Serialize};

/// Component state record (`/hsm/v2/State/Components`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Component {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Type", default)]
    pub component_type: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Enabled", default)]
    pub enabled: Option<bool>,
    #[serde(rename = "Role", default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "NID", default, skip_serializing_if = "Option::is_none")]
    pub nid: Option<i32>,
}

/// Wrapper returned by the component state endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComponentArray {
    #[serde(rename = "Components", default)]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterfaceAddress {
    #[serde(rename = "IPAddress")]
    pub ip_address: String,
    #[serde(rename = "Network", default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

/// Ethernet interface inventory record (`/hsm/v2/Inventory/EthernetInterfaces`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EthernetInterface {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "MACAddress")]
    pub mac_address: String,
    #[serde(rename = "ComponentID", default)]
    pub component_id: String,
    #[serde(rename = "Type", default)]
    pub component_type: String,
    #[serde(rename = "IPAddresses", default)]
    pub ip_addresses: Vec<InterfaceAddress>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GroupMembers {
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Group record (`/hsm/v2/groups`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Group {
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub members: GroupMembers,
}

impl Group {
    /// Whether `xname` is a member of this group
    pub fn contains(&self, xname: &str) -> bool {
        self.members.ids.iter().any(|id| id == xname)
    }
}
