//! BootConfiguration CRD
//!
//! Associates a set of target nodes (host patterns, MACs, NIDs, groups) with
//! a kernel, initrd and kernel parameters for a given boot profile.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Profile used when a configuration or a request does not name one
pub const DEFAULT_PROFILE: &str = "default";

/// Lowest and highest accepted tie-break priority
pub const PRIORITY_RANGE: std::ops::RangeInclusive<i32> = 0..=100;

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "boot.dcops.microscaler.io",
    version = "v1alpha1",
    kind = "BootConfiguration",
    namespaced,
    status = "BootConfigurationStatus",
    printcolumn = r#"{"name":"Profile","type":"string","jsonPath":".spec.profile"}"#,
    printcolumn = r#"{"name":"Priority","type":"integer","jsonPath":".spec.priority"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BootConfigurationSpec {
    /// Host patterns matched against a node's XName or hostname.
    /// Either an exact name or `*`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,

    /// Boot MAC addresses (compared case-insensitively)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub macs: Vec<String>,

    /// Node IDs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nids: Vec<i32>,

    /// Inventory group labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Boot profile this configuration belongs to (empty means `default`)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub profile: String,

    /// Kernel image URL or path
    pub kernel: String,

    /// Initrd image URL or path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initrd: Option<String>,

    /// Kernel command-line parameters
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub params: String,

    /// Tie-break priority in `0..=100`, higher wins
    #[serde(default)]
    pub priority: i32,
}

impl BootConfigurationSpec {
    /// Profile this configuration is scoped to, with the empty profile
    /// normalised to [`DEFAULT_PROFILE`].
    #[must_use]
    pub fn effective_profile(&self) -> &str {
        if self.profile.is_empty() {
            DEFAULT_PROFILE
        } else {
            &self.profile
        }
    }

    /// Whether any targeting dimension is populated.
    ///
    /// A configuration without targeting acts as a catch-all.
    #[must_use]
    pub fn has_targeting(&self) -> bool {
        !(self.hosts.is_empty()
            && self.macs.is_empty()
            && self.nids.is_empty()
            && self.groups.is_empty())
    }
}

/// Lifecycle phase reported by the resource store
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum BootConfigurationPhase {
    /// Accepted, not yet applied to any node
    #[default]
    Pending,

    /// Applied to at least one node
    Active,

    /// Rejected or failed to apply
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BootConfigurationStatus {
    /// Current phase
    #[serde(default)]
    pub phase: BootConfigurationPhase,

    /// When the configuration was last applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,

    /// Nodes currently booting with this configuration
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_to: Vec<String>,

    /// Error message if the configuration failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
