//! Provider selection config
//!
//! Loaded from YAML:
//!
//! ```yaml
//! type: hsm
//! hsm_config:
//!   base_url: http://smd:27779
//!   timeout_secs: 10
//!   sync_interval_secs: 300
//! ```
//!
//! or
//!
//! ```yaml
//! type: yaml
//! yaml_config:
//!   yaml_file: /etc/boot-service/nodes.yaml
//!   sync_enabled: true
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::ProviderError;

const DEFAULT_SMD_URL: &str = "http://smd:27779";
const DEFAULT_NODES_FILE: &str = "/etc/boot-service/nodes.yaml";

/// Which provider variant is active and its settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// `hsm`, `yaml`, `none` or empty
    #[serde(rename = "type", default)]
    pub provider_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsm_config: Option<HsmConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaml_config: Option<YamlConfig>,
}

/// Settings for the hardware state manager provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsmConfig {
    #[serde(default = "default_smd_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_hsm_sync_secs")]
    pub sync_interval_secs: u64,
}

/// Settings for the local file provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YamlConfig {
    #[serde(default = "default_nodes_file")]
    pub yaml_file: PathBuf,

    #[serde(default)]
    pub sync_enabled: bool,

    #[serde(default = "default_yaml_sync_secs")]
    pub sync_interval_secs: u64,
}

fn default_smd_url() -> String {
    DEFAULT_SMD_URL.to_string()
}

fn default_nodes_file() -> PathBuf {
    PathBuf::from(DEFAULT_NODES_FILE)
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_hsm_sync_secs() -> u64 {
    300
}

fn default_yaml_sync_secs() -> u64 {
    30
}

impl Default for HsmConfig {
    fn default() -> Self {
        Self {
            base_url: default_smd_url(),
            token: None,
            timeout_secs: default_timeout_secs(),
            sync_interval_secs: default_hsm_sync_secs(),
        }
    }
}

impl HsmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }
}

impl Default for YamlConfig {
    fn default() -> Self {
        Self {
            yaml_file: default_nodes_file(),
            sync_enabled: false,
            sync_interval_secs: default_yaml_sync_secs(),
        }
    }
}

impl YamlConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }
}

/// Provider variant selected by `ProviderConfig::provider_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// External hardware state manager
    Hsm,
    /// Local YAML inventory file
    File,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hsm => "hsm",
            Self::File => "yaml",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProviderConfig {
    /// Parse a provider config document
    pub fn from_yaml(document: &str) -> Result<Self, ProviderError> {
        Ok(serde_yaml::from_str(document)?)
    }

    pub fn hsm(config: HsmConfig) -> Self {
        Self {
            provider_type: ProviderKind::Hsm.to_string(),
            hsm_config: Some(config),
            yaml_config: None,
        }
    }

    pub fn yaml(config: YamlConfig) -> Self {
        Self {
            provider_type: ProviderKind::File.to_string(),
            hsm_config: None,
            yaml_config: Some(config),
        }
    }

    /// The selected variant, or `None` for no provider
    ///
    /// Unrecognised types are logged and treated as no provider.
    pub fn kind(&self) -> Option<ProviderKind> {
        match self.provider_type.trim().to_ascii_lowercase().as_str() {
            "hsm" | "smd" => Some(ProviderKind::Hsm),
            "yaml" | "file" => Some(ProviderKind::File),
            "" | "none" => None,
            other => {
                warn!("Unknown provider type '{}', running without a node provider", other);
                None
            }
        }
    }
}
