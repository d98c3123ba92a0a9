//! Node providers
//!
//! A provider is a secondary inventory source consulted when the resource
//! store does not know a node. Every provider can resolve identifiers, report
//! health and publish stats. Providers that keep a local copy of a remote
//! inventory also implement [`SyncProvider`], which the reconciliation worker
//! drives.
//!
//! Two variants exist: [`SmdProvider`] (hardware state manager over HTTP) and
//! [`FileProvider`] (YAML inventory on disk). [`ProviderHandle::from_config`]
//! is the only place that looks at variant-specific settings.

pub mod config;
pub mod error;
pub mod file;
pub mod smd;
pub mod snapshot;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crds::Node;
use serde::Serialize;
use tracing::info;

use crate::identifier::NodeIdentifier;

pub use config::{HsmConfig, ProviderConfig, ProviderKind, YamlConfig};
pub use error::ProviderError;
pub use file::FileProvider;
pub use smd::SmdProvider;
pub use snapshot::{NodeSnapshot, SnapshotCell};

/// Provider statistics, keyed by name
pub type ProviderStats = BTreeMap<String, serde_json::Value>;

/// Result of a health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded(String),
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("ok"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
        }
    }
}

/// What a sync pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A new snapshot with this many nodes was published
    Refreshed(usize),
    /// The backend had nothing new
    Unchanged,
}

/// Secondary inventory source
#[async_trait]
pub trait NodeProvider: Send + Sync {
    /// Find the node `identifier` names
    async fn resolve_node_by_identifier(&self, identifier: &NodeIdentifier) -> Result<Node, ProviderError>;

    async fn health_check(&self) -> HealthStatus;

    fn stats(&self) -> ProviderStats;
}

/// Provider that keeps a refreshable local view of its backend
#[async_trait]
pub trait SyncProvider: NodeProvider {
    /// Refresh the local view once
    ///
    /// Implementations must publish the new view atomically and must not hold
    /// a lock while talking to the backend.
    async fn sync(&self) -> Result<SyncOutcome, ProviderError>;

    /// Pause between successful syncs
    fn sync_interval(&self) -> Duration;
}

/// The configured provider and, when it supports it, its sync capability
#[derive(Clone)]
pub struct ProviderHandle {
    kind: ProviderKind,
    provider: Arc<dyn NodeProvider>,
    sync: Option<Arc<dyn SyncProvider>>,
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("kind", &self.kind)
            .field("sync_supported", &self.sync.is_some())
            .finish_non_exhaustive()
    }
}

impl ProviderHandle {
    /// Wrap a provider whose background sync is enabled
    pub fn syncing<P: SyncProvider + 'static>(kind: ProviderKind, provider: Arc<P>) -> Self {
        Self {
            kind,
            provider: Arc::clone(&provider) as Arc<dyn NodeProvider>,
            sync: Some(provider as Arc<dyn SyncProvider>),
        }
    }

    /// Wrap a provider that is only queried on demand
    pub fn on_demand<P: NodeProvider + 'static>(kind: ProviderKind, provider: Arc<P>) -> Self {
        Self {
            kind,
            provider,
            sync: None,
        }
    }

    /// Build the provider `config` selects
    ///
    /// Returns `Ok(None)` when no provider is configured or the type is not
    /// recognised. A file provider whose inventory cannot be read is an error.
    pub async fn from_config(config: &ProviderConfig) -> Result<Option<Self>, ProviderError> {
        let Some(kind) = config.kind() else {
            return Ok(None);
        };

        let handle = match kind {
            ProviderKind::Hsm => {
                let settings = config.hsm_config.clone().unwrap_or_else(|| {
                    info!("No hsm_config block, using defaults");
                    HsmConfig::default()
                });
                let provider = SmdProvider::from_config(&settings)?;
                info!("Initialized HSM provider at {}", settings.base_url);
                Self::syncing(kind, Arc::new(provider))
            }
            ProviderKind::File => {
                let settings = config.yaml_config.clone().unwrap_or_else(|| {
                    info!("No yaml_config block, using defaults");
                    YamlConfig::default()
                });
                let provider = Arc::new(FileProvider::load(&settings).await?);
                info!("Initialized YAML provider from file: {}", settings.yaml_file.display());
                if settings.sync_enabled {
                    Self::syncing(kind, provider)
                } else {
                    Self::on_demand(kind, provider)
                }
            }
        };
        Ok(Some(handle))
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn provider(&self) -> &Arc<dyn NodeProvider> {
        &self.provider
    }

    pub fn sync(&self) -> Option<&Arc<dyn SyncProvider>> {
        self.sync.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_no_provider_configured() {
        assert!(ProviderHandle::from_config(&ProviderConfig::default()).await.unwrap().is_none());

        let unknown = ProviderConfig {
            provider_type: "ldap".to_string(),
            ..Default::default()
        };
        assert!(ProviderHandle::from_config(&unknown).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hsm_handle_supports_sync() {
        let handle = ProviderHandle::from_config(&ProviderConfig::hsm(HsmConfig::default()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.kind(), ProviderKind::Hsm);
        assert!(handle.sync().is_some());
    }

    #[tokio::test]
    async fn test_yaml_handle_sync_follows_flag() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nodes:\n  - xname: x1000c0s0b0n0\n    nid: 1").unwrap();

        let mut settings = YamlConfig {
            yaml_file: file.path().to_path_buf(),
            ..Default::default()
        };
        let handle = ProviderHandle::from_config(&ProviderConfig::yaml(settings.clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.kind(), ProviderKind::File);
        assert!(handle.sync().is_none());

        settings.sync_enabled = true;
        let handle = ProviderHandle::from_config(&ProviderConfig::yaml(settings)).await.unwrap().unwrap();
        assert!(handle.sync().is_some());
    }

    #[tokio::test]
    async fn test_missing_inventory_file_is_fatal() {
        let config = ProviderConfig::yaml(YamlConfig {
            yaml_file: "/nonexistent/boot/nodes.yaml".into(),
            ..Default::default()
        });
        assert!(matches!(
            ProviderHandle::from_config(&config).await,
            Err(ProviderError::Io(_))
        ));
    }

    #[test]
    fn test_health_status_display() {
        assert_eq!(HealthStatus::Ok.to_string(), "ok");
        assert_eq!(
            HealthStatus::Degraded("smd down".to_string()).to_string(),
            "degraded: smd down"
        );
        assert!(!HealthStatus::Degraded(String::new()).is_ok());
    }
}
