//! Local YAML inventory provider
//!
//! Reads node records from a file of the form
//!
//! ```yaml
//! nodes:
//!   - xname: x1000c0s0b0n0
//!     hostname: nid000001
//!     nid: 1
//!     bootMac: aa:bb:cc:dd:ee:ff
//!     groups: [compute]
//! ```
//!
//! The file is read once at construction. When sync is enabled the worker
//! re-reads it whenever its modification time changes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use crds::{Node, NodeSpec};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::config::YamlConfig;
use super::error::ProviderError;
use super::snapshot::{NodeSnapshot, SnapshotCell};
use super::{HealthStatus, NodeProvider, ProviderStats, SyncOutcome, SyncProvider};
use crate::identifier::NodeIdentifier;

#[derive(Debug, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    nodes: Vec<InventoryEntry>,
}

/// One `nodes` entry. Every field is optional so a single incomplete record
/// does not reject the whole file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct InventoryEntry {
    xname: String,
    hostname: String,
    nid: Option<i32>,
    boot_mac: Option<String>,
    groups: Vec<String>,
}

impl From<InventoryEntry> for NodeSpec {
    fn from(entry: InventoryEntry) -> Self {
        Self {
            xname: entry.xname,
            hostname: entry.hostname,
            nid: entry.nid,
            boot_mac: entry.boot_mac,
            groups: entry.groups,
        }
    }
}

/// Parse an inventory document into node records
///
/// Entries without an xname are skipped.
pub fn parse_inventory(document: &str) -> Result<Vec<Node>, ProviderError> {
    let inventory: InventoryFile = serde_yaml::from_str(document)?;
    Ok(inventory
        .nodes
        .into_iter()
        .filter(|entry| {
            if entry.xname.trim().is_empty() {
                warn!("Skipping inventory entry without xname (nid {:?})", entry.nid);
                return false;
            }
            true
        })
        .map(|entry| {
            let spec = NodeSpec::from(entry);
            Node::new(&spec.xname.to_ascii_lowercase(), spec)
        })
        .collect())
}

/// Node provider backed by a YAML file
#[derive(Debug)]
pub struct FileProvider {
    path: PathBuf,
    snapshot: SnapshotCell,
    modified: Mutex<Option<SystemTime>>,
    sync_interval: Duration,
    reloads: AtomicU64,
    sync_errors: AtomicU64,
}

impl FileProvider {
    /// Read the inventory named by `config`
    ///
    /// Fails if the file is missing or malformed.
    pub async fn load(config: &YamlConfig) -> Result<Self, ProviderError> {
        let (nodes, modified) = read_inventory(&config.yaml_file).await?;
        info!("Loaded {} nodes from {}", nodes.len(), config.yaml_file.display());

        let snapshot = SnapshotCell::default();
        snapshot.store(NodeSnapshot::new(nodes));
        Ok(Self {
            path: config.yaml_file.clone(),
            snapshot,
            modified: Mutex::new(modified),
            sync_interval: config.sync_interval(),
            reloads: AtomicU64::new(0),
            sync_errors: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn last_modified(&self) -> Option<SystemTime> {
        *self.modified.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn reload_if_changed(&self) -> Result<SyncOutcome, ProviderError> {
        let current = tokio::fs::metadata(&self.path).await?.modified().ok();
        if current.is_some() && current == self.last_modified() {
            return Ok(SyncOutcome::Unchanged);
        }

        let (nodes, modified) = read_inventory(&self.path).await?;
        let count = nodes.len();
        self.snapshot.store(NodeSnapshot::new(nodes));
        *self.modified.lock().unwrap_or_else(PoisonError::into_inner) = modified;
        self.reloads.fetch_add(1, Ordering::Relaxed);
        info!("Reloaded {} nodes from {}", count, self.path.display());
        Ok(SyncOutcome::Refreshed(count))
    }
}

async fn read_inventory(path: &Path) -> Result<(Vec<Node>, Option<SystemTime>), ProviderError> {
    let modified = tokio::fs::metadata(path).await?.modified().ok();
    let document = tokio::fs::read_to_string(path).await?;
    Ok((parse_inventory(&document)?, modified))
}

#[async_trait]
impl NodeProvider for FileProvider {
    async fn resolve_node_by_identifier(&self, identifier: &NodeIdentifier) -> Result<Node, ProviderError> {
        let snapshot = self.snapshot.load();
        debug!("Searching {} file inventory nodes for {}", snapshot.len(), identifier);
        snapshot
            .find(identifier)
            .cloned()
            .ok_or_else(|| ProviderError::NodeNotFound(identifier.value().to_string()))
    }

    async fn health_check(&self) -> HealthStatus {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => HealthStatus::Ok,
            Err(e) => HealthStatus::Degraded(format!("inventory file {}: {e}", self.path.display())),
        }
    }

    fn stats(&self) -> ProviderStats {
        let snapshot = self.snapshot.load();
        ProviderStats::from([
            ("yaml_file".to_string(), json!(self.path.display().to_string())),
            ("node_count".to_string(), json!(snapshot.len())),
            (
                "last_sync".to_string(),
                json!(snapshot.refreshed_at().map(|t| t.to_rfc3339())),
            ),
            ("reloads".to_string(), json!(self.reloads.load(Ordering::Relaxed))),
            ("sync_errors".to_string(), json!(self.sync_errors.load(Ordering::Relaxed))),
        ])
    }
}

#[async_trait]
impl SyncProvider for FileProvider {
    async fn sync(&self) -> Result<SyncOutcome, ProviderError> {
        self.reload_if_changed().await.inspect_err(|_| {
            self.sync_errors.fetch_add(1, Ordering::Relaxed);
        })
    }

    fn sync_interval(&self) -> Duration {
        self.sync_interval
    }
}
