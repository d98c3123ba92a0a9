//! Hardware state manager backed provider
//!
//! Keeps a snapshot of the SMD node inventory. The snapshot is filled by the
//! reconciliation worker, or lazily on the first lookup when no sync has run
//! yet.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use crds::{Node, NodeSpec};
use serde_json::json;
use smd_client::{Component, EthernetInterface, Group, SmdClient, SmdClientTrait};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::config::HsmConfig;
use super::error::ProviderError;
use super::snapshot::{NodeSnapshot, SnapshotCell};
use super::{HealthStatus, NodeProvider, ProviderStats, SyncOutcome, SyncProvider};
use crate::identifier::NodeIdentifier;

/// Node provider backed by the hardware state manager
pub struct SmdProvider {
    client: Arc<dyn SmdClientTrait>,
    snapshot: SnapshotCell,
    /// Serialises the lazy first fill so concurrent lookups share one fetch
    first_fill: Mutex<()>,
    sync_interval: Duration,
    syncs: AtomicU64,
    sync_errors: AtomicU64,
}

impl std::fmt::Debug for SmdProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmdProvider")
            .field("base_url", &self.client.base_url())
            .field("sync_interval", &self.sync_interval)
            .finish_non_exhaustive()
    }
}

impl SmdProvider {
    pub fn new(client: Arc<dyn SmdClientTrait>, sync_interval: Duration) -> Self {
        Self {
            client,
            snapshot: SnapshotCell::default(),
            first_fill: Mutex::new(()),
            sync_interval,
            syncs: AtomicU64::new(0),
            sync_errors: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &HsmConfig) -> Result<Self, ProviderError> {
        let client = SmdClient::new(config.base_url.clone(), config.token.clone(), config.timeout())?;
        Ok(Self::new(Arc::new(client), config.sync_interval()))
    }

    /// Pull components, interfaces and groups and publish a new snapshot
    async fn refresh(&self) -> Result<usize, ProviderError> {
        let fetched = tokio::try_join!(
            self.client.get_node_components(),
            self.client.get_ethernet_interfaces(),
            self.client.get_groups(),
        );

        let (components, interfaces, groups) = match fetched {
            Ok(parts) => parts,
            Err(e) => {
                self.sync_errors.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        let nodes = build_nodes(components, &interfaces, &groups);
        let count = nodes.len();
        self.snapshot.store(NodeSnapshot::new(nodes));
        self.syncs.fetch_add(1, Ordering::Relaxed);
        debug!("SMD snapshot refreshed with {} nodes", count);
        Ok(count)
    }

    /// Current snapshot, fetching the inventory first if nothing has been
    /// loaded yet
    async fn filled_snapshot(&self, identifier: &NodeIdentifier) -> Result<Arc<NodeSnapshot>, ProviderError> {
        let snapshot = self.snapshot.load();
        if snapshot.refreshed_at().is_some() {
            return Ok(snapshot);
        }

        let _fill = self.first_fill.lock().await;
        let snapshot = self.snapshot.load();
        if snapshot.refreshed_at().is_some() {
            return Ok(snapshot);
        }
        info!("SMD snapshot empty, fetching inventory for {}", identifier);
        self.refresh().await?;
        Ok(self.snapshot.load())
    }
}

/// Assemble node records from SMD components, interfaces and groups
///
/// The boot MAC is the first interface SMD lists for the component.
pub(crate) fn build_nodes(components: Vec<Component>, interfaces: &[EthernetInterface], groups: &[Group]) -> Vec<Node> {
    let mut macs: HashMap<&str, &str> = HashMap::new();
    for iface in interfaces {
        if !iface.mac_address.is_empty() {
            macs.entry(iface.component_id.as_str()).or_insert(iface.mac_address.as_str());
        }
    }

    components
        .into_iter()
        .filter(|c| !c.id.is_empty())
        .map(|component| {
            let hostname = component
                .nid
                .map_or_else(|| component.id.clone(), |nid| format!("nid{nid:06}"));
            let spec = NodeSpec {
                boot_mac: macs.get(component.id.as_str()).map(|mac| mac.to_ascii_lowercase()),
                groups: groups
                    .iter()
                    .filter(|g| g.contains(&component.id))
                    .map(|g| g.label.clone())
                    .collect(),
                hostname,
                nid: component.nid,
                xname: component.id,
            };
            Node::new(&spec.xname.to_ascii_lowercase(), spec)
        })
        .collect()
}

#[async_trait]
impl NodeProvider for SmdProvider {
    async fn resolve_node_by_identifier(&self, identifier: &NodeIdentifier) -> Result<Node, ProviderError> {
        self.filled_snapshot(identifier)
            .await?
            .find(identifier)
            .cloned()
            .ok_or_else(|| ProviderError::NodeNotFound(identifier.value().to_string()))
    }

    async fn health_check(&self) -> HealthStatus {
        match self.client.ready().await {
            Ok(()) => HealthStatus::Ok,
            Err(e) => {
                warn!("SMD health check failed: {}", e);
                HealthStatus::Degraded(e.to_string())
            }
        }
    }

    fn stats(&self) -> ProviderStats {
        let snapshot = self.snapshot.load();
        ProviderStats::from([
            ("base_url".to_string(), json!(self.client.base_url())),
            ("node_count".to_string(), json!(snapshot.len())),
            (
                "last_sync".to_string(),
                json!(snapshot.refreshed_at().map(|t| t.to_rfc3339())),
            ),
            ("syncs".to_string(), json!(self.syncs.load(Ordering::Relaxed))),
            ("sync_errors".to_string(), json!(self.sync_errors.load(Ordering::Relaxed))),
            ("sync_interval_secs".to_string(), json!(self.sync_interval.as_secs())),
        ])
    }
}

#[async_trait]
impl SyncProvider for SmdProvider {
    async fn sync(&self) -> Result<SyncOutcome, ProviderError> {
        self.refresh().await.map(SyncOutcome::Refreshed)
    }

    fn sync_interval(&self) -> Duration {
        self.sync_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::classify;
    use smd_client::MockSmdClient;

    fn provider(mock: &MockSmdClient) -> SmdProvider {
        SmdProvider::new(Arc::new(mock.clone()), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_build_nodes_joins_inventory() {
        let mock = MockSmdClient::new("http://smd");
        mock.add_node("x1000c0s0b0n0", Some(7), Some("AA:BB:CC:DD:EE:FF"));
        mock.add_node("x1000c0s0b1n0", None, None);
        mock.add_group("compute", &["x1000c0s0b0n0"]);

        let components = mock.get_node_components().await.unwrap();
        let interfaces = mock.get_ethernet_interfaces().await.unwrap();
        let groups = mock.get_groups().await.unwrap();
        let nodes = build_nodes(components, &interfaces, &groups);

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].spec.hostname, "nid000007");
        assert_eq!(nodes[0].spec.boot_mac.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(nodes[0].spec.groups, vec!["compute".to_string()]);
        assert_eq!(nodes[1].spec.hostname, "x1000c0s0b1n0");
        assert!(nodes[1].spec.boot_mac.is_none());
    }

    #[tokio::test]
    async fn test_first_lookup_fetches_once() {
        let mock = MockSmdClient::new("http://smd");
        mock.add_node("x1000c0s0b0n0", Some(7), Some("aa:bb:cc:dd:ee:ff"));
        let provider = provider(&mock);

        let node = provider.resolve_node_by_identifier(&classify("7")).await.unwrap();
        assert_eq!(node.spec.xname, "x1000c0s0b0n0");
        let node = provider
            .resolve_node_by_identifier(&classify("aa:bb:cc:dd:ee:ff"))
            .await
            .unwrap();
        assert_eq!(node.spec.nid, Some(7));

        assert_eq!(mock.component_fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_first_lookups_share_one_fetch() {
        let mock = MockSmdClient::new("http://smd");
        mock.add_node("x1000c0s0b0n0", Some(7), Some("aa:bb:cc:dd:ee:ff"));
        mock.add_node("x1000c0s0b0n1", Some(8), None);
        mock.set_latency(Some(Duration::from_millis(200)));
        let provider = provider(&mock);

        let (id_a, id_b, id_c) = (classify("7"), classify("8"), classify("aa:bb:cc:dd:ee:ff"));
        let (a, b, c) = tokio::join!(
            provider.resolve_node_by_identifier(&id_a),
            provider.resolve_node_by_identifier(&id_b),
            provider.resolve_node_by_identifier(&id_c),
        );
        assert_eq!(a.unwrap().spec.xname, "x1000c0s0b0n0");
        assert_eq!(b.unwrap().spec.xname, "x1000c0s0b0n1");
        assert_eq!(c.unwrap().spec.nid, Some(7));
        assert_eq!(mock.component_fetches(), 1);
    }

    #[tokio::test]
    async fn test_failed_first_fill_is_retried() {
        let mock = MockSmdClient::new("http://smd");
        mock.add_node("x1000c0s0b0n0", Some(7), None);
        mock.set_unavailable(true);
        let provider = provider(&mock);

        assert!(matches!(
            provider.resolve_node_by_identifier(&classify("7")).await,
            Err(ProviderError::Unavailable(_))
        ));
        mock.set_unavailable(false);
        assert!(provider.resolve_node_by_identifier(&classify("7")).await.is_ok());
        assert_eq!(mock.component_fetches(), 2);
    }

    #[tokio::test]
    async fn test_unknown_node_after_sync() {
        let mock = MockSmdClient::new("http://smd");
        mock.add_node("x1000c0s0b0n0", Some(7), None);
        let provider = provider(&mock);
        assert_eq!(provider.sync().await.unwrap(), SyncOutcome::Refreshed(1));

        assert!(matches!(
            provider.resolve_node_by_identifier(&classify("9999")).await,
            Err(ProviderError::NodeNotFound(id)) if id == "9999"
        ));
        assert_eq!(mock.component_fetches(), 1);
    }

    #[tokio::test]
    async fn test_outage_keeps_previous_snapshot() {
        let mock = MockSmdClient::new("http://smd");
        mock.add_node("x1000c0s0b0n0", Some(7), None);
        let provider = provider(&mock);
        provider.sync().await.unwrap();

        mock.set_unavailable(true);
        assert!(matches!(provider.sync().await, Err(ProviderError::Unavailable(_))));
        assert!(provider.resolve_node_by_identifier(&classify("7")).await.is_ok());
        assert!(!provider.health_check().await.is_ok());

        let stats = provider.stats();
        assert_eq!(stats["node_count"], json!(1));
        assert_eq!(stats["sync_errors"], json!(1));
        assert_eq!(stats["base_url"], json!("http://smd"));
    }
}
