//! Primary node resolution against the resource store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use boot_client::{ClientError, ResourceClient};
use crds::Node;
use kube::ResourceExt;
use tracing::{debug, warn};

use crate::error::BootScriptError;
use crate::identifier::NodeIdentifier;

/// Run a resource store query, giving up after `limit`.
pub(crate) async fn bounded<T>(
    limit: Duration,
    what: &'static str,
    query: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, BootScriptError> {
    match tokio::time::timeout(limit, query).await {
        Ok(result) => result.map_err(BootScriptError::from),
        Err(_elapsed) => Err(BootScriptError::Timeout(what)),
    }
}

/// Scan `nodes` in order for the node `identifier` names.
///
/// First match wins. Inventories holding duplicate NIDs or MACs are reported
/// but not deduplicated.
pub fn find_node<'a>(nodes: &'a [Node], identifier: &NodeIdentifier) -> Option<&'a Node> {
    let mut matches = nodes.iter().filter(|node| identifier.matches(&node.spec));
    let first = matches.next()?;

    let duplicates = matches.count();
    if duplicates > 0 {
        warn!(
            "Identifier {} matches {} nodes, using {}",
            identifier,
            duplicates + 1,
            first.spec.xname
        );
    }
    Some(first)
}

/// Maps identifiers to node records from the primary inventory.
#[derive(Clone)]
pub struct NodeResolver {
    client: Arc<dyn ResourceClient>,
    query_timeout: Duration,
}

impl std::fmt::Debug for NodeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeResolver")
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

impl NodeResolver {
    pub fn new(client: Arc<dyn ResourceClient>, query_timeout: Duration) -> Self {
        Self { client, query_timeout }
    }

    /// Fetch the node collection and return the node `identifier` names.
    pub async fn resolve(&self, identifier: &NodeIdentifier) -> Result<Node, BootScriptError> {
        let nodes = bounded(self.query_timeout, "node inventory query", self.client.get_nodes()).await?;
        debug!("Scanning {} nodes for {}", nodes.len(), identifier);

        let node = find_node(&nodes, identifier)
            .ok_or_else(|| BootScriptError::NodeNotFound(identifier.value().to_string()))?;
        debug!("Resolved {} to node {}", identifier, node.name_any());
        Ok(node.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::classify;
    use boot_client::MockResourceClient;
    use crds::NodeSpec;

    fn node(name: &str, nid: i32, mac: &str) -> Node {
        Node::new(
            name,
            NodeSpec {
                xname: name.to_string(),
                nid: Some(nid),
                boot_mac: Some(mac.to_string()),
                ..Default::default()
            },
        )
    }

    fn resolver(mock: &MockResourceClient) -> NodeResolver {
        NodeResolver::new(Arc::new(mock.clone()), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_resolve_by_each_kind() {
        let mock = MockResourceClient::new();
        mock.add_node(node("x1000c0s0b0n0", 5, "aa:bb:cc:dd:ee:ff"));
        mock.add_node(node("x1000c0s0b0n1", 6, "aa:bb:cc:dd:ee:00"));
        let resolver = resolver(&mock);

        let by_xname = resolver.resolve(&classify("x1000c0s0b0n1")).await.unwrap();
        assert_eq!(by_xname.spec.nid, Some(6));

        let by_nid = resolver.resolve(&classify("5")).await.unwrap();
        assert_eq!(by_nid.spec.xname, "x1000c0s0b0n0");

        let by_mac = resolver.resolve(&classify("AA:BB:CC:DD:EE:00")).await.unwrap();
        assert_eq!(by_mac.spec.xname, "x1000c0s0b0n1");
    }

    #[tokio::test]
    async fn test_unknown_and_missing_identifiers() {
        let mock = MockResourceClient::new();
        mock.add_node(node("x1000c0s0b0n0", 5, "aa:bb:cc:dd:ee:ff"));
        let resolver = resolver(&mock);

        assert!(matches!(
            resolver.resolve(&classify("9999")).await,
            Err(BootScriptError::NodeNotFound(id)) if id == "9999"
        ));
        assert!(matches!(
            resolver.resolve(&classify("not-a-node")).await,
            Err(BootScriptError::NodeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_first_match_wins_on_duplicates() {
        let nodes = vec![
            node("x1000c0s0b0n0", 5, "aa:bb:cc:dd:ee:ff"),
            node("x1000c0s0b0n1", 5, "aa:bb:cc:dd:ee:00"),
        ];
        let found = find_node(&nodes, &classify("5")).unwrap();
        assert_eq!(found.spec.xname, "x1000c0s0b0n0");
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let mock = MockResourceClient::new();
        mock.set_failing(true);
        assert!(matches!(
            resolver(&mock).resolve(&classify("5")).await,
            Err(BootScriptError::Inventory(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out() {
        let mock = MockResourceClient::new();
        mock.add_node(node("x1000c0s0b0n0", 5, "aa:bb:cc:dd:ee:ff"));
        mock.set_latency(Some(Duration::from_secs(30)));

        assert!(matches!(
            resolver(&mock).resolve(&classify("5")).await,
            Err(BootScriptError::Timeout(_))
        ));
    }
}
