//! Mock ResourceClient for unit testing
//!
//! Stores nodes and boot configurations in memory, counts list calls so tests
//! can observe how much inventory work a request performed, and can be told
//! to fail or stall.

use crate::error::ClientError;
use crate::resource_trait::ResourceClient;
use crds::{BootConfiguration, Node};
use kube::ResourceExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock ResourceClient for testing
///
/// Collections keep insertion order, which is the order the controller
/// observes when scanning.
#[derive(Clone, Default, Debug)]
pub struct MockResourceClient {
    pub(crate) nodes: Arc<Mutex<Vec<Node>>>,
    pub(crate) configs: Arc<Mutex<Vec<BootConfiguration>>>,
    node_queries: Arc<AtomicUsize>,
    config_queries: Arc<AtomicUsize>,
    fail_queries: Arc<AtomicBool>,
    latency: Arc<Mutex<Option<Duration>>>,
}

impl MockResourceClient {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node to the mock store (for test setup)
    pub fn add_node(&self, node: Node) {
        self.nodes.lock().unwrap().push(node);
    }

    /// Add a boot configuration to the mock store (for test setup)
    pub fn add_boot_configuration(&self, config: BootConfiguration) {
        self.configs.lock().unwrap().push(config);
    }

    /// Number of `get_nodes` calls so far
    pub fn node_queries(&self) -> usize {
        self.node_queries.load(Ordering::SeqCst)
    }

    /// Number of `get_boot_configurations` calls so far
    pub fn config_queries(&self) -> usize {
        self.config_queries.load(Ordering::SeqCst)
    }

    /// Make every list call fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.fail_queries.store(failing, Ordering::SeqCst);
    }

    /// Delay every list call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap() = latency;
    }

    async fn simulate(&self) -> Result<(), ClientError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(ClientError::Api("resource store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceClient for MockResourceClient {
    async fn get_nodes(&self) -> Result<Vec<Node>, ClientError> {
        self.node_queries.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        Ok(self.nodes.lock().unwrap().clone())
    }

    async fn get_boot_configurations(&self) -> Result<Vec<BootConfiguration>, ClientError> {
        self.config_queries.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        Ok(self.configs.lock().unwrap().clone())
    }

    async fn create_boot_configuration(&self, config: &BootConfiguration) -> Result<BootConfiguration, ClientError> {
        let mut configs = self.configs.lock().unwrap();
        let name = config.name_any();
        if configs.iter().any(|c| c.name_any() == name) {
            return Err(ClientError::Api(format!("BootConfiguration {name} already exists")));
        }
        configs.push(config.clone());
        Ok(config.clone())
    }

    async fn update_boot_configuration(&self, config: &BootConfiguration) -> Result<BootConfiguration, ClientError> {
        let mut configs = self.configs.lock().unwrap();
        let name = config.name_any();
        let existing = configs
            .iter_mut()
            .find(|c| c.name_any() == name)
            .ok_or_else(|| ClientError::NotFound(format!("BootConfiguration {name} not found")))?;
        *existing = config.clone();
        Ok(config.clone())
    }

    async fn delete_boot_configuration(&self, name: &str) -> Result<(), ClientError> {
        let mut configs = self.configs.lock().unwrap();
        let before = configs.len();
        configs.retain(|c| c.name_any() != name);
        if configs.len() == before {
            return Err(ClientError::NotFound(format!("BootConfiguration {name} not found")));
        }
        Ok(())
    }
}
