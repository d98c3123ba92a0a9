//! Mock SmdClient for unit testing
//!
//! Serves components, interfaces and groups from memory and counts how many
//! full inventory fetches were made.

use crate::error::SmdError;
use crate::models::*;
use crate::smd_trait::SmdClientTrait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock SmdClient for testing
#[derive(Clone, Debug)]
pub struct MockSmdClient {
    pub(crate) base_url: String,
    pub(crate) components: Arc<Mutex<Vec<Component>>>,
    pub(crate) interfaces: Arc<Mutex<Vec<EthernetInterface>>>,
    pub(crate) groups: Arc<Mutex<Vec<Group>>>,
    unavailable: Arc<AtomicBool>,
    component_fetches: Arc<AtomicUsize>,
    latency: Arc<Mutex<Option<Duration>>>,
}

impl MockSmdClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            components: Arc::new(Mutex::new(Vec::new())),
            interfaces: Arc::new(Mutex::new(Vec::new())),
            groups: Arc::new(Mutex::new(Vec::new())),
            unavailable: Arc::new(AtomicBool::new(false)),
            component_fetches: Arc::new(AtomicUsize::new(0)),
            latency: Arc::new(Mutex::new(None)),
        }
    }

    /// Add a node component plus its boot interface (for test setup)
    pub fn add_node(&self, xname: &str, nid: Option<i32>, mac: Option<&str>) {
        self.components.lock().unwrap().push(Component {
            id: xname.to_string(),
            component_type: "Node".to_string(),
            state: "Ready".to_string(),
            enabled: Some(true),
            role: Some("Compute".to_string()),
            nid,
        });
        if let Some(mac) = mac {
            self.interfaces.lock().unwrap().push(EthernetInterface {
                id: mac.replace(':', ""),
                mac_address: mac.to_string(),
                component_id: xname.to_string(),
                component_type: "Node".to_string(),
                ..Default::default()
            });
        }
    }

    /// Add a group (for test setup)
    pub fn add_group(&self, label: &str, members: &[&str]) {
        self.groups.lock().unwrap().push(Group {
            label: label.to_string(),
            members: GroupMembers {
                ids: members.iter().map(|m| (*m).to_string()).collect(),
            },
            ..Default::default()
        });
    }

    /// Simulate an outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of component list calls so far
    pub fn component_fetches(&self) -> usize {
        self.component_fetches.load(Ordering::SeqCst)
    }

    /// Delay every inventory call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap() = latency;
    }

    async fn simulate(&self) -> Result<(), SmdError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.check_available()
    }

    fn check_available(&self) -> Result<(), SmdError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SmdError::Api("503 Service Unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SmdClientTrait for MockSmdClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn ready(&self) -> Result<(), SmdError> {
        self.check_available()
    }

    async fn get_node_components(&self) -> Result<Vec<Component>, SmdError> {
        self.component_fetches.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        Ok(self.components.lock().unwrap().clone())
    }

    async fn get_ethernet_interfaces(&self) -> Result<Vec<EthernetInterface>, SmdError> {
        self.simulate().await?;
        Ok(self.interfaces.lock().unwrap().clone())
    }

    async fn get_groups(&self) -> Result<Vec<Group>, SmdError> {
        self.simulate().await?;
        Ok(self.groups.lock().unwrap().clone())
    }
}
