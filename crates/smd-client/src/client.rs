//! SMD API client
//!
//! Implements the read side of the Hardware State Manager REST API used for
//! node resolution: `/hsm/v2/State/Components`,
//! `/hsm/v2/Inventory/EthernetInterfaces` and `/hsm/v2/groups`.

use crate::common::HttpClient;
use crate::error::SmdError;
use crate::models::*;
use crate::smd_trait::SmdClientTrait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const READY_PATH: &str = "/hsm/v2/service/ready";
const COMPONENTS_PATH: &str = "/hsm/v2/State/Components";
const ETHERNET_INTERFACES_PATH: &str = "/hsm/v2/Inventory/EthernetInterfaces";
const GROUPS_PATH: &str = "/hsm/v2/groups";

/// SMD API client
#[derive(Debug, Clone)]
pub struct SmdClient {
    http: HttpClient,
}

impl SmdClient {
    /// Create a new SMD client
    ///
    /// # Arguments
    /// * `base_url` - SMD base URL (e.g., "http://smd:27779")
    /// * `token` - Optional bearer token
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: String, token: Option<String>, timeout: Duration) -> Result<Self, SmdError> {
        if base_url.is_empty() {
            return Err(SmdError::InvalidConfig("SMD base URL is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SmdError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, &base_url, token),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Check that SMD is up and serving
    pub async fn ready(&self) -> Result<(), SmdError> {
        self.http.probe(READY_PATH).await
    }

    /// Fetch every component of type `Node`
    pub async fn get_node_components(&self) -> Result<Vec<Component>, SmdError> {
        debug!("Fetching node components from SMD");
        let path = HttpClient::with_query(COMPONENTS_PATH, &[("type", "Node")]);
        let array: ComponentArray = self.http.get(&path).await?;
        Ok(array.components)
    }

    /// Fetch every node ethernet interface
    pub async fn get_ethernet_interfaces(&self) -> Result<Vec<EthernetInterface>, SmdError> {
        debug!("Fetching ethernet interfaces from SMD");
        let path = HttpClient::with_query(ETHERNET_INTERFACES_PATH, &[("Type", "Node")]);
        self.http.get(&path).await
    }

    /// Fetch every group with its members
    pub async fn get_groups(&self) -> Result<Vec<Group>, SmdError> {
        debug!("Fetching groups from SMD");
        self.http.get(GROUPS_PATH).await
    }
}

#[async_trait::async_trait]
impl SmdClientTrait for SmdClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn ready(&self) -> Result<(), SmdError> {
        self.ready().await
    }

    async fn get_node_components(&self) -> Result<Vec<Component>, SmdError> {
        self.get_node_components().await
    }

    async fn get_ethernet_interfaces(&self) -> Result<Vec<EthernetInterface>, SmdError> {
        self.get_ethernet_interfaces().await
    }

    async fn get_groups(&self) -> Result<Vec<Group>, SmdError> {
        self.get_groups().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_base_url_rejected() {
        let result = SmdClient::new(String::new(), None, Duration::from_secs(1));
        assert!(matches!(result, Err(SmdError::InvalidConfig(_))));
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = SmdClient::new("http://smd:27779/".to_string(), None, Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://smd:27779");
    }
}
