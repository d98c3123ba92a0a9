//! ResourceClient trait for mocking
//!
//! The boot script controller only depends on this trait. The Kubernetes
//! client implements it for production, tests use the in-memory mock.

use crate::error::ClientError;
use crds::{BootConfiguration, Node};

/// Resource store operations used by the boot script service
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ResourceClient: Send + Sync {
    /// List every node in the inventory (single query, no pagination)
    async fn get_nodes(&self) -> Result<Vec<Node>, ClientError>;

    /// List every boot configuration
    async fn get_boot_configurations(&self) -> Result<Vec<BootConfiguration>, ClientError>;

    /// Create a boot configuration
    async fn create_boot_configuration(&self, config: &BootConfiguration) -> Result<BootConfiguration, ClientError>;

    /// Replace an existing boot configuration
    async fn update_boot_configuration(&self, config: &BootConfiguration) -> Result<BootConfiguration, ClientError>;

    /// Delete a boot configuration by name
    async fn delete_boot_configuration(&self, name: &str) -> Result<(), ClientError>;
}
