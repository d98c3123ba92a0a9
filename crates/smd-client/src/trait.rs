//! SmdClient trait for mocking
//!
//! The concrete SmdClient implements this trait, and tests can use the mock.

use crate::error::SmdError;
use crate::models::*;

/// Trait for SMD API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait SmdClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Readiness probe
    async fn ready(&self) -> Result<(), SmdError>;

    async fn get_node_components(&self) -> Result<Vec<Component>, SmdError>;
    async fn get_ethernet_interfaces(&self) -> Result<Vec<EthernetInterface>, SmdError>;
    async fn get_groups(&self) -> Result<Vec<Group>, SmdError>;
}
