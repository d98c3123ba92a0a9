//! Resource store client
//!
//! Reads the node inventory and boot configurations the boot script service
//! resolves against, and passes boot configuration CRUD through for the
//! legacy API layer.
//!
//! # Example
//!
//! ```no_run
//! use boot_client::{KubeResourceClient, ResourceClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let kube_client = kube::Client::try_default().await?;
//! let client = KubeResourceClient::new(kube_client, "boot");
//!
//! let nodes = client.get_nodes().await?;
//! let configs = client.get_boot_configurations().await?;
//! println!("{} nodes, {} configurations", nodes.len(), configs.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod resource_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeResourceClient;
pub use error::ClientError;
pub use resource_trait::ResourceClient;
#[cfg(feature = "test-util")]
pub use mock::MockResourceClient;
