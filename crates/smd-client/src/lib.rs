//! Hardware State Manager (SMD) REST API Client
//!
//! Reads node components, ethernet interfaces and group memberships from the
//! cluster's hardware state manager, the authoritative inventory the boot
//! service falls back to when its own resource store does not know a node.
//!
//! # Example
//!
//! ```no_run
//! use smd_client::SmdClient;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SmdClient::new(
//!     "http://smd:27779".to_string(),
//!     None,
//!     Duration::from_secs(10),
//! )?;
//!
//! client.ready().await?;
//! let components = client.get_node_components().await?;
//! let interfaces = client.get_ethernet_interfaces().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod smd_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::SmdClient;
pub use common::HttpClient;
pub use error::SmdError;
pub use models::*;
pub use smd_trait::SmdClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockSmdClient;
