//! iPXE boot script resolution
//!
//! Turns an ambiguous node identifier (xname, NID or MAC) and an optional
//! profile into an iPXE script:
//!
//! 1. [`identifier::classify`] types the identifier
//! 2. [`resolver::NodeResolver`] finds the node in the resource store, with an
//!    optional [`provider::NodeProvider`] as a second source
//! 3. [`matcher`] scores boot configurations and picks one
//! 4. [`render`] produces the script, or a minimal/error fallback
//! 5. [`cache::ScriptCache`] remembers rendered scripts for a TTL
//!
//! [`controller::BootScriptController`] ties these together, and
//! [`sync`] keeps sync-capable providers fresh in the background.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use boot_client::KubeResourceClient;
//! use bootscript::{BootScriptController, ControllerSettings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let kube_client = kube::Client::try_default().await?;
//! let client = Arc::new(KubeResourceClient::new(kube_client, "boot"));
//! let controller = BootScriptController::new(client, ControllerSettings::default());
//!
//! let script = controller.generate_boot_script("x1000c0s0b0n0", "").await;
//! println!("{script}");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod controller;
pub mod error;
pub mod identifier;
pub mod matcher;
pub mod provider;
pub mod render;
pub mod resolver;
pub mod sync;

pub use cache::{CacheStats, ScriptCache};
pub use controller::{BootScriptController, ControllerSettings};
pub use error::BootScriptError;
pub use identifier::{IdentifierKind, NodeIdentifier, classify};
pub use provider::{HealthStatus, NodeProvider, ProviderConfig, ProviderError, ProviderHandle, ProviderKind, SyncProvider};
pub use render::{BootScript, ScriptKind};
