//! Server error types.
//!
//! Only startup can fail. Once serving, every boot request gets a script.

use bootscript::ProviderError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that stop the boot script server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Node provider could not be built
    #[error("Node provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Listener or config file IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
