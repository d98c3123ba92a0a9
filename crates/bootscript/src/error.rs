//! Boot script resolution errors.
//!
//! None of these reach a booting node: the controller turns every one of them
//! into a minimal or error script. They exist so each fallback is logged with
//! its cause.

use boot_client::ClientError;
use thiserror::Error;

use crate::provider::ProviderError;

/// Errors raised while resolving a boot script.
#[derive(Debug, Error)]
pub enum BootScriptError {
    /// No inventory record matches the identifier
    #[error("node not found for identifier {0}")]
    NodeNotFound(String),

    /// No configuration is eligible for the node in the requested profile or `default`
    #[error("no matching configuration for node {node} (profile {profile})")]
    NoMatchingConfiguration { node: String, profile: String },

    /// The fallback provider could not answer
    #[error("node provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The selected configuration cannot be turned into a script
    #[error("script generation failed: {0}")]
    RenderFailure(String),

    /// Resource store query failed
    #[error("resource store query failed: {0}")]
    Inventory(#[from] ClientError),

    /// Resource store query exceeded the configured timeout
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// Construction-time misconfiguration
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<ProviderError> for BootScriptError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NodeNotFound(identifier) => Self::NodeNotFound(identifier),
            ProviderError::Configuration(msg) => Self::Configuration(msg),
            other => Self::ProviderUnavailable(other.to_string()),
        }
    }
}
