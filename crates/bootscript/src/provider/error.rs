//! Node provider errors

use smd_client::SmdError;
use thiserror::Error;

/// Errors raised by node providers
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend does not know the identifier
    #[error("node not found in provider inventory: {0}")]
    NodeNotFound(String),

    /// The backend could not be reached or answered with an error
    #[error("provider backend unavailable: {0}")]
    Unavailable(String),

    /// The provider was configured with unusable settings
    #[error("provider configuration error: {0}")]
    Configuration(String),

    /// Local inventory file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Local inventory file or provider config is not valid YAML
    #[error("parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl From<SmdError> for ProviderError {
    fn from(err: SmdError) -> Self {
        match err {
            SmdError::InvalidConfig(msg) => Self::Configuration(msg),
            other => Self::Unavailable(other.to_string()),
        }
    }
}
