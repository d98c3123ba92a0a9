//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bootscript::{ControllerSettings, ProviderConfig};
use tracing::info;

use crate::error::ServerError;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Everything read from the environment at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Namespace holding nodes and boot configurations; the client default when unset
    pub namespace: Option<String>,
    pub listen_addr: SocketAddr,
    /// YAML provider config file
    pub provider_config: Option<PathBuf>,
    pub settings: ControllerSettings,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let listen = lookup("BOOT_LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen
            .parse()
            .map_err(|e| ServerError::InvalidConfig(format!("BOOT_LISTEN_ADDR '{listen}': {e}")))?;

        let mut settings = ControllerSettings::default();
        if let Some(secs) = parse_secs(&lookup, "BOOT_QUERY_TIMEOUT_SECS")? {
            settings.query_timeout = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "BOOT_CACHE_TTL_SECS")? {
            settings.cache_ttl = secs;
        }

        Ok(Self {
            namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty()),
            listen_addr,
            provider_config: lookup("BOOT_PROVIDER_CONFIG").filter(|p| !p.is_empty()).map(PathBuf::from),
            settings,
        })
    }

    /// Provider config from the configured file, or none
    pub async fn load_provider_config(&self) -> Result<ProviderConfig, ServerError> {
        match &self.provider_config {
            Some(path) => read_provider_config(path).await,
            None => Ok(ProviderConfig::default()),
        }
    }

    pub fn log(&self) {
        info!("Configuration:");
        info!("  Listen address: {}", self.listen_addr);
        info!("  Namespace: {}", self.namespace.as_deref().unwrap_or("client default"));
        info!(
            "  Provider config: {}",
            self.provider_config
                .as_deref()
                .map_or_else(|| "none".to_string(), |p| p.display().to_string())
        );
        info!("  Query timeout: {}s", self.settings.query_timeout.as_secs());
        info!("  Cache TTL: {}s", self.settings.cache_ttl.as_secs());
    }
}

fn parse_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>, ServerError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|e| ServerError::InvalidConfig(format!("{key} '{raw}': {e}")))?;
    if secs == 0 {
        return Err(ServerError::InvalidConfig(format!("{key} must be greater than zero")));
    }
    Ok(Some(Duration::from_secs(secs)))
}

async fn read_provider_config(path: &Path) -> Result<ProviderConfig, ServerError> {
    let document = tokio::fs::read_to_string(path).await?;
    Ok(ProviderConfig::from_yaml(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ServerError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert!(config.namespace.is_none());
        assert!(config.provider_config.is_none());
        assert_eq!(config.settings, ControllerSettings::default());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("WATCH_NAMESPACE", "boot"),
            ("BOOT_LISTEN_ADDR", "127.0.0.1:9000"),
            ("BOOT_PROVIDER_CONFIG", "/etc/boot/provider.yaml"),
            ("BOOT_QUERY_TIMEOUT_SECS", "3"),
            ("BOOT_CACHE_TTL_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.namespace.as_deref(), Some("boot"));
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.provider_config, Some(PathBuf::from("/etc/boot/provider.yaml")));
        assert_eq!(config.settings.query_timeout, Duration::from_secs(3));
        assert_eq!(config.settings.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[("BOOT_LISTEN_ADDR", "nowhere")]),
            Err(ServerError::InvalidConfig(_))
        ));
        assert!(matches!(
            config(&[("BOOT_CACHE_TTL_SECS", "soon")]),
            Err(ServerError::InvalidConfig(_))
        ));
        assert!(matches!(
            config(&[("BOOT_QUERY_TIMEOUT_SECS", "0")]),
            Err(ServerError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_no_provider_file_means_no_provider() {
        let provider = config(&[]).unwrap().load_provider_config().await.unwrap();
        assert!(provider.kind().is_none());
    }
}
