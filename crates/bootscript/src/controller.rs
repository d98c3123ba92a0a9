//! Boot script controller
//!
//! Orchestrates a boot request:
//!
//! ```text
//! cache ─hit──────────────────────────────────────────────► script
//!   │miss
//!   ▼
//! classify ► resolve (store) ─fail─► provider ─ok─► resolve (store, by xname)
//!               │ok                     │fail              │fail ► minimal
//!               ▼                       ▼                  │ok
//!             match ◄───────────────── minimal ◄───────────┘
//!               │ok   │fail ► minimal
//!               ▼
//!             render ─fail─► error script
//!               │ok
//!               ▼
//!             cache ► script
//! ```
//!
//! Each stage returns a `Result`; the public operations turn every error into
//! a minimal or error script so a booting node always gets something
//! bootable.

use std::sync::Arc;
use std::time::Duration;

use boot_client::ResourceClient;
use crds::Node;
use kube::ResourceExt;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, DEFAULT_MAX_ENTRIES, DEFAULT_TTL, ScriptCache};
use crate::error::BootScriptError;
use crate::identifier::{NodeIdentifier, classify};
use crate::matcher::{ConfigMatcher, normalize_profile};
use crate::provider::{HealthStatus, ProviderConfig, ProviderError, ProviderHandle, ProviderStats, SyncOutcome};
use crate::render::{BootScript, ScriptKind, render};
use crate::resolver::NodeResolver;
use crate::sync::start_sync_worker;

/// Tunables for [`BootScriptController`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Bound on each resource store query
    pub query_timeout: Duration,
    /// Lifetime of cached scripts
    pub cache_ttl: Duration,
    /// Cache capacity
    pub cache_max_entries: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(10),
            cache_ttl: DEFAULT_TTL,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

/// What to do when the provider knows a node the resource store does not
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProviderRecord {
    /// Fall back to the minimal script
    RetryOnly,
    /// Match against the provider's record
    UseDirectly,
}

/// Where the node used for matching came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeSource {
    Store,
    Provider,
}

/// Boot script controller
pub struct BootScriptController {
    client: Arc<dyn ResourceClient>,
    resolver: NodeResolver,
    matcher: ConfigMatcher,
    cache: Arc<ScriptCache>,
    provider: Option<ProviderHandle>,
    settings: ControllerSettings,
}

impl std::fmt::Debug for BootScriptController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootScriptController")
            .field("provider", &self.provider)
            .field("settings", &self.settings)
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

impl BootScriptController {
    /// Controller without a node provider
    pub fn new(client: Arc<dyn ResourceClient>, settings: ControllerSettings) -> Self {
        Self::with_provider(client, settings, None)
    }

    pub fn with_provider(
        client: Arc<dyn ResourceClient>,
        settings: ControllerSettings,
        provider: Option<ProviderHandle>,
    ) -> Self {
        let cache = Arc::new(ScriptCache::new(settings.cache_ttl, settings.cache_max_entries));
        Self {
            resolver: NodeResolver::new(Arc::clone(&client), settings.query_timeout),
            matcher: ConfigMatcher::new(Arc::clone(&client), settings.query_timeout),
            client,
            cache,
            provider,
            settings,
        }
    }

    /// Controller with the provider `config` selects
    ///
    /// A provider that cannot be built (for example an unreadable inventory
    /// file) is an error. An unknown provider type is not.
    pub async fn from_provider_config(
        client: Arc<dyn ResourceClient>,
        settings: ControllerSettings,
        config: &ProviderConfig,
    ) -> Result<Self, ProviderError> {
        let provider = ProviderHandle::from_config(config).await?;
        if provider.is_none() {
            info!("No node provider configured");
        }
        Ok(Self::with_provider(client, settings, provider))
    }

    /// Resource client, for configuration CRUD
    pub fn client(&self) -> &Arc<dyn ResourceClient> {
        &self.client
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Generate the boot script for `identifier` and `profile`
    ///
    /// Never fails. When the resource store does not know the node and a
    /// provider is configured, the provider's xname is looked up in the store
    /// again.
    pub async fn generate_boot_script(&self, identifier: &str, profile: &str) -> String {
        self.resolve_boot_script(identifier, profile).await.into_body()
    }

    /// Like [`Self::generate_boot_script`], but a node only the provider knows
    /// is matched using the provider's record.
    pub async fn generate_boot_script_with_provider_fallback(&self, identifier: &str, profile: &str) -> String {
        self.run(identifier, profile, ProviderRecord::UseDirectly).await.into_body()
    }

    /// Generate the boot script and report how it was produced
    pub async fn resolve_boot_script(&self, identifier: &str, profile: &str) -> BootScript {
        self.run(identifier, profile, ProviderRecord::RetryOnly).await
    }

    async fn run(&self, identifier: &str, profile: &str, record: ProviderRecord) -> BootScript {
        let profile = normalize_profile(profile);

        if let Some(body) = self.cache.get(identifier, profile) {
            debug!("Cache hit for {} (profile {})", identifier, profile);
            return BootScript {
                kind: ScriptKind::Cached,
                body,
            };
        }

        let id = classify(identifier);
        debug!("Generating boot script for {} (profile {})", id, profile);

        let (node, source) = match self.resolve_node(&id, record).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("Node resolution failed for {}, sending minimal script: {}", identifier, e);
                return render(None, None, identifier, None);
            }
        };

        let config = match self.matcher.find_boot_configuration(&node, profile).await {
            Ok(config) => config,
            Err(e) => {
                warn!("No configuration for {}, sending minimal script: {}", identifier, e);
                return render(None, Some(&node.spec), identifier, None);
            }
        };

        let script = render(Some(&config), Some(&node.spec), identifier, None);
        if script.kind != ScriptKind::Rendered {
            warn!(
                "Configuration {} could not be rendered for {}, sending error script",
                config.name_any(),
                identifier
            );
            return script;
        }

        if source == NodeSource::Store {
            self.cache
                .set(identifier, profile, &script.body, &node.spec.xname, &config.name_any());
        }
        info!(
            "Boot script for {} uses configuration {} (node {})",
            identifier,
            config.name_any(),
            node.spec.xname
        );
        script
    }

    async fn resolve_node(
        &self,
        id: &NodeIdentifier,
        record: ProviderRecord,
    ) -> Result<(Node, NodeSource), BootScriptError> {
        let primary = match self.resolver.resolve(id).await {
            Ok(node) => return Ok((node, NodeSource::Store)),
            Err(e) => e,
        };

        let Some(handle) = &self.provider else {
            return Err(primary);
        };
        info!(
            "Resource store lookup failed for {}, trying {} provider: {}",
            id,
            handle.kind(),
            primary
        );

        let provider_node = handle.provider().resolve_node_by_identifier(id).await?;
        info!(
            "{} provider resolved node {} for {}",
            handle.kind(),
            provider_node.spec.xname,
            id
        );

        match self.resolver.resolve(&classify(&provider_node.spec.xname)).await {
            Ok(node) => Ok((node, NodeSource::Store)),
            Err(e) if record == ProviderRecord::UseDirectly => {
                info!(
                    "Resource store has no record of {} ({}), using {} provider record",
                    provider_node.spec.xname,
                    e,
                    handle.kind()
                );
                Ok((provider_node, NodeSource::Provider))
            }
            Err(e) => Err(e),
        }
    }

    /// Start the provider's reconciliation worker
    ///
    /// Returns `None` when there is no provider or it does not sync.
    pub fn start_background_sync(&self, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        let Some(handle) = &self.provider else {
            info!("No node provider configured, background sync disabled");
            return None;
        };
        let Some(sync) = handle.sync() else {
            info!("Provider {} does not support background sync", handle.kind());
            return None;
        };

        info!("Starting background sync with {} provider", handle.kind());
        Some(start_sync_worker(Arc::clone(sync), shutdown))
    }

    /// Refresh the provider once, outside the worker schedule
    pub async fn sync_now(&self) -> Result<SyncOutcome, BootScriptError> {
        let handle = self
            .provider
            .as_ref()
            .ok_or_else(|| BootScriptError::Configuration("no node provider configured".to_string()))?;
        let sync = handle.sync().ok_or_else(|| {
            BootScriptError::Configuration(format!("provider {} does not support sync", handle.kind()))
        })?;
        Ok(sync.sync().await?)
    }

    /// Provider health, `Ok` when there is no provider
    pub async fn health_check(&self) -> HealthStatus {
        match &self.provider {
            Some(handle) => handle.provider().health_check().await,
            None => HealthStatus::Ok,
        }
    }

    /// `hsm`, `yaml` or `none`
    pub fn provider_type(&self) -> &'static str {
        self.provider.as_ref().map_or("none", |handle| handle.kind().as_str())
    }

    /// Provider stats plus what is configured
    pub fn provider_stats(&self) -> ProviderStats {
        let mut stats = self
            .provider
            .as_ref()
            .map(|handle| handle.provider().stats())
            .unwrap_or_default();
        stats.insert("provider_type".to_string(), json!(self.provider_type()));
        stats.insert("provider_configured".to_string(), json!(self.provider.is_some()));
        stats.insert(
            "sync_supported".to_string(),
            json!(self.provider.as_ref().is_some_and(|handle| handle.sync().is_some())),
        );
        stats
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boot_client::MockResourceClient;
    use crds::{BootConfiguration, BootConfigurationSpec, NodeSpec};

    fn store() -> MockResourceClient {
        let mock = MockResourceClient::new();
        mock.add_node(Node::new(
            "x1000c0s0b0n0",
            NodeSpec {
                xname: "x1000c0s0b0n0".to_string(),
                nid: Some(5),
                boot_mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
                ..Default::default()
            },
        ));
        mock
    }

    fn catch_all(kernel: &str) -> BootConfiguration {
        BootConfiguration::new(
            "catch-all",
            BootConfigurationSpec {
                kernel: kernel.to_string(),
                ..Default::default()
            },
        )
    }

    fn controller(mock: &MockResourceClient) -> BootScriptController {
        BootScriptController::new(Arc::new(mock.clone()), ControllerSettings::default())
    }

    #[tokio::test]
    async fn test_rendered_script_is_cached() {
        let mock = store();
        mock.add_boot_configuration(catch_all("http://boot/vmlinuz"));
        let controller = controller(&mock);

        let first = controller.resolve_boot_script("5", "").await;
        assert_eq!(first.kind, ScriptKind::Rendered);
        let second = controller.resolve_boot_script("5", "default").await;
        assert_eq!(second.kind, ScriptKind::Cached);
        assert_eq!(first.body, second.body);
        assert_eq!(controller.cache_stats().entries, 1);
    }

    #[tokio::test]
    async fn test_no_configuration_gives_uncached_minimal() {
        let mock = store();
        let controller = controller(&mock);

        let script = controller.resolve_boot_script("x1000c0s0b0n0", "").await;
        assert_eq!(script.kind, ScriptKind::Minimal);
        assert!(script.body.contains("x1000c0s0b0n0"));

        controller.resolve_boot_script("x1000c0s0b0n0", "").await;
        assert_eq!(mock.node_queries(), 2);
        assert_eq!(controller.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_render_failure_gives_error_script() {
        let mock = store();
        mock.add_boot_configuration(catch_all(""));
        let controller = controller(&mock);

        let script = controller.resolve_boot_script("5", "").await;
        assert_eq!(script.kind, ScriptKind::Error);
        assert!(script.body.contains("catch-all has no kernel"));
        assert_eq!(controller.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_store_outage_gives_minimal() {
        let mock = store();
        mock.set_failing(true);
        let controller = controller(&mock);

        let script = controller.generate_boot_script("5", "").await;
        assert!(script.contains("No boot configuration available for 5"));
    }

    #[tokio::test]
    async fn test_without_provider() {
        let controller = controller(&store());

        assert_eq!(controller.provider_type(), "none");
        assert!(controller.health_check().await.is_ok());
        assert!(controller.start_background_sync(watch::channel(false).1).is_none());
        assert!(matches!(
            controller.sync_now().await,
            Err(BootScriptError::Configuration(_))
        ));

        let stats = controller.provider_stats();
        assert_eq!(stats["provider_type"], json!("none"));
        assert_eq!(stats["provider_configured"], json!(false));
        assert_eq!(stats["sync_supported"], json!(false));
    }
}
