//! Kubernetes-backed resource client
//!
//! Nodes and boot configurations are stored as namespaced custom resources.

use crate::error::ClientError;
use crate::resource_trait::ResourceClient;
use crds::{BootConfiguration, Node};
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::{Api, Client, ResourceExt};
use tracing::debug;

/// Resource client backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeResourceClient {
    nodes: Api<Node>,
    configs: Api<BootConfiguration>,
    namespace: String,
}

impl std::fmt::Debug for KubeResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeResourceClient")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl KubeResourceClient {
    /// Create a client scoped to `namespace`
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            nodes: Api::namespaced(client.clone(), namespace),
            configs: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
        }
    }

    /// Namespace the client reads from
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn ensure_exists(&self, name: &str) -> Result<(), ClientError> {
        if self.configs.get_opt(name).await?.is_none() {
            return Err(ClientError::NotFound(format!("BootConfiguration {name} not found")));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ResourceClient for KubeResourceClient {
    async fn get_nodes(&self) -> Result<Vec<Node>, ClientError> {
        debug!("Listing nodes in namespace {}", self.namespace);
        let list = self.nodes.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn get_boot_configurations(&self) -> Result<Vec<BootConfiguration>, ClientError> {
        debug!("Listing boot configurations in namespace {}", self.namespace);
        let list = self.configs.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn create_boot_configuration(&self, config: &BootConfiguration) -> Result<BootConfiguration, ClientError> {
        debug!("Creating boot configuration {}", config.name_any());
        Ok(self.configs.create(&PostParams::default(), config).await?)
    }

    async fn update_boot_configuration(&self, config: &BootConfiguration) -> Result<BootConfiguration, ClientError> {
        let name = config.name_any();
        debug!("Replacing boot configuration {}", name);
        self.ensure_exists(&name).await?;
        Ok(self.configs.replace(&name, &PostParams::default(), config).await?)
    }

    async fn delete_boot_configuration(&self, name: &str) -> Result<(), ClientError> {
        debug!("Deleting boot configuration {}", name);
        self.ensure_exists(name).await?;
        self.configs.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }
}
