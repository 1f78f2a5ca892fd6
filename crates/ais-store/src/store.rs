use async_trait::async_trait;
use ais_domain::{Cluster, ClusterId, Event, Host, HostId, InfraEnv, InfraEnvId, Manifest, ManifestFolder};

use crate::error::StoreError;

/// Persistence boundary for the cluster/host/infra-env/event/manifest
/// entities. Every mutating method is a compare-and-swap on `revision`:
/// callers pass the entity as they last read it, and a store returns
/// [`StoreError::Conflict`] if it has since moved on, leaving bounded retry
/// to the caller (§5).
#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    async fn get_cluster(&self, id: ClusterId) -> Result<Option<Cluster>, StoreError>;
    async fn list_clusters(&self) -> Result<Vec<Cluster>, StoreError>;
    /// Inserts a brand-new cluster. Fails if one with the same id exists.
    async fn insert_cluster(&self, cluster: Cluster) -> Result<(), StoreError>;
    /// Conditional update: succeeds only if the stored revision equals
    /// `cluster.revision`; on success the stored revision is incremented.
    async fn update_cluster(&self, cluster: Cluster) -> Result<(), StoreError>;
    async fn delete_cluster(&self, id: ClusterId) -> Result<(), StoreError>;

    async fn get_host(&self, id: HostId) -> Result<Option<Host>, StoreError>;
    async fn list_hosts_for_cluster(&self, cluster_id: ClusterId) -> Result<Vec<Host>, StoreError>;
    async fn list_hosts_for_infra_env(&self, infra_env_id: InfraEnvId) -> Result<Vec<Host>, StoreError>;
    async fn insert_host(&self, host: Host) -> Result<(), StoreError>;
    async fn update_host(&self, host: Host) -> Result<(), StoreError>;
    async fn delete_host(&self, id: HostId) -> Result<(), StoreError>;

    async fn get_infra_env(&self, id: InfraEnvId) -> Result<Option<InfraEnv>, StoreError>;
    async fn list_infra_envs(&self) -> Result<Vec<InfraEnv>, StoreError>;
    async fn insert_infra_env(&self, infra_env: InfraEnv) -> Result<(), StoreError>;
    async fn update_infra_env(&self, infra_env: InfraEnv) -> Result<(), StoreError>;
    async fn delete_infra_env(&self, id: InfraEnvId) -> Result<(), StoreError>;

    async fn append_event(&self, event: Event) -> Result<(), StoreError>;
    async fn list_events(
        &self,
        cluster_id: Option<ClusterId>,
        limit: u32,
    ) -> Result<Vec<Event>, StoreError>;

    async fn put_manifest(&self, manifest: Manifest) -> Result<(), StoreError>;
    async fn list_manifests(&self, cluster_id: ClusterId) -> Result<Vec<Manifest>, StoreError>;
    async fn delete_manifest(
        &self,
        cluster_id: ClusterId,
        folder: ManifestFolder,
        filename: &str,
    ) -> Result<(), StoreError>;
}
