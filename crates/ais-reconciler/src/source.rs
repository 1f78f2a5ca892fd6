use std::collections::HashMap;
use std::sync::RwLock;

use ais_domain::ClusterId;
use async_trait::async_trait;

use crate::error::ReconcileError;
use crate::report::{Condition, DesiredCluster, DesiredHost, SpokeKey};

/// The consumption side of the external orchestrator's watch interface
/// (§6): reads desired cluster/host records and writes back observed
/// conditions and credentials. A real implementation watches
/// ClusterDeployment/AgentClusterInstall/Agent/BareMetalHost resources; tests
/// exercise the reconciler against [`InMemoryDeclarativeSource`] instead.
#[async_trait]
pub trait DeclarativeSource: Send + Sync {
    async fn list_desired_clusters(&self) -> Result<Vec<DesiredCluster>, ReconcileError>;
    async fn list_desired_hosts(&self, key: &SpokeKey) -> Result<Vec<DesiredHost>, ReconcileError>;
    async fn record_backend_cluster_id(&self, key: &SpokeKey, id: ClusterId) -> Result<(), ReconcileError>;
    async fn put_conditions(&self, key: &SpokeKey, conditions: Vec<Condition>) -> Result<(), ReconcileError>;
    async fn has_credentials(&self, key: &SpokeKey) -> Result<bool, ReconcileError>;
    async fn persist_credentials(
        &self,
        key: &SpokeKey,
        kubeconfig: Vec<u8>,
        kubeadmin_password: String,
    ) -> Result<(), ReconcileError>;
}

#[derive(Default)]
struct Inner {
    clusters: HashMap<SpokeKey, DesiredCluster>,
    hosts: HashMap<SpokeKey, Vec<DesiredHost>>,
    conditions: HashMap<SpokeKey, Vec<Condition>>,
    credentials: HashMap<SpokeKey, (Vec<u8>, String)>,
}

/// In-memory fake used by reconciler tests and local development (no
/// external orchestrator wired up).
#[derive(Default)]
pub struct InMemoryDeclarativeSource {
    inner: RwLock<Inner>,
}

impl InMemoryDeclarativeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_desired_cluster(&self, cluster: DesiredCluster) {
        self.inner.write().unwrap().clusters.insert(cluster.key.clone(), cluster);
    }

    pub fn put_desired_hosts(&self, key: SpokeKey, hosts: Vec<DesiredHost>) {
        self.inner.write().unwrap().hosts.insert(key, hosts);
    }

    pub fn conditions_for(&self, key: &SpokeKey) -> Option<Vec<Condition>> {
        self.inner.read().unwrap().conditions.get(key).cloned()
    }

    pub fn credentials_for(&self, key: &SpokeKey) -> Option<(Vec<u8>, String)> {
        self.inner.read().unwrap().credentials.get(key).cloned()
    }
}

#[async_trait]
impl DeclarativeSource for InMemoryDeclarativeSource {
    async fn list_desired_clusters(&self) -> Result<Vec<DesiredCluster>, ReconcileError> {
        Ok(self.inner.read().unwrap().clusters.values().cloned().collect())
    }

    async fn list_desired_hosts(&self, key: &SpokeKey) -> Result<Vec<DesiredHost>, ReconcileError> {
        Ok(self.inner.read().unwrap().hosts.get(key).cloned().unwrap_or_default())
    }

    async fn record_backend_cluster_id(&self, key: &SpokeKey, id: ClusterId) -> Result<(), ReconcileError> {
        let mut inner = self.inner.write().unwrap();
        if let Some(cluster) = inner.clusters.get_mut(key) {
            cluster.backend_cluster_id = Some(id);
        }
        Ok(())
    }

    async fn put_conditions(&self, key: &SpokeKey, conditions: Vec<Condition>) -> Result<(), ReconcileError> {
        self.inner.write().unwrap().conditions.insert(key.clone(), conditions);
        Ok(())
    }

    async fn has_credentials(&self, key: &SpokeKey) -> Result<bool, ReconcileError> {
        Ok(self.inner.read().unwrap().credentials.contains_key(key))
    }

    async fn persist_credentials(
        &self,
        key: &SpokeKey,
        kubeconfig: Vec<u8>,
        kubeadmin_password: String,
    ) -> Result<(), ReconcileError> {
        self.inner.write().unwrap().credentials.insert(key.clone(), (kubeconfig, kubeadmin_password));
        Ok(())
    }
}
