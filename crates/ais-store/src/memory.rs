use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ais_domain::{Cluster, ClusterId, Event, Host, HostId, InfraEnv, InfraEnvId, Manifest, ManifestFolder};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::StateStore;

#[derive(Debug, Default)]
struct Inner {
    clusters: HashMap<ClusterId, Cluster>,
    hosts: HashMap<HostId, Host>,
    infra_envs: HashMap<InfraEnvId, InfraEnv>,
    events: Vec<Event>,
    manifests: Vec<Manifest>,
}

/// In-memory implementation of [`StateStore`]. All data is lost on process
/// exit; suitable for tests and single-process local development.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn get_cluster(&self, id: ClusterId) -> Result<Option<Cluster>, StoreError> {
        Ok(self.inner.read().await.clusters.get(&id).cloned())
    }

    async fn list_clusters(&self) -> Result<Vec<Cluster>, StoreError> {
        Ok(self.inner.read().await.clusters.values().cloned().collect())
    }

    async fn insert_cluster(&self, cluster: Cluster) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.clusters.insert(cluster.id, cluster);
        Ok(())
    }

    async fn update_cluster(&self, cluster: Cluster) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let current = guard
            .clusters
            .get(&cluster.id)
            .ok_or_else(|| StoreError::ClusterNotFound(cluster.id.to_string()))?;
        if current.revision != cluster.revision {
            return Err(StoreError::Conflict { expected: cluster.revision, actual: current.revision });
        }
        let mut next = cluster;
        next.revision += 1;
        guard.clusters.insert(next.id, next);
        Ok(())
    }

    async fn delete_cluster(&self, id: ClusterId) -> Result<(), StoreError> {
        self.inner.write().await.clusters.remove(&id);
        Ok(())
    }

    async fn get_host(&self, id: HostId) -> Result<Option<Host>, StoreError> {
        Ok(self.inner.read().await.hosts.get(&id).cloned())
    }

    async fn list_hosts_for_cluster(&self, cluster_id: ClusterId) -> Result<Vec<Host>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .hosts
            .values()
            .filter(|h| h.cluster_id == Some(cluster_id))
            .cloned()
            .collect())
    }

    async fn list_hosts_for_infra_env(&self, infra_env_id: InfraEnvId) -> Result<Vec<Host>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .hosts
            .values()
            .filter(|h| h.infra_env_id == infra_env_id)
            .cloned()
            .collect())
    }

    async fn insert_host(&self, host: Host) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.hosts.insert(host.id, host);
        Ok(())
    }

    async fn update_host(&self, host: Host) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let current = guard
            .hosts
            .get(&host.id)
            .ok_or_else(|| StoreError::HostNotFound(host.id.to_string()))?;
        if current.revision != host.revision {
            return Err(StoreError::Conflict { expected: host.revision, actual: current.revision });
        }
        let mut next = host;
        next.revision += 1;
        guard.hosts.insert(next.id, next);
        Ok(())
    }

    async fn delete_host(&self, id: HostId) -> Result<(), StoreError> {
        self.inner.write().await.hosts.remove(&id);
        Ok(())
    }

    async fn get_infra_env(&self, id: InfraEnvId) -> Result<Option<InfraEnv>, StoreError> {
        Ok(self.inner.read().await.infra_envs.get(&id).cloned())
    }

    async fn list_infra_envs(&self) -> Result<Vec<InfraEnv>, StoreError> {
        Ok(self.inner.read().await.infra_envs.values().cloned().collect())
    }

    async fn insert_infra_env(&self, infra_env: InfraEnv) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.infra_envs.insert(infra_env.id, infra_env);
        Ok(())
    }

    async fn update_infra_env(&self, infra_env: InfraEnv) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let current = guard
            .infra_envs
            .get(&infra_env.id)
            .ok_or_else(|| StoreError::InfraEnvNotFound(infra_env.id.to_string()))?;
        if current.revision != infra_env.revision {
            return Err(StoreError::Conflict { expected: infra_env.revision, actual: current.revision });
        }
        let mut next = infra_env;
        next.revision += 1;
        guard.infra_envs.insert(next.id, next);
        Ok(())
    }

    async fn delete_infra_env(&self, id: InfraEnvId) -> Result<(), StoreError> {
        self.inner.write().await.infra_envs.remove(&id);
        Ok(())
    }

    async fn append_event(&self, event: Event) -> Result<(), StoreError> {
        self.inner.write().await.events.push(event);
        Ok(())
    }

    async fn list_events(
        &self,
        cluster_id: Option<ClusterId>,
        limit: u32,
    ) -> Result<Vec<Event>, StoreError> {
        let guard = self.inner.read().await;
        let filtered: Vec<Event> = guard
            .events
            .iter()
            .filter(|ev| cluster_id.map_or(true, |id| ev.cluster_id == Some(id)))
            .cloned()
            .collect();
        let start = filtered.len().saturating_sub(limit as usize);
        Ok(filtered[start..].to_vec())
    }

    async fn put_manifest(&self, manifest: Manifest) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.manifests.retain(|m| {
            !(m.cluster_id == manifest.cluster_id
                && m.folder == manifest.folder
                && m.filename == manifest.filename)
        });
        guard.manifests.push(manifest);
        Ok(())
    }

    async fn list_manifests(&self, cluster_id: ClusterId) -> Result<Vec<Manifest>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .manifests
            .iter()
            .filter(|m| m.cluster_id == cluster_id)
            .cloned()
            .collect())
    }

    async fn delete_manifest(
        &self,
        cluster_id: ClusterId,
        folder: ManifestFolder,
        filename: &str,
    ) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard
            .manifests
            .retain(|m| !(m.cluster_id == cluster_id && m.folder == folder && m.filename == filename));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_domain::*;

    fn dummy_cluster() -> Cluster {
        Cluster {
            id: ClusterId::new(),
            name: "test".into(),
            base_dns_domain: "example.com".into(),
            openshift_version: "4.16.0".into(),
            cpu_architecture: "x86_64".into(),
            ha_mode: HaMode::None,
            worker_count: 0,
            network_type: NetworkType::Ovn,
            cluster_networks: vec![],
            service_networks: vec![],
            machine_networks: vec![],
            api_vip: None,
            ingress_vip: None,
            pull_secret: "{}".into(),
            ssh_public_key: None,
            proxy: ProxyConfig::default(),
            disk_encryption: DiskEncryptionPolicy::default(),
            install_config_overrides: None,
            kind: ClusterKind::Day1,
            monitored_operators: vec![],
            validations: serde_json::json!({}),
            status: ClusterStatus::PendingForInput,
            status_info: String::new(),
            status_updated_at: chrono::Utc::now(),
            install_started_at: None,
            install_completed_at: None,
            controller_logs_collected_at: None,
            hold_installation: false,
            revision: 0,
        }
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = InMemoryStore::new();
        let cluster = dummy_cluster();
        store.insert_cluster(cluster.clone()).await.unwrap();
        let got = store.get_cluster(cluster.id).await.unwrap();
        assert_eq!(got.unwrap().id, cluster.id);
    }

    #[tokio::test]
    async fn update_bumps_revision_on_success() {
        let store = InMemoryStore::new();
        let cluster = dummy_cluster();
        store.insert_cluster(cluster.clone()).await.unwrap();
        store.update_cluster(cluster.clone()).await.unwrap();
        let got = store.get_cluster(cluster.id).await.unwrap().unwrap();
        assert_eq!(got.revision, 1);
    }

    #[tokio::test]
    async fn stale_revision_is_rejected() {
        let store = InMemoryStore::new();
        let cluster = dummy_cluster();
        store.insert_cluster(cluster.clone()).await.unwrap();
        store.update_cluster(cluster.clone()).await.unwrap();
        // Second writer still holds revision 0 — must conflict.
        let err = store.update_cluster(cluster).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 0, actual: 1 }));
    }

    #[tokio::test]
    async fn events_filtered_by_cluster() {
        let store = InMemoryStore::new();
        let cluster_a = ClusterId::new();
        let cluster_b = ClusterId::new();
        store
            .append_event(Event {
                cluster_id: Some(cluster_a),
                host_id: None,
                infra_env_id: None,
                severity: EventSeverity::Info,
                message: "a".into(),
                timestamp: chrono::Utc::now(),
            })
            .await
            .unwrap();
        store
            .append_event(Event {
                cluster_id: Some(cluster_b),
                host_id: None,
                infra_env_id: None,
                severity: EventSeverity::Info,
                message: "b".into(),
                timestamp: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let all = store.list_events(None, 100).await.unwrap();
        assert_eq!(all.len(), 2);
        let for_a = store.list_events(Some(cluster_a), 100).await.unwrap();
        assert_eq!(for_a.len(), 1);
    }
}
