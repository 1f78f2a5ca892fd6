use std::sync::Arc;

use ais_domain::{Cluster, ClusterId, HostRole, Manifest, ManifestFolder};
use ais_hostsm::{HostEvent, HostStateMachine};
use ais_store::StateStore;
use tracing::{debug, warn};

use crate::error::ClusterSmError;
use crate::transitions::{apply_event, ClusterEvent};

const MAX_CAS_RETRIES: u32 = 5;

/// Drives [`ClusterEvent`]s against a [`StateStore`], retrying on optimistic
/// concurrency conflicts. See `ais_hostsm::HostStateMachine` for the same
/// pattern applied to hosts.
pub struct ClusterStateMachine {
    store: Arc<dyn StateStore>,
    hostsm: HostStateMachine,
}

impl ClusterStateMachine {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { hostsm: HostStateMachine::new(store.clone()), store }
    }

    pub async fn dispatch(&self, cluster_id: ClusterId, event: ClusterEvent) -> Result<Cluster, ClusterSmError> {
        let starting_installation = matches!(event, ClusterEvent::StartInstallation);

        for attempt in 0..MAX_CAS_RETRIES {
            let mut cluster = self
                .store
                .get_cluster(cluster_id)
                .await?
                .ok_or_else(|| ais_store::StoreError::ClusterNotFound(cluster_id.to_string()))?;

            let previous_status = cluster.status;
            let new_status = apply_event(&mut cluster, event.clone())?;
            cluster.status = new_status;
            cluster.status_updated_at = chrono::Utc::now();

            let sent_revision = cluster.revision;
            match self.store.update_cluster(cluster.clone()).await {
                Ok(()) => {
                    cluster.revision = sent_revision + 1;
                    debug!(cluster_id = %cluster_id, from = %previous_status, to = %cluster.status, "cluster transitioned");
                    if starting_installation {
                        self.start_installation(&cluster).await?;
                    }
                    return Ok(cluster);
                }
                Err(ais_store::StoreError::Conflict { .. }) => {
                    warn!(cluster_id = %cluster_id, attempt, "cluster update conflict, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(ClusterSmError::RetriesExhausted { cluster_id: cluster_id.to_string() })
    }

    /// Runs the installation-startup transaction (§4.2): pins every bound
    /// host's `auto` role to master/worker (tie-broken by ascending
    /// host-id), promotes the lowest-id master to bootstrap, persists the
    /// system-generated networking manifest, then pushes each host through
    /// its own `Install` event.
    async fn start_installation(&self, cluster: &Cluster) -> Result<(), ClusterSmError> {
        let mut hosts = self.store.list_hosts_for_cluster(cluster.id).await?;
        let snapshot = hosts.clone();

        for host in &mut hosts {
            if host.role == HostRole::Auto {
                host.role = ais_validate::resolved_role(cluster, &snapshot, host);
            }
        }
        let bootstrap_id = hosts.iter().filter(|h| h.role == HostRole::Master).map(|h| h.id).min();
        if let Some(id) = bootstrap_id {
            if let Some(bootstrap) = hosts.iter_mut().find(|h| h.id == id) {
                bootstrap.role = HostRole::Bootstrap;
            }
        }

        for host in &hosts {
            self.hostsm.pin_role(host.id, host.role).await?;
        }

        self.store
            .put_manifest(Manifest {
                cluster_id: cluster.id,
                folder: ManifestFolder::Openshift,
                filename: "99-networking-config.yaml".into(),
                contents: networking_manifest(cluster),
            })
            .await?;

        for host in &hosts {
            self.hostsm.dispatch(host.id, HostEvent::Install).await?;
        }

        Ok(())
    }
}

/// The system-generated networking manifest that always accompanies
/// install (§4.2 "manifests ... system-generated for networking"); any
/// caller-supplied manifests for the cluster are generated and persisted
/// separately before `StartInstallation` fires.
fn networking_manifest(cluster: &Cluster) -> String {
    let cluster_networks: Vec<String> = cluster.cluster_networks.iter().map(|c| c.to_string()).collect();
    let service_networks: Vec<String> = cluster.service_networks.iter().map(|c| c.to_string()).collect();
    format!(
        "apiVersion: operator.openshift.io/v1\nkind: Network\nmetadata:\n  name: cluster\nspec:\n  clusterNetwork: {cluster_networks:?}\n  serviceNetwork: {service_networks:?}\n  networkType: {}\n",
        cluster.network_type,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_domain::*;
    use ais_store::InMemoryStore;

    fn new_cluster() -> Cluster {
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
            status: ClusterStatus::Ready,
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
    async fn start_installation_persists_new_status() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let cluster = new_cluster();
        let cluster_id = cluster.id;
        store.insert_cluster(cluster).await.unwrap();

        let sm = ClusterStateMachine::new(store.clone());
        let updated = sm.dispatch(cluster_id, ClusterEvent::StartInstallation).await.unwrap();
        assert_eq!(updated.status, ClusterStatus::PreparingForInstallation);
        assert!(updated.install_started_at.is_some());

        let reloaded = store.get_cluster(cluster_id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, ClusterStatus::PreparingForInstallation);
        assert_eq!(reloaded.revision, 1);
    }

    fn bound_host(cluster_id: ClusterId) -> Host {
        Host {
            id: HostId::new(),
            cluster_id: Some(cluster_id),
            infra_env_id: InfraEnvId::new(),
            role: HostRole::Auto,
            inventory: None,
            connectivity: None,
            installation_progress: InstallationProgress::default(),
            installer_args: vec![],
            logs_collected_at: None,
            approved: true,
            validations: serde_json::json!({}),
            status: HostStatus::Known,
            status_info: String::new(),
            status_updated_at: chrono::Utc::now(),
            checked_in_at: None,
            revision: 0,
        }
    }

    #[tokio::test]
    async fn start_installation_pins_roles_and_pushes_install() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let mut cluster = new_cluster();
        cluster.ha_mode = HaMode::Full;
        cluster.worker_count = 0;
        let cluster_id = cluster.id;
        store.insert_cluster(cluster).await.unwrap();

        let mut host_ids: Vec<HostId> = Vec::new();
        for _ in 0..3 {
            let host = bound_host(cluster_id);
            host_ids.push(host.id);
            store.insert_host(host).await.unwrap();
        }
        host_ids.sort();

        let sm = ClusterStateMachine::new(store.clone());
        sm.dispatch(cluster_id, ClusterEvent::StartInstallation).await.unwrap();

        let hosts = store.list_hosts_for_cluster(cluster_id).await.unwrap();
        assert!(hosts.iter().all(|h| h.role != HostRole::Auto));
        assert!(hosts.iter().all(|h| h.status == HostStatus::PreparingForInstallation));

        let bootstrap = hosts.iter().find(|h| h.id == *host_ids.first().unwrap()).unwrap();
        assert_eq!(bootstrap.role, HostRole::Bootstrap);

        let manifests = store.list_manifests(cluster_id).await.unwrap();
        assert!(manifests.iter().any(|m| m.folder == ManifestFolder::Openshift));
    }

    #[tokio::test]
    async fn cancel_is_retried_on_conflict_free_path() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let cluster = new_cluster();
        let cluster_id = cluster.id;
        store.insert_cluster(cluster).await.unwrap();

        let sm = ClusterStateMachine::new(store.clone());
        let updated = sm.dispatch(cluster_id, ClusterEvent::Cancel).await.unwrap();
        assert_eq!(updated.status, ClusterStatus::Cancelled);
    }
}
