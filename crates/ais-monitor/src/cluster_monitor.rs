use std::sync::Arc;
use std::time::Duration;

use ais_clustersm::{ClusterEvent, ClusterStateMachine};
use ais_domain::HostStatus;
use ais_store::StateStore;
use ais_validate::ValidationStatus;
use tracing::{debug, error, warn};

use crate::leader::LeaderGate;

/// Periodically re-validates every cluster and refreshes its status (§4.2,
/// §4.5), the cluster-level counterpart of [`crate::host_monitor::HostMonitor`].
pub struct ClusterMonitor {
    store: Arc<dyn StateStore>,
    clustersm: ClusterStateMachine,
    leader_gate: Arc<dyn LeaderGate>,
    interval: Duration,
}

impl ClusterMonitor {
    pub fn new(store: Arc<dyn StateStore>, leader_gate: Arc<dyn LeaderGate>, interval: Duration) -> Self {
        Self { clustersm: ClusterStateMachine::new(store.clone()), store, leader_gate, interval }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.leader_gate.is_leader().await {
                        self.tick().await;
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("cluster monitor shutting down");
                        return;
                    }
                }
            }
        }
    }

    async fn tick(&self) {
        let clusters = match self.store.list_clusters().await {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "cluster monitor failed to list clusters");
                return;
            }
        };

        for cluster in clusters {
            let hosts = match self.store.list_hosts_for_cluster(cluster.id).await {
                Ok(hosts) => hosts,
                Err(e) => {
                    error!(cluster_id = %cluster.id, error = %e, "failed to list hosts for cluster");
                    continue;
                }
            };
            // Cluster-level conditions never read infra_env; only per-host
            // conditions do, so an empty host list needs no real one.
            let infra_env = match self.infra_env_for(&hosts).await {
                Some(env) => env,
                None if hosts.is_empty() => placeholder_infra_env(),
                None => continue,
            };

            let report = ais_validate::validate(
                &cluster,
                &hosts,
                &infra_env,
                chrono::Utc::now(),
                ais_validate::DEFAULT_CONNECTION_TIMEOUT,
            );
            let aggregate = report.cluster.values().map(|r| r.status).max().unwrap_or(ValidationStatus::Success);
            let hosts_ready = !hosts.is_empty()
                && hosts.iter().all(|h| {
                    matches!(h.status, HostStatus::PreparingForInstallation) || h.status.is_in_installing_family()
                });
            let bootstrap_installing = hosts
                .iter()
                .any(|h| h.role == ais_domain::HostRole::Bootstrap && h.status.is_in_installing_family());

            let event = if bootstrap_installing {
                ClusterEvent::BootstrapInstalling
            } else {
                ClusterEvent::Refresh { aggregate, hosts_ready }
            };

            if let Err(e) = self.clustersm.dispatch(cluster.id, event).await {
                warn!(cluster_id = %cluster.id, error = %e, "cluster refresh failed");
            }
        }
    }

    async fn infra_env_for(&self, hosts: &[ais_domain::Host]) -> Option<ais_domain::InfraEnv> {
        let first = hosts.first()?;
        self.store.get_infra_env(first.infra_env_id).await.ok().flatten()
    }
}

fn placeholder_infra_env() -> ais_domain::InfraEnv {
    ais_domain::InfraEnv {
        id: ais_domain::InfraEnvId::new(),
        pull_secret: String::new(),
        ssh_public_key: None,
        proxy: ais_domain::ProxyConfig::default(),
        static_network_config: None,
        cpu_architecture: String::new(),
        image_expires_at: None,
        revision: 0,
    }
}
