use std::sync::Arc;
use std::time::Duration;

use ais_hostsm::{HostEvent, HostStateMachine};
use ais_store::StateStore;
use tracing::{debug, error, warn};

use crate::leader::LeaderGate;

/// Periodically re-validates every host and refreshes its status (§4.1,
/// §4.5). Mirrors the original service's host monitor goroutine: a tick,
/// gated on leadership, that re-derives status from freshly computed
/// validations rather than waiting for the next agent-triggered event.
pub struct HostMonitor {
    store: Arc<dyn StateStore>,
    hostsm: HostStateMachine,
    leader_gate: Arc<dyn LeaderGate>,
    interval: Duration,
    connection_timeout: Duration,
}

impl HostMonitor {
    pub fn new(
        store: Arc<dyn StateStore>,
        leader_gate: Arc<dyn LeaderGate>,
        interval: Duration,
        connection_timeout: Duration,
    ) -> Self {
        Self { hostsm: HostStateMachine::new(store.clone()), store, leader_gate, interval, connection_timeout }
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
                        debug!("host monitor shutting down");
                        return;
                    }
                }
            }
        }
    }

    async fn tick(&self) {
        let infra_envs = match self.store.list_infra_envs().await {
            Ok(envs) => envs,
            Err(e) => {
                error!(error = %e, "host monitor failed to list infra-envs");
                return;
            }
        };

        for infra_env in infra_envs {
            let hosts = match self.store.list_hosts_for_infra_env(infra_env.id).await {
                Ok(hosts) => hosts,
                Err(e) => {
                    error!(infra_env_id = %infra_env.id, error = %e, "failed to list hosts");
                    continue;
                }
            };

            let now = chrono::Utc::now();
            for host in hosts {
                let cluster = match host.cluster_id {
                    Some(cluster_id) => match self.store.get_cluster(cluster_id).await {
                        Ok(Some(c)) => c,
                        Ok(None) => continue,
                        Err(e) => {
                            error!(cluster_id = %cluster_id, error = %e, "failed to load cluster for host validation");
                            continue;
                        }
                    },
                    // Unbound hosts still need Refresh to catch up on
                    // connectivity/inventory (§4.5 "iterate all non-terminal
                    // hosts"); validate against a placeholder cluster since
                    // cluster-scoped conditions don't apply to them yet.
                    None => placeholder_cluster(),
                };

                let report = ais_validate::validate(
                    &cluster,
                    std::slice::from_ref(&host),
                    &infra_env,
                    now,
                    self.connection_timeout,
                );
                let conditions = report.hosts.get(&host.id).cloned().unwrap_or_default();

                if let Err(e) = self.hostsm.dispatch(host.id, HostEvent::Refresh(conditions)).await {
                    warn!(host_id = %host.id, error = %e, "host refresh failed");
                }
            }
        }
    }
}

fn placeholder_cluster() -> ais_domain::Cluster {
    ais_domain::Cluster {
        id: ais_domain::ClusterId::new(),
        name: String::new(),
        base_dns_domain: String::new(),
        openshift_version: String::new(),
        cpu_architecture: String::new(),
        ha_mode: ais_domain::HaMode::None,
        worker_count: 0,
        network_type: ais_domain::NetworkType::Ovn,
        cluster_networks: vec![],
        service_networks: vec![],
        machine_networks: vec![],
        api_vip: None,
        ingress_vip: None,
        pull_secret: String::new(),
        ssh_public_key: None,
        proxy: ais_domain::ProxyConfig::default(),
        disk_encryption: ais_domain::DiskEncryptionPolicy::default(),
        install_config_overrides: None,
        kind: ais_domain::ClusterKind::Day1,
        monitored_operators: vec![],
        validations: serde_json::json!({}),
        status: ais_domain::ClusterStatus::PendingForInput,
        status_info: String::new(),
        status_updated_at: chrono::Utc::now(),
        install_started_at: None,
        install_completed_at: None,
        controller_logs_collected_at: None,
        hold_installation: false,
        revision: 0,
    }
}
