use std::sync::Arc;

use ais_clustersm::{ClusterEvent, ClusterSmError, ClusterStateMachine};
use ais_domain::{Cluster, ClusterId, ClusterKind, ClusterStatus, Host, InfraEnv, InfraEnvId, ProxyConfig};
use ais_hostsm::HostStateMachine;
use ais_store::StateStore;
use ais_validate::validate;

use crate::conditions::{self, SyncOutcome};
use crate::error::ReconcileError;
use crate::report::{Change, DesiredCluster, ReconcileReport};
use crate::source::DeclarativeSource;

/// Reconciles every desired cluster record against the backend store,
/// mirroring the result back as conditions (§4.6). Errors on individual
/// clusters are collected into the report rather than aborting the sweep.
pub async fn reconcile(
    source: &dyn DeclarativeSource,
    store: Arc<dyn StateStore>,
    hostsm: &HostStateMachine,
    clustersm: &ClusterStateMachine,
) -> Result<ReconcileReport, ReconcileError> {
    let mut report = ReconcileReport::default();
    for desired in source.list_desired_clusters().await? {
        match reconcile_one(&desired, source, store.as_ref(), hostsm, clustersm).await {
            Ok(changes) => report.changes.extend(changes),
            Err(e) => report.errors.push(format!("{}: {e}", desired.key)),
        }
    }
    Ok(report)
}

async fn reconcile_one(
    desired: &DesiredCluster,
    source: &dyn DeclarativeSource,
    store: &dyn StateStore,
    hostsm: &HostStateMachine,
    clustersm: &ClusterStateMachine,
) -> Result<Vec<Change>, ReconcileError> {
    let mut changes = Vec::new();

    if desired.deleted {
        if let Some(id) = desired.backend_cluster_id {
            if let Some(cluster) = store.get_cluster(id).await? {
                if !cluster.status.is_terminal() {
                    let _ = clustersm.dispatch(id, ClusterEvent::Cancel).await;
                }
                store.delete_cluster(id).await?;
                changes.push(Change::ClusterDeregistered { key: desired.key.clone(), cluster_id: id });
            }
        }
        return Ok(changes);
    }

    let cluster_id = match desired.backend_cluster_id {
        Some(id) => id,
        None if desired.desired_installed => {
            let cluster = translate_desired(desired, ClusterKind::Day2Import, ClusterStatus::Installed);
            let id = cluster.id;
            store.insert_cluster(cluster).await?;
            source.record_backend_cluster_id(&desired.key, id).await?;
            changes.push(Change::ClusterImported { key: desired.key.clone(), cluster_id: id });
            id
        }
        None => {
            let cluster = translate_desired(desired, ClusterKind::Day1, ClusterStatus::PendingForInput);
            let id = cluster.id;
            store.insert_cluster(cluster).await?;
            source.record_backend_cluster_id(&desired.key, id).await?;
            changes.push(Change::ClusterRegistered { key: desired.key.clone(), cluster_id: id });
            id
        }
    };

    let mut cluster = store
        .get_cluster(cluster_id)
        .await?
        .ok_or_else(|| ReconcileError::Internal(format!("backend cluster {cluster_id} vanished")))?;

    if cluster.hold_installation != desired.hold_installation {
        cluster = clustersm.dispatch(cluster_id, ClusterEvent::SetHoldInstallation(desired.hold_installation)).await?;
        changes.push(Change::ClusterUpdated { key: desired.key.clone(), cluster_id });
    }

    if spec_diverged(&cluster, desired) {
        cluster.name = desired.name.clone();
        cluster.base_dns_domain = desired.base_dns_domain.clone();
        cluster.openshift_version = desired.openshift_version.clone();
        cluster.network_type = desired.network_type;
        cluster.pull_secret = desired.pull_secret.clone();
        cluster.ssh_public_key = desired.ssh_public_key.clone();
        cluster.proxy = desired.proxy.clone();
        cluster.install_config_overrides = desired.install_config_overrides.clone();
        store.update_cluster(cluster.clone()).await?;
        cluster.revision += 1;
        changes.push(Change::ClusterUpdated { key: desired.key.clone(), cluster_id });
    }

    for desired_host in source.list_desired_hosts(&desired.key).await? {
        let Some(host_id) = desired_host.backend_host_id else { continue };
        if !desired_host.approved {
            continue;
        }
        if let Some(host) = store.get_host(host_id).await? {
            if !host.approved {
                hostsm.dispatch(host_id, ais_hostsm::HostEvent::Approve).await?;
            }
        }
    }

    let actual_hosts = store.list_hosts_for_cluster(cluster_id).await?;
    let infra_env = infra_env_for(store, &actual_hosts).await?;
    let validation_report = validate(
        &cluster,
        &actual_hosts,
        &infra_env,
        chrono::Utc::now(),
        ais_validate::DEFAULT_CONNECTION_TIMEOUT,
    );
    let aggregate = validation_report.aggregate_status();
    let hosts_ready = !actual_hosts.is_empty() && actual_hosts.iter().all(|h| h.status.is_in_installing_family());

    if cluster.status == ClusterStatus::Ready && !cluster.hold_installation {
        match clustersm.dispatch(cluster_id, ClusterEvent::StartInstallation).await {
            Ok(updated) => {
                cluster = updated;
                changes.push(Change::InstallationStarted { key: desired.key.clone(), cluster_id });
            }
            Err(ClusterSmError::NotReady { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    } else {
        cluster = clustersm.dispatch(cluster_id, ClusterEvent::Refresh { aggregate, hosts_ready }).await?;
    }

    if cluster.status == ClusterStatus::Installed && !source.has_credentials(&desired.key).await? {
        let kubeconfig = format!("# kubeconfig for cluster {cluster_id}\n").into_bytes();
        let password = format!("kubeadmin-{cluster_id}");
        source.persist_credentials(&desired.key, kubeconfig, password).await?;
        changes.push(Change::CredentialsPersisted { key: desired.key.clone(), cluster_id });
    }

    let conds = vec![
        conditions::spec_synced(&SyncOutcome::Ok),
        conditions::requirements_met(cluster.required_host_count(), cluster.status, &actual_hosts),
        conditions::validated(aggregate),
        conditions::completed(cluster.status, cluster.hold_installation),
        conditions::failed(cluster.status),
        conditions::stopped(cluster.status, cluster.install_completed_at.is_some()),
    ];
    source.put_conditions(&desired.key, conds).await?;

    Ok(changes)
}

fn spec_diverged(cluster: &Cluster, desired: &DesiredCluster) -> bool {
    cluster.name != desired.name
        || cluster.base_dns_domain != desired.base_dns_domain
        || cluster.openshift_version != desired.openshift_version
        || cluster.network_type != desired.network_type
        || cluster.pull_secret != desired.pull_secret
        || cluster.ssh_public_key != desired.ssh_public_key
        || cluster.proxy != desired.proxy
        || cluster.install_config_overrides != desired.install_config_overrides
}

fn translate_desired(desired: &DesiredCluster, kind: ClusterKind, status: ClusterStatus) -> Cluster {
    let now = chrono::Utc::now();
    Cluster {
        id: ClusterId::new(),
        name: desired.name.clone(),
        base_dns_domain: desired.base_dns_domain.clone(),
        openshift_version: desired.openshift_version.clone(),
        cpu_architecture: "x86_64".into(),
        ha_mode: desired.ha_mode,
        worker_count: desired.worker_count,
        network_type: desired.network_type,
        cluster_networks: vec![],
        service_networks: vec![],
        machine_networks: vec![],
        api_vip: None,
        ingress_vip: None,
        pull_secret: desired.pull_secret.clone(),
        ssh_public_key: desired.ssh_public_key.clone(),
        proxy: desired.proxy.clone(),
        disk_encryption: Default::default(),
        install_config_overrides: desired.install_config_overrides.clone(),
        kind,
        monitored_operators: vec![],
        validations: serde_json::json!({}),
        status,
        status_info: String::new(),
        status_updated_at: now,
        install_started_at: None,
        install_completed_at: if status == ClusterStatus::Installed { Some(now) } else { None },
        controller_logs_collected_at: None,
        hold_installation: desired.hold_installation,
        revision: 0,
    }
}

async fn infra_env_for(store: &dyn StateStore, hosts: &[Host]) -> Result<InfraEnv, ReconcileError> {
    if let Some(host) = hosts.first() {
        if let Some(env) = store.get_infra_env(host.infra_env_id).await? {
            return Ok(env);
        }
    }
    Ok(InfraEnv {
        id: InfraEnvId::new(),
        pull_secret: String::new(),
        ssh_public_key: None,
        proxy: ProxyConfig::default(),
        static_network_config: None,
        cpu_architecture: String::new(),
        image_expires_at: None,
        revision: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_domain::{HaMode, NetworkType};
    use ais_store::InMemoryStore;
    use std::sync::Arc;

    use crate::report::SpokeKey;
    use crate::source::InMemoryDeclarativeSource;

    fn desired(key: SpokeKey) -> DesiredCluster {
        DesiredCluster {
            key,
            backend_cluster_id: None,
            deleted: false,
            desired_installed: false,
            name: "sno-1".into(),
            base_dns_domain: "example.com".into(),
            openshift_version: "4.16.0".into(),
            ha_mode: HaMode::None,
            worker_count: 0,
            network_type: NetworkType::Ovn,
            pull_secret: "{}".into(),
            ssh_public_key: None,
            proxy: ProxyConfig::default(),
            install_config_overrides: None,
            hold_installation: false,
        }
    }

    #[tokio::test]
    async fn first_sweep_registers_a_new_cluster() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let hostsm = HostStateMachine::new(store.clone());
        let clustersm = ClusterStateMachine::new(store.clone());
        let source = InMemoryDeclarativeSource::new();
        let key = SpokeKey { namespace: "default".into(), name: "sno-1".into() };
        source.put_desired_cluster(desired(key.clone()));

        let report = reconcile(&source, store.clone(), &hostsm, &clustersm).await.unwrap();
        assert_eq!(report.errors.len(), 0);
        assert_eq!(report.changes.len(), 1);
        assert!(matches!(report.changes[0], Change::ClusterRegistered { .. }));

        let clusters = store.list_clusters().await.unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].status, ClusterStatus::PendingForInput);
        assert!(source.conditions_for(&key).is_some());
    }

    #[tokio::test]
    async fn second_sweep_is_idempotent_after_backend_id_recorded() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let hostsm = HostStateMachine::new(store.clone());
        let clustersm = ClusterStateMachine::new(store.clone());
        let source = InMemoryDeclarativeSource::new();
        let key = SpokeKey { namespace: "default".into(), name: "sno-1".into() };
        source.put_desired_cluster(desired(key.clone()));

        reconcile(&source, store.clone(), &hostsm, &clustersm).await.unwrap();
        let report = reconcile(&source, store.clone(), &hostsm, &clustersm).await.unwrap();
        assert!(report.changes.is_empty());
        assert_eq!(store.list_clusters().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deletion_deregisters_the_backend_cluster() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let hostsm = HostStateMachine::new(store.clone());
        let clustersm = ClusterStateMachine::new(store.clone());
        let source = InMemoryDeclarativeSource::new();
        let key = SpokeKey { namespace: "default".into(), name: "sno-1".into() };
        source.put_desired_cluster(desired(key.clone()));
        reconcile(&source, store.clone(), &hostsm, &clustersm).await.unwrap();

        let backend_id = source
            .list_desired_clusters()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.key == key)
            .and_then(|c| c.backend_cluster_id);

        let mut d = desired(key.clone());
        d.backend_cluster_id = backend_id;
        d.deleted = true;
        source.put_desired_cluster(d);

        reconcile(&source, store.clone(), &hostsm, &clustersm).await.unwrap();
        assert_eq!(store.list_clusters().await.unwrap().len(), 0);
    }
}
