use std::collections::HashMap;

use ais_clustersm::ClusterEvent;
use ais_domain::{
    Cluster, ClusterId, ClusterKind, ClusterStatus, ConnectivityReport, DiskEncryptionPolicy, HaMode, Host, HostId,
    HostRole, HostStatus, InfraEnv, InfraEnvId, InstallationProgress, Inventory, NetworkType, ProxyConfig, StepReply,
};
use ais_hostsm::HostEvent;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

// ── Health ────────────────────────────────────────────────────────────────────

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn ready(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store.list_clusters().await?;
    Ok(StatusCode::OK)
}

// ── Infra-envs / hosts (agent wire protocol, §6) ───────────────────────────────

pub async fn register_host(
    State(state): State<AppState>,
    Path((infra_env_id, host_id)): Path<(InfraEnvId, HostId)>,
) -> Result<Json<Host>, ApiError> {
    if let Some(existing) = state.store.get_host(host_id).await? {
        return Ok(Json(existing));
    }
    let host = Host {
        id: host_id,
        cluster_id: None,
        infra_env_id,
        role: HostRole::Auto,
        inventory: None,
        connectivity: None,
        installation_progress: InstallationProgress::default(),
        installer_args: vec![],
        logs_collected_at: None,
        approved: false,
        validations: json!({}),
        status: HostStatus::Discovering,
        status_info: String::new(),
        status_updated_at: chrono::Utc::now(),
        checked_in_at: Some(chrono::Utc::now()),
        revision: 0,
    };
    state.store.insert_host(host.clone()).await?;
    Ok(Json(host))
}

pub async fn update_inventory(
    State(state): State<AppState>,
    Path((_infra_env_id, host_id)): Path<(InfraEnvId, HostId)>,
    Json(inventory): Json<Inventory>,
) -> Result<Json<Host>, ApiError> {
    let host = state.hostsm.dispatch(host_id, HostEvent::UpdateInventory(inventory)).await?;
    Ok(Json(host))
}

pub async fn update_connectivity(
    State(state): State<AppState>,
    Path((_infra_env_id, host_id)): Path<(InfraEnvId, HostId)>,
    Json(report): Json<ConnectivityReport>,
) -> Result<Json<Host>, ApiError> {
    let host = state.hostsm.dispatch(host_id, HostEvent::UpdateConnectivity(report)).await?;
    Ok(Json(host))
}

pub async fn get_next_steps(
    State(state): State<AppState>,
    Path((infra_env_id, host_id)): Path<(InfraEnvId, HostId)>,
) -> Result<Json<Value>, ApiError> {
    let host = state
        .store
        .get_host(host_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("host '{host_id}' not found")))?;

    let (cluster, infra_env) = match host.cluster_id {
        Some(cluster_id) => {
            let cluster = state
                .store
                .get_cluster(cluster_id)
                .await?
                .ok_or_else(|| ApiError::internal(format!("host {host_id} bound to missing cluster {cluster_id}")))?;
            let infra_env = state
                .store
                .get_infra_env(infra_env_id)
                .await?
                .ok_or_else(|| ApiError::internal(format!("missing infra-env {infra_env_id}")))?;
            (cluster, infra_env)
        }
        // An unbound host can only be in a monitoring status, none of which
        // read the cluster/infra-env arguments, so a placeholder is safe.
        None => (placeholder_cluster(), placeholder_infra_env(infra_env_id)),
    };

    let steps = ais_dispatcher::next_steps(&cluster, &host, &infra_env, &state.images)?;
    Ok(Json(json!(steps)))
}

pub async fn post_step_reply(
    State(state): State<AppState>,
    Path(host_id): Path<HostId>,
    Json(reply): Json<StepReply>,
) -> Result<Json<Host>, ApiError> {
    let host = state.hostsm.dispatch(host_id, HostEvent::StepReply(reply)).await?;
    Ok(Json(host))
}

pub async fn update_progress(
    State(state): State<AppState>,
    Path(host_id): Path<HostId>,
    Json(progress): Json<InstallationProgress>,
) -> Result<Json<Host>, ApiError> {
    let mut host = state
        .store
        .get_host(host_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("host '{host_id}' not found")))?;
    host.installation_progress = progress;
    host.checked_in_at = Some(chrono::Utc::now());
    state.store.update_host(host.clone()).await?;
    Ok(Json(host))
}

pub async fn upload_logs(
    State(state): State<AppState>,
    Path(host_id): Path<HostId>,
) -> Result<StatusCode, ApiError> {
    let mut host = state
        .store
        .get_host(host_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("host '{host_id}' not found")))?;
    host.logs_collected_at = Some(chrono::Utc::now());
    state.store.update_host(host).await?;
    Ok(StatusCode::OK)
}

// ── Clusters ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateClusterBody {
    pub name: String,
    pub base_dns_domain: String,
    pub openshift_version: String,
    pub ha_mode: HaMode,
    #[serde(default)]
    pub worker_count: usize,
    #[serde(default)]
    pub kind: Option<ClusterKind>,
}

pub async fn create_cluster(
    State(state): State<AppState>,
    Json(body): Json<CreateClusterBody>,
) -> Result<Json<Cluster>, ApiError> {
    let cluster = Cluster {
        id: ClusterId::new(),
        name: body.name,
        base_dns_domain: body.base_dns_domain,
        openshift_version: body.openshift_version,
        cpu_architecture: "x86_64".into(),
        ha_mode: body.ha_mode,
        worker_count: body.worker_count,
        network_type: NetworkType::Ovn,
        cluster_networks: vec![],
        service_networks: vec![],
        machine_networks: vec![],
        api_vip: None,
        ingress_vip: None,
        pull_secret: String::new(),
        ssh_public_key: None,
        proxy: ProxyConfig::default(),
        disk_encryption: DiskEncryptionPolicy::default(),
        install_config_overrides: None,
        kind: body.kind.unwrap_or(ClusterKind::Day1),
        monitored_operators: vec![],
        validations: json!({}),
        status: ClusterStatus::PendingForInput,
        status_info: String::new(),
        status_updated_at: chrono::Utc::now(),
        install_started_at: None,
        install_completed_at: None,
        controller_logs_collected_at: None,
        hold_installation: false,
        revision: 0,
    };
    state.store.insert_cluster(cluster.clone()).await?;
    Ok(Json(cluster))
}

pub async fn list_clusters(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let clusters = state.store.list_clusters().await?;
    Ok(Json(json!(clusters)))
}

pub async fn get_cluster(
    State(state): State<AppState>,
    Path(cluster_id): Path<ClusterId>,
) -> Result<Json<Cluster>, ApiError> {
    let cluster = state
        .store
        .get_cluster(cluster_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("cluster '{cluster_id}' not found")))?;
    Ok(Json(cluster))
}

pub async fn bind_host(
    State(state): State<AppState>,
    Path((cluster_id, host_id)): Path<(ClusterId, HostId)>,
) -> Result<Json<Host>, ApiError> {
    state
        .store
        .get_cluster(cluster_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("cluster '{cluster_id}' not found")))?;

    state.hostsm.dispatch(host_id, HostEvent::Bind).await?;

    let mut host = state
        .store
        .get_host(host_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("host '{host_id}' not found")))?;
    host.cluster_id = Some(cluster_id);
    state.store.update_host(host.clone()).await?;
    host.revision += 1;
    Ok(Json(host))
}

pub async fn unbind_host(
    State(state): State<AppState>,
    Path((_cluster_id, host_id)): Path<(ClusterId, HostId)>,
) -> Result<Json<Host>, ApiError> {
    let host = state.hostsm.dispatch(host_id, HostEvent::Unbind).await?;
    Ok(Json(host))
}

pub async fn start_installation(
    State(state): State<AppState>,
    Path(cluster_id): Path<ClusterId>,
) -> Result<Json<Cluster>, ApiError> {
    let cluster = state.clustersm.dispatch(cluster_id, ClusterEvent::StartInstallation).await?;
    Ok(Json(cluster))
}

pub async fn cancel_cluster(
    State(state): State<AppState>,
    Path(cluster_id): Path<ClusterId>,
) -> Result<Json<Cluster>, ApiError> {
    let cluster = state.clustersm.dispatch(cluster_id, ClusterEvent::Cancel).await?;
    Ok(Json(cluster))
}

pub async fn set_hold_installation(
    State(state): State<AppState>,
    Path(cluster_id): Path<ClusterId>,
    Json(hold): Json<bool>,
) -> Result<Json<Cluster>, ApiError> {
    let cluster = state.clustersm.dispatch(cluster_id, ClusterEvent::SetHoldInstallation(hold)).await?;
    Ok(Json(cluster))
}

// ── Events / status ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub cluster_id: Option<ClusterId>,
    pub limit: Option<u32>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(q): Query<EventsQuery>,
) -> Result<Json<Value>, ApiError> {
    let events = state.store.list_events(q.cluster_id, q.limit.unwrap_or(100)).await?;
    Ok(Json(json!(events)))
}

pub async fn status(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let clusters = state.store.list_clusters().await?;
    let mut by_status: HashMap<String, usize> = HashMap::new();
    for c in &clusters {
        *by_status.entry(c.status.to_string()).or_default() += 1;
    }
    Ok(Json(json!({
        "cluster_count": clusters.len(),
        "by_status": by_status,
    })))
}

fn placeholder_cluster() -> Cluster {
    Cluster {
        id: ClusterId::new(),
        name: String::new(),
        base_dns_domain: String::new(),
        openshift_version: String::new(),
        cpu_architecture: String::new(),
        ha_mode: HaMode::Full,
        worker_count: 0,
        network_type: NetworkType::Ovn,
        cluster_networks: vec![],
        service_networks: vec![],
        machine_networks: vec![],
        api_vip: None,
        ingress_vip: None,
        pull_secret: String::new(),
        ssh_public_key: None,
        proxy: ProxyConfig::default(),
        disk_encryption: DiskEncryptionPolicy::default(),
        install_config_overrides: None,
        kind: ClusterKind::Day1,
        monitored_operators: vec![],
        validations: json!({}),
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

fn placeholder_infra_env(id: InfraEnvId) -> InfraEnv {
    InfraEnv {
        id,
        pull_secret: String::new(),
        ssh_public_key: None,
        proxy: ProxyConfig::default(),
        static_network_config: None,
        cpu_architecture: String::new(),
        image_expires_at: None,
        revision: 0,
    }
}
