use std::path::{Path, PathBuf};
use std::sync::Arc;

use ais_dispatcher::InstallerImages;
use ais_domain::{ClusterId, HaMode, HostId, NetworkType, ProxyConfig};
use ais_monitor::{AlwaysLeader, ClusterMonitor, HostMonitor};
use ais_reconciler::{DesiredCluster, DesiredHost, InMemoryDeclarativeSource, SpokeKey};
use ais_store::{InMemoryStore, SqlStore, StateStore};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use uuid::Uuid;

use crate::cli::{ClustersCommand, HostsCommand};
use crate::output;

// ── Server ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub async fn serve(
    bind: String,
    port: u16,
    token: Option<String>,
    rotate_token: bool,
    database_url: Option<String>,
    installer_image: String,
    controller_image: String,
    agent_image: String,
    mco_image: String,
    release_image_url: String,
    service_base_url: String,
    skip_cert_verification: bool,
    check_cluster_version: bool,
) -> Result<()> {
    let config = ais_config::AssistedConfig::from_env().context("loading assisted-service config")?;

    let token = if rotate_token {
        let fresh = generate_token();
        write_token(&fresh)?;
        fresh
    } else {
        resolve_token(token)?
    };
    tracing::info!(%bind, %port, "starting assisted installation service");

    let store: Arc<dyn StateStore> = open_store(database_url).await?;

    let images = Arc::new(InstallerImages {
        installer_image,
        controller_image,
        agent_image,
        mco_image,
        release_image_url,
        must_gather_images: Default::default(),
        service_base_url,
        skip_cert_verification,
        check_cluster_version,
        service_ca_cert_path: None,
    });

    let app = ais_api::build_app(store.clone(), Arc::new(token), images);

    let leader_gate = Arc::new(AlwaysLeader);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let host_monitor = HostMonitor::new(
        store.clone(),
        leader_gate.clone(),
        config.host_monitor_interval,
        config.liveness_validation_timeout,
    );
    let cluster_monitor = ClusterMonitor::new(store.clone(), leader_gate, config.cluster_monitor_interval);
    let host_monitor_task = tokio::spawn(host_monitor.run(shutdown_rx.clone()));
    let cluster_monitor_task = tokio::spawn(cluster_monitor.run(shutdown_rx));

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("binding {bind}:{port}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = host_monitor_task.await;
    let _ = cluster_monitor_task.await;
    Ok(())
}

async fn open_store(database_url: Option<String>) -> Result<Arc<dyn StateStore>> {
    match database_url {
        Some(url) => {
            let store = SqlStore::connect(&url).await.context("connecting to postgres")?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no DATABASE_URL given, using an in-memory store (state is lost on exit)");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

// ── Reconcile ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ManifestHost {
    backend_host_id: Option<HostId>,
    #[serde(default)]
    approved: bool,
}

#[derive(Debug, Deserialize)]
struct ManifestCluster {
    namespace: String,
    name: String,
    #[serde(default)]
    backend_cluster_id: Option<ClusterId>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    desired_installed: bool,
    base_dns_domain: String,
    openshift_version: String,
    ha_mode: HaMode,
    #[serde(default)]
    worker_count: usize,
    network_type: NetworkType,
    #[serde(default)]
    pull_secret: String,
    #[serde(default)]
    ssh_public_key: Option<String>,
    #[serde(default)]
    proxy: ProxyConfig,
    #[serde(default)]
    install_config_overrides: Option<String>,
    #[serde(default)]
    hold_installation: bool,
    #[serde(default)]
    hosts: Vec<ManifestHost>,
}

/// Runs one reconciliation sweep against a JSON manifest of desired clusters,
/// loading it into an in-memory declarative source. A real deployment wires
/// [`ais_reconciler::DeclarativeSource`] to a live watch of external desired
/// state instead of a flat file; this is the local/offline equivalent.
pub async fn reconcile(manifest: PathBuf, database_url: Option<String>) -> Result<()> {
    let raw = std::fs::read_to_string(&manifest)
        .with_context(|| format!("reading manifest {}", manifest.display()))?;
    let entries: Vec<ManifestCluster> = serde_json::from_str(&raw).context("parsing manifest JSON")?;

    let store = open_store(database_url).await?;
    let hostsm = ais_hostsm::HostStateMachine::new(store.clone());
    let clustersm = ais_clustersm::ClusterStateMachine::new(store.clone());
    let source = InMemoryDeclarativeSource::new();

    for entry in entries {
        let key = SpokeKey { namespace: entry.namespace, name: entry.name.clone() };
        source.put_desired_hosts(
            key.clone(),
            entry
                .hosts
                .iter()
                .map(|h| DesiredHost { backend_host_id: h.backend_host_id, approved: h.approved })
                .collect(),
        );
        source.put_desired_cluster(DesiredCluster {
            key,
            backend_cluster_id: entry.backend_cluster_id,
            deleted: entry.deleted,
            desired_installed: entry.desired_installed,
            name: entry.name,
            base_dns_domain: entry.base_dns_domain,
            openshift_version: entry.openshift_version,
            ha_mode: entry.ha_mode,
            worker_count: entry.worker_count,
            network_type: entry.network_type,
            pull_secret: entry.pull_secret,
            ssh_public_key: entry.ssh_public_key,
            proxy: entry.proxy,
            install_config_overrides: entry.install_config_overrides,
            hold_installation: entry.hold_installation,
        });
    }

    let report = ais_reconciler::reconcile(&source, store, &hostsm, &clustersm).await?;
    println!("{}", output::render_changes(&report.changes));
    if !report.errors.is_empty() {
        for e in &report.errors {
            eprintln!("error: {e}");
        }
        bail!("{} cluster(s) failed to reconcile", report.errors.len());
    }
    Ok(())
}

// ── Remote admin commands ──────────────────────────────────────────────────────

pub async fn status(remote: String, token: Option<String>) -> Result<()> {
    let client = authed_client(token)?;
    let resp = client.get(format!("{remote}/status")).send().await?.error_for_status()?;
    let body: serde_json::Value = resp.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

pub async fn clusters(command: ClustersCommand, remote: String, token: Option<String>) -> Result<()> {
    let client = authed_client(token)?;
    match command {
        ClustersCommand::List => {
            let body: serde_json::Value =
                client.get(format!("{remote}/v2/clusters")).send().await?.error_for_status()?.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        ClustersCommand::Get { id } => {
            let body: serde_json::Value = client
                .get(format!("{remote}/v2/clusters/{id}"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        ClustersCommand::Create { file } => {
            let raw = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&raw)?;
            let body: serde_json::Value = client
                .post(format!("{remote}/v2/clusters"))
                .json(&payload)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        ClustersCommand::Install { id } => {
            let body: serde_json::Value = client
                .post(format!("{remote}/v2/clusters/{id}/actions/install"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        ClustersCommand::Cancel { id } => {
            let body: serde_json::Value = client
                .post(format!("{remote}/v2/clusters/{id}/actions/cancel"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        ClustersCommand::Hold { id, off } => {
            let body: serde_json::Value = client
                .post(format!("{remote}/v2/clusters/{id}/actions/hold-installation"))
                .json(&!off)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(())
}

pub async fn hosts(command: HostsCommand, remote: String, token: Option<String>) -> Result<()> {
    let client = authed_client(token)?;
    match command {
        HostsCommand::Bind { cluster, host } => {
            let body: serde_json::Value = client
                .post(format!("{remote}/v2/clusters/{cluster}/hosts/{host}/bind"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        HostsCommand::Unbind { cluster, host } => {
            client
                .post(format!("{remote}/v2/clusters/{cluster}/hosts/{host}/unbind"))
                .send()
                .await?
                .error_for_status()?;
            println!("unbound host {host}");
        }
    }
    Ok(())
}

pub async fn events(remote: String, token: Option<String>, cluster: Option<ClusterId>, limit: u32) -> Result<()> {
    let client = authed_client(token)?;
    let mut req = client.get(format!("{remote}/events")).query(&[("limit", limit.to_string())]);
    if let Some(id) = cluster {
        req = req.query(&[("cluster_id", id.to_string())]);
    }
    let body: serde_json::Value = req.send().await?.error_for_status()?.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

// ── Token management ─────────────────────────────────────────────────────────

fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn default_token_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    Path::new(&home).join(".ais").join("token")
}

fn resolve_token(given: Option<String>) -> Result<String> {
    if let Some(t) = given {
        return Ok(t);
    }
    let path = default_token_path();
    if let Ok(existing) = std::fs::read_to_string(&path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }
    let fresh = generate_token();
    write_token(&fresh)?;
    Ok(fresh)
}

fn write_token(token: &str) -> Result<()> {
    let path = default_token_path();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    std::fs::write(&path, token).with_context(|| format!("writing {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
    }
    tracing::info!(path = %path.display(), "wrote bearer token");
    Ok(())
}

fn authed_client(token: Option<String>) -> Result<reqwest::Client> {
    let token = resolve_token(token)?;
    let mut headers = reqwest::header::HeaderMap::new();
    let mut value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))?;
    value.set_sensitive(true);
    headers.insert(reqwest::header::AUTHORIZATION, value);
    Ok(reqwest::Client::builder().default_headers(headers).build()?)
}
