use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::error::ConfigError;

/// Where completed clusters and their artifacts get deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployTarget {
    K8s,
    Onprem,
    Ocp,
}

/// Where large blobs (ISOs, logs, kubeconfigs) are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Filesystem,
}

/// Process-wide configuration, loaded once at startup from the environment
/// (§6 of the wire protocol / environment variable table).
#[derive(Debug, Clone)]
pub struct AssistedConfig {
    pub host_monitor_interval: Duration,
    pub cluster_monitor_interval: Duration,
    pub infraenv_deletion_worker_interval: Duration,
    pub approve_csrs_requeue_duration: Duration,
    pub liveness_validation_timeout: Duration,
    pub deploy_target: DeployTarget,
    pub storage_backend: StorageBackend,
    pub v1_api_enabled: bool,
    pub release_image_mirror: Option<String>,
    pub must_gather_images: HashMap<String, String>,
}

impl AssistedConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let cfg = AssistedConfig {
            host_monitor_interval: duration_seconds("HOST_MONITOR_INTERVAL", 8)?,
            cluster_monitor_interval: duration_seconds("CLUSTER_MONITOR_INTERVAL", 10)?,
            infraenv_deletion_worker_interval: duration_seconds(
                "INFRAENV_DELETION_WORKER_INTERVAL",
                3600,
            )?,
            approve_csrs_requeue_duration: duration_seconds(
                "APPROVE_CSRS_REQUEUE_DURATION",
                60,
            )?,
            liveness_validation_timeout: duration_seconds("LIVENESS_VALIDATION_TIMEOUT", 300)?,
            deploy_target: deploy_target("DEPLOY_TARGET", DeployTarget::Onprem)?,
            storage_backend: storage_backend("STORAGE", StorageBackend::Filesystem)?,
            v1_api_enabled: bool_var("V1_API_ENABLED", true)?,
            release_image_mirror: std::env::var("RELEASE_IMAGE_MIRROR").ok(),
            must_gather_images: must_gather_images("MUST_GATHER_IMAGES")?,
        };
        debug!(?cfg.deploy_target, ?cfg.storage_backend, "loaded assisted-service config");
        Ok(cfg)
    }
}

fn duration_seconds(var: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => {
            let secs: u64 = parse_duration_suffix(&raw).ok_or_else(|| ConfigError::Parse {
                var: var.to_string(),
                message: format!("'{raw}' is not a duration like '8s', '10m', '1h'"),
            })?;
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}

/// Parses durations of the Go `time.Duration`-string form the original
/// service accepts for these variables: a number followed by `s`, `m`, or `h`.
fn parse_duration_suffix(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Some(num) = raw.strip_suffix('h') {
        return num.parse::<u64>().ok().map(|n| n * 3600);
    }
    if let Some(num) = raw.strip_suffix('m') {
        return num.parse::<u64>().ok().map(|n| n * 60);
    }
    if let Some(num) = raw.strip_suffix('s') {
        return num.parse::<u64>().ok();
    }
    raw.parse::<u64>().ok()
}

fn deploy_target(var: &str, default: DeployTarget) -> Result<DeployTarget, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "k8s" => Ok(DeployTarget::K8s),
            "onprem" => Ok(DeployTarget::Onprem),
            "ocp" => Ok(DeployTarget::Ocp),
            other => Err(ConfigError::Parse {
                var: var.to_string(),
                message: format!("unknown deploy target '{other}'"),
            }),
        },
        Err(_) => Ok(default),
    }
}

fn storage_backend(var: &str, default: StorageBackend) -> Result<StorageBackend, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "filesystem" => Ok(StorageBackend::Filesystem),
            other => Err(ConfigError::Parse {
                var: var.to_string(),
                message: format!("unknown storage backend '{other}'"),
            }),
        },
        Err(_) => Ok(default),
    }
}

fn bool_var(var: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(ConfigError::Parse {
                var: var.to_string(),
                message: format!("'{other}' is not a boolean"),
            }),
        },
        Err(_) => Ok(default),
    }
}

fn must_gather_images(var: &str) -> Result<HashMap<String, String>, ConfigError> {
    match std::env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => {
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
                var: var.to_string(),
                message: e.to_string(),
            })
        }
        _ => Ok(HashMap::new()),
    }
}
