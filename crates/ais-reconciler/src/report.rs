use ais_domain::{ClusterId, HaMode, HostId, NetworkType, ProxyConfig};
use serde::{Deserialize, Serialize};

/// Stable lookup key for a declarative cluster record, mirroring the
/// (namespace, name) pair the original keeps between a hub-side resource and
/// its spoke cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpokeKey {
    pub namespace: String,
    pub name: String,
}

impl std::fmt::Display for SpokeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A desired cluster as read from the declarative source (ClusterDeployment +
/// AgentClusterInstall, merged).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredCluster {
    pub key: SpokeKey,
    /// Set once the reconciler has created (or matched) the backend Cluster;
    /// absent on first sight of a brand-new declarative record.
    pub backend_cluster_id: Option<ClusterId>,
    pub deleted: bool,
    /// True for a day-2 import of an already-installed cluster.
    pub desired_installed: bool,
    pub name: String,
    pub base_dns_domain: String,
    pub openshift_version: String,
    pub ha_mode: HaMode,
    /// Requested worker count, independent of `ha_mode` (§4.6, §8).
    #[serde(default)]
    pub worker_count: usize,
    pub network_type: NetworkType,
    pub pull_secret: String,
    pub ssh_public_key: Option<String>,
    pub proxy: ProxyConfig,
    pub install_config_overrides: Option<String>,
    pub hold_installation: bool,
}

/// A desired host (Agent/BareMetalHost) referenced by a [`DesiredCluster`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredHost {
    pub backend_host_id: Option<HostId>,
    pub approved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionKind {
    SpecSynced,
    RequirementsMet,
    Validated,
    Completed,
    Failed,
    Stopped,
}

/// One of the six mirrored status conditions (§4.6): kind, status, a closed
/// reason from that kind's reason set, and a human message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub kind: ConditionKind,
    pub status: ConditionStatus,
    pub reason: &'static str,
    pub message: String,
}

impl Condition {
    pub fn new(kind: ConditionKind, status: ConditionStatus, reason: &'static str, message: impl Into<String>) -> Self {
        Condition { kind, status, reason, message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Change {
    ClusterRegistered { key: SpokeKey, cluster_id: ClusterId },
    ClusterImported { key: SpokeKey, cluster_id: ClusterId },
    ClusterUpdated { key: SpokeKey, cluster_id: ClusterId },
    InstallationStarted { key: SpokeKey, cluster_id: ClusterId },
    ClusterCancelled { key: SpokeKey, cluster_id: ClusterId },
    ClusterDeregistered { key: SpokeKey, cluster_id: ClusterId },
    CredentialsPersisted { key: SpokeKey, cluster_id: ClusterId },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReconcileReport {
    pub changes: Vec<Change>,
    pub errors: Vec<String>,
}
