use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Identifiers ──────────────────────────────────────────────────────────────

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok($name(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(u: Uuid) -> Self {
                $name(u)
            }
        }
    };
}

uuid_id!(ClusterId);
uuid_id!(HostId);
uuid_id!(InfraEnvId);

// ── Enums ─────────────────────────────────────────────────────────────────────

/// High-availability mode. `None` is the single-node (SNO) installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaMode {
    Full,
    None,
}

impl fmt::Display for HaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaMode::Full => write!(f, "full"),
            HaMode::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Sdn,
    Ovn,
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkType::Sdn => write!(f, "sdn"),
            NetworkType::Ovn => write!(f, "ovn"),
        }
    }
}

/// Day1 installs a new cluster; Day2Import adds hosts to one already installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterKind {
    Day1,
    Day2Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostRole {
    Auto,
    Master,
    Worker,
    Bootstrap,
}

impl fmt::Display for HostRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostRole::Auto => write!(f, "auto"),
            HostRole::Master => write!(f, "master"),
            HostRole::Worker => write!(f, "worker"),
            HostRole::Bootstrap => write!(f, "bootstrap"),
        }
    }
}

/// Cluster lifecycle states (§4.2 of the spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterStatus {
    PendingForInput,
    Insufficient,
    Ready,
    PreparingForInstallation,
    PreparingSuccessful,
    Installing,
    Finalizing,
    Installed,
    Error,
    Cancelled,
    AddingHosts,
}

impl ClusterStatus {
    /// Terminal states accept no further event-driven transition except
    /// explicit Reset/Deregister.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClusterStatus::Installed
                | ClusterStatus::Error
                | ClusterStatus::Cancelled
                | ClusterStatus::AddingHosts
        )
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClusterStatus::PendingForInput => "pending-for-input",
            ClusterStatus::Insufficient => "insufficient",
            ClusterStatus::Ready => "ready",
            ClusterStatus::PreparingForInstallation => "preparing-for-installation",
            ClusterStatus::PreparingSuccessful => "preparing-successful",
            ClusterStatus::Installing => "installing",
            ClusterStatus::Finalizing => "finalizing",
            ClusterStatus::Installed => "installed",
            ClusterStatus::Error => "error",
            ClusterStatus::Cancelled => "cancelled",
            ClusterStatus::AddingHosts => "adding-hosts",
        };
        write!(f, "{s}")
    }
}

/// Host lifecycle states (§4.1 of the spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostStatus {
    Discovering,
    Known,
    Insufficient,
    PendingForInput,
    Disconnected,
    Disabled,
    PreparingForInstallation,
    PreparingSuccessful,
    Installing,
    InstallingInProgress,
    Installed,
    InstallingPendingUserAction,
    Resetting,
    ResettingPendingUserAction,
    Error,
    Cancelled,
    AddedToExistingCluster,
}

impl HostStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HostStatus::Installed
                | HostStatus::AddedToExistingCluster
                | HostStatus::Error
                | HostStatus::Cancelled
                | HostStatus::Disabled
        )
    }

    /// States in which the host is actively moving toward `installed` and thus
    /// counted as "installable" by the cluster's readiness/progress checks.
    pub fn is_in_installing_family(&self) -> bool {
        matches!(
            self,
            HostStatus::PreparingForInstallation
                | HostStatus::PreparingSuccessful
                | HostStatus::Installing
                | HostStatus::InstallingInProgress
                | HostStatus::InstallingPendingUserAction
        )
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HostStatus::Discovering => "discovering",
            HostStatus::Known => "known",
            HostStatus::Insufficient => "insufficient",
            HostStatus::PendingForInput => "pending-for-input",
            HostStatus::Disconnected => "disconnected",
            HostStatus::Disabled => "disabled",
            HostStatus::PreparingForInstallation => "preparing-for-installation",
            HostStatus::PreparingSuccessful => "preparing-successful",
            HostStatus::Installing => "installing",
            HostStatus::InstallingInProgress => "installing-in-progress",
            HostStatus::Installed => "installed",
            HostStatus::InstallingPendingUserAction => "installing-pending-user-action",
            HostStatus::Resetting => "resetting",
            HostStatus::ResettingPendingUserAction => "resetting-pending-user-action",
            HostStatus::Error => "error",
            HostStatus::Cancelled => "cancelled",
            HostStatus::AddedToExistingCluster => "added-to-existing-cluster",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFolder {
    Openshift,
    Manifests,
}

impl fmt::Display for ManifestFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestFolder::Openshift => write!(f, "openshift"),
            ManifestFolder::Manifests => write!(f, "manifests"),
        }
    }
}

// ── Networking ────────────────────────────────────────────────────────────────

/// A CIDR block, validated at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cidr(pub String);

impl Cidr {
    pub fn new(s: impl Into<String>) -> Result<Self, crate::error::DomainError> {
        let s = s.into();
        s.parse::<ipnet::IpNet>()
            .map_err(|_| crate::error::DomainError::InvalidCidr(s.clone()))?;
        Ok(Cidr(s))
    }

    pub fn parsed(&self) -> ipnet::IpNet {
        // Constructed only via `new`, which validates; callers that deserialize
        // from storage trust the store to round-trip previously-valid values.
        self.0.parse().expect("Cidr invariant: validated at construction")
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self.parsed(), ipnet::IpNet::V6(_))
    }

    pub fn contains(&self, addr: std::net::IpAddr) -> bool {
        self.parsed().contains(&addr)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Option<String>,
}

impl ProxyConfig {
    pub fn is_set(&self) -> bool {
        self.http_proxy.is_some() || self.https_proxy.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskEncryptionMode {
    Tpmv2,
    Tang,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiskEncryptionEnableOn {
    None,
    All,
    Masters,
    Workers,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskEncryptionPolicy {
    pub enable_on: Option<DiskEncryptionEnableOn>,
    pub mode: Option<DiskEncryptionMode>,
}

// ── Monitored operators ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorStatusKind {
    Pending,
    Progressing,
    Available,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredOperator {
    pub name: String,
    /// True for the cluster-version operator, which gates `finalizing` -> `installed`.
    pub is_cvo: bool,
    pub status: OperatorStatusKind,
    pub status_info: Option<String>,
}

// ── Inventory / connectivity ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    pub name: String,
    pub by_path: String,
    pub size_bytes: u64,
    pub bootable: bool,
    pub removable: bool,
    pub is_installation_media: bool,
}

impl Disk {
    /// Ground rule from the original installer (`getDisksToFormat`): a disk is
    /// wiped on install only if it's a bootable, fixed, non-removable-media
    /// disk that isn't itself the installation media.
    pub fn is_format_candidate(&self) -> bool {
        let is_fc_iscsi = self.by_path.contains("-fc-") || self.by_path.contains("-iscsi-");
        let is_mmcblk = self.by_path.contains("mmcblk");
        self.bootable && !self.removable && !is_mmcblk && !is_fc_iscsi && !self.is_installation_media
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nic {
    pub name: String,
    pub mac_address: String,
    /// CIDR-form addresses, e.g. `192.168.1.10/24`.
    pub ipv4_addresses: Vec<String>,
    pub ipv6_addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub hostname: String,
    pub cpu_cores: u32,
    pub memory_bytes: u64,
    pub disks: Vec<Disk>,
    pub interfaces: Vec<Nic>,
    pub boot_device: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    /// Host ids (as strings) this host can reach, keyed loosely so the
    /// validation engine can reason about L2/L3 connectivity without needing
    /// the full inventory of the remote side.
    pub reachable_host_ids: Vec<String>,
    pub ntp_synced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationStage {
    StartingInstallation,
    WaitingForControlPlane,
    WaitingForBootkube,
    WaitingForController,
    Rebooting,
    ConfiguringHost,
    JoinedCluster,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallationProgress {
    pub stage: Option<InstallationStage>,
    pub info: Option<String>,
    pub stage_started_at: Option<DateTime<Utc>>,
    pub stage_updated_at: Option<DateTime<Utc>>,
}

// ── Core entities ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub name: String,
    pub base_dns_domain: String,
    pub openshift_version: String,
    pub cpu_architecture: String,
    pub ha_mode: HaMode,
    /// Desired worker count from the provision request (§4.6, §8). Control
    /// plane count is derived from `ha_mode`; worker count is not, so it is
    /// carried as its own field rather than inferred.
    pub worker_count: usize,
    pub network_type: NetworkType,
    pub cluster_networks: Vec<Cidr>,
    pub service_networks: Vec<Cidr>,
    pub machine_networks: Vec<Cidr>,
    pub api_vip: Option<std::net::IpAddr>,
    pub ingress_vip: Option<std::net::IpAddr>,
    pub pull_secret: String,
    pub ssh_public_key: Option<String>,
    pub proxy: ProxyConfig,
    pub disk_encryption: DiskEncryptionPolicy,
    pub install_config_overrides: Option<String>,
    pub kind: ClusterKind,
    pub monitored_operators: Vec<MonitoredOperator>,
    /// Serialized validations blob, refreshed atomically with any write that
    /// could change it (§3, §4.3).
    pub validations: serde_json::Value,
    pub status: ClusterStatus,
    pub status_info: String,
    pub status_updated_at: DateTime<Utc>,
    pub install_started_at: Option<DateTime<Utc>>,
    pub install_completed_at: Option<DateTime<Utc>>,
    pub controller_logs_collected_at: Option<DateTime<Utc>>,
    /// Hold-installation toggle mirrored from the declarative record (§4.6).
    pub hold_installation: bool,
    pub revision: u64,
}

impl Cluster {
    pub fn control_plane_count(&self) -> usize {
        match self.ha_mode {
            HaMode::None => 1,
            HaMode::Full => 3,
        }
    }

    /// Total hosts the provision request calls for: control plane plus
    /// requested workers (§4.6, §8 "Additional agents"/"Unapproved agents").
    pub fn required_host_count(&self) -> usize {
        self.control_plane_count() + self.worker_count
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub cluster_id: Option<ClusterId>,
    pub infra_env_id: InfraEnvId,
    pub role: HostRole,
    pub inventory: Option<Inventory>,
    pub connectivity: Option<ConnectivityReport>,
    pub installation_progress: InstallationProgress,
    /// Extra `installer` CLI args, e.g. `--save-partindex`. Stored as given by
    /// the caller; the dispatcher inspects them verbatim (§4.4).
    pub installer_args: Vec<String>,
    pub logs_collected_at: Option<DateTime<Utc>>,
    pub approved: bool,
    pub validations: serde_json::Value,
    pub status: HostStatus,
    pub status_info: String,
    pub status_updated_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

impl Host {
    /// Whether the installer args already carry `--save-partindex`, which
    /// suppresses disk-cleanup (§4.4, testable property 7).
    pub fn save_partindex_set(&self) -> bool {
        self.installer_args.iter().any(|a| a == "--save-partindex")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfraEnv {
    pub id: InfraEnvId,
    pub pull_secret: String,
    pub ssh_public_key: Option<String>,
    pub proxy: ProxyConfig,
    pub static_network_config: Option<String>,
    pub cpu_architecture: String,
    pub image_expires_at: Option<DateTime<Utc>>,
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub cluster_id: Option<ClusterId>,
    pub host_id: Option<HostId>,
    pub infra_env_id: Option<InfraEnvId>,
    pub severity: EventSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub cluster_id: ClusterId,
    pub folder: ManifestFolder,
    pub filename: String,
    pub contents: String,
}

// ── Transient step protocol (§3, §6) ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Inventory,
    ConnectivityCheck,
    FreeNetworkAddresses,
    NtpSynchronizer,
    ImageAvailability,
    ApiVipConnectivityCheck,
    DomainResolution,
    DiskSpeedCheck,
    ContainerImageAvailability,
    InstallationDiskCleanup,
    Install,
    ResetInstallation,
    LogsGather,
    NextStepRunner,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepKind::Inventory => "inventory",
            StepKind::ConnectivityCheck => "connectivity-check",
            StepKind::FreeNetworkAddresses => "free-network-addresses",
            StepKind::NtpSynchronizer => "ntp-synchronizer",
            StepKind::ImageAvailability => "image-availability",
            StepKind::ApiVipConnectivityCheck => "api-vip-connectivity-check",
            StepKind::DomainResolution => "domain-resolution",
            StepKind::DiskSpeedCheck => "disk-speed-check",
            StepKind::ContainerImageAvailability => "container-image-availability",
            StepKind::InstallationDiskCleanup => "installation-disk-cleanup",
            StepKind::Install => "install",
            StepKind::ResetInstallation => "reset-installation",
            StepKind::LogsGather => "logs-gather",
            StepKind::NextStepRunner => "next-step-runner",
        };
        write!(f, "{s}")
    }
}

/// A single instruction handed to an agent on a poll (§3, §4.4, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub step_id: String,
    pub kind: StepKind,
    /// Arguments, already serialized to the string form the wire protocol
    /// expects (a single JSON object string for disk-cleanup, a full shell
    /// command line for install, etc.).
    pub args: Vec<String>,
    pub timeout_seconds: u64,
}

/// The agent's response to a previously-emitted [`Step`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReply {
    pub step_id: String,
    pub exit_code: i32,
    pub output: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskCleanupRequest {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskCleanupResponse {
    pub path: String,
    pub successful: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployTarget {
    K8s,
    Onprem,
    Ocp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Filesystem,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MustGatherImages(pub HashMap<String, String>);

impl MustGatherImages {
    /// Ground rule from the original installer (`getMustGatherArgument`): a
    /// single `"ocp"` entry collapses to a bare image string for backward
    /// compatibility; anything richer is passed as a JSON map.
    pub fn to_installer_arg(&self) -> Result<String, serde_json::Error> {
        if self.0.len() == 1 {
            if let Some(ocp) = self.0.get("ocp") {
                return Ok(ocp.clone());
            }
        }
        serde_json::to_string(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cidr_rejects_garbage() {
        assert!(Cidr::new("not-a-cidr").is_err());
    }

    #[test]
    fn cidr_accepts_v4_and_v6() {
        let v4 = Cidr::new("192.168.0.0/24").unwrap();
        assert!(!v4.is_ipv6());
        let v6 = Cidr::new("fd00::/64").unwrap();
        assert!(v6.is_ipv6());
    }

    #[test]
    fn disk_format_candidate_rules() {
        let mut d = Disk { name: "sda".into(), by_path: "/pci/sda".into(), size_bytes: 1, bootable: true, removable: false, is_installation_media: false };
        assert!(d.is_format_candidate());
        d.removable = true;
        assert!(!d.is_format_candidate());
        d.removable = false;
        d.by_path = "/pci-fc-1/sda".into();
        assert!(!d.is_format_candidate());
    }

    #[test]
    fn must_gather_single_ocp_collapses_to_bare_string() {
        let mut m = HashMap::new();
        m.insert("ocp".to_string(), "quay.io/openshift/must-gather:ocp".to_string());
        let images = MustGatherImages(m);
        assert_eq!(images.to_installer_arg().unwrap(), "quay.io/openshift/must-gather:ocp");
    }

    #[test]
    fn must_gather_multi_image_map_is_json() {
        let mut m = HashMap::new();
        m.insert("ocp".to_string(), "img1".to_string());
        m.insert("lso".to_string(), "img2".to_string());
        let images = MustGatherImages(m);
        let parsed: HashMap<String, String> = serde_json::from_str(&images.to_installer_arg().unwrap()).unwrap();
        assert_eq!(parsed, m);
    }
}
