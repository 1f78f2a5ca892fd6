use std::collections::BTreeMap;
use std::time::Duration;

use ais_domain::{Cluster, HaMode, Host, HostId, HostRole, HostStatus, InfraEnv, NetworkType};
use chrono::{DateTime, Utc};

/// Fallback connection timeout for callers without access to the service's
/// configured `liveness_validation_timeout` (§6).
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(300);

/// Cluster-level and host-level condition identifiers (§4.3).
///
/// A closed enum rather than a free string so aggregation and the
/// reconciler's `Validated` mapping are exhaustive matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionId {
    // Cluster-level
    MachineCidrDefined,
    CidrsDisjoint,
    VipsDefinedAndInMachineCidr,
    VipsDistinctFromHostIps,
    PullSecretValid,
    DnsDomainValid,
    EnoughMasters,
    EnoughWorkers,
    NoConflictingDiskEncryption,
    NetworkTypeCompatibleWithIpFamily,
    NtpSyncPlausible,
    // Host-level
    Connected,
    HasInventory,
    HasMinimumCpu,
    HasMinimumMemory,
    HasMinimumDisk,
    RoleAssignable,
    MachineCidrBelongs,
    IgnitionDownloadable,
    ContainerImagesAvailable,
    NtpSynced,
    NoPartialDiskEncryption,
    BootDeviceSuitable,
}

/// Status ordering for aggregation: `failure > pending > success` (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Success,
    Pending,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub message: String,
}

impl ValidationResult {
    fn success(message: impl Into<String>) -> Self {
        ValidationResult { status: ValidationStatus::Success, message: message.into() }
    }

    fn failure(message: impl Into<String>) -> Self {
        ValidationResult { status: ValidationStatus::Failure, message: message.into() }
    }

    fn pending(message: impl Into<String>) -> Self {
        ValidationResult { status: ValidationStatus::Pending, message: message.into() }
    }
}

pub type ConditionMap = BTreeMap<ConditionId, ValidationResult>;

/// Aggregate validation output for one snapshot: cluster-level conditions plus
/// a per-host condition map.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ValidationReport {
    pub cluster: ConditionMap,
    pub hosts: BTreeMap<HostId, ConditionMap>,
}

impl ValidationReport {
    /// Worst status across every condition, cluster and host alike.
    pub fn aggregate_status(&self) -> ValidationStatus {
        self.cluster
            .values()
            .chain(self.hosts.values().flat_map(|m| m.values()))
            .map(|r| r.status)
            .max()
            .unwrap_or(ValidationStatus::Success)
    }
}

/// Pure function mapping a cluster snapshot to a full validation report.
/// No I/O, no side effects; deterministic for a given input — `now` and
/// `connection_timeout` are passed in rather than read from the clock so a
/// given snapshot always validates the same way.
pub fn validate(
    cluster: &Cluster,
    hosts: &[Host],
    infra_env: &InfraEnv,
    now: DateTime<Utc>,
    connection_timeout: Duration,
) -> ValidationReport {
    let cluster_conditions = validate_cluster(cluster, hosts);
    let mut host_conditions = BTreeMap::new();
    for host in hosts {
        host_conditions.insert(host.id, validate_host(cluster, host, infra_env, now, connection_timeout));
    }
    ValidationReport { cluster: cluster_conditions, hosts: host_conditions }
}

fn validate_cluster(cluster: &Cluster, hosts: &[Host]) -> ConditionMap {
    let mut out = ConditionMap::new();

    out.insert(
        ConditionId::MachineCidrDefined,
        if cluster.machine_networks.is_empty() {
            ValidationResult::failure("no machine network CIDR is defined")
        } else {
            ValidationResult::success("machine network CIDR is defined")
        },
    );

    out.insert(ConditionId::CidrsDisjoint, check_cidrs_disjoint(cluster));
    out.insert(ConditionId::VipsDefinedAndInMachineCidr, check_vips_in_cidr(cluster));
    out.insert(ConditionId::VipsDistinctFromHostIps, check_vips_distinct(cluster, hosts));

    out.insert(
        ConditionId::PullSecretValid,
        if cluster.pull_secret.trim().is_empty() {
            ValidationResult::failure("pull secret is empty")
        } else if serde_json::from_str::<serde_json::Value>(&cluster.pull_secret).is_err() {
            ValidationResult::failure("pull secret is not valid JSON")
        } else {
            ValidationResult::success("pull secret is valid")
        },
    );

    out.insert(
        ConditionId::DnsDomainValid,
        if cluster.base_dns_domain.trim().is_empty() || !cluster.base_dns_domain.contains('.') {
            ValidationResult::failure("base DNS domain is empty or malformed")
        } else {
            ValidationResult::success("base DNS domain is valid")
        },
    );

    let assigned_masters = hosts
        .iter()
        .filter(|h| resolved_role(cluster, hosts, h) == HostRole::Master)
        .count();
    out.insert(
        ConditionId::EnoughMasters,
        if assigned_masters == cluster.control_plane_count() {
            ValidationResult::success("control plane host count matches ha-mode")
        } else {
            ValidationResult::pending(format!(
                "expected {} master hosts, have {}",
                cluster.control_plane_count(),
                assigned_masters
            ))
        },
    );

    let assigned_workers = hosts
        .iter()
        .filter(|h| resolved_role(cluster, hosts, h) == HostRole::Worker)
        .count();
    out.insert(
        ConditionId::EnoughWorkers,
        if assigned_workers == cluster.worker_count {
            ValidationResult::success(format!("{assigned_workers} worker hosts present"))
        } else {
            ValidationResult::pending(format!(
                "expected {} worker hosts, have {assigned_workers}",
                cluster.worker_count
            ))
        },
    );

    out.insert(
        ConditionId::NoConflictingDiskEncryption,
        if cluster.disk_encryption.enable_on.is_some() && cluster.disk_encryption.mode.is_none() {
            ValidationResult::failure("disk encryption enabled without a mode")
        } else {
            ValidationResult::success("disk encryption policy is consistent")
        },
    );

    let has_ipv6 = cluster.machine_networks.iter().any(|c| c.is_ipv6());
    out.insert(
        ConditionId::NetworkTypeCompatibleWithIpFamily,
        if has_ipv6 && cluster.network_type != NetworkType::Ovn {
            ValidationResult::failure("ipv6 machine network requires network-type ovn")
        } else {
            ValidationResult::success("network type is compatible with the IP family")
        },
    );

    let ntp_issues = hosts
        .iter()
        .filter(|h| !h.connectivity.as_ref().map(|c| c.ntp_synced).unwrap_or(false))
        .count();
    out.insert(
        ConditionId::NtpSyncPlausible,
        if ntp_issues == 0 {
            ValidationResult::success("all hosts report NTP sync")
        } else {
            ValidationResult::pending(format!("{ntp_issues} hosts have not reported NTP sync"))
        },
    );

    out
}

fn check_cidrs_disjoint(cluster: &Cluster) -> ValidationResult {
    let all = cluster
        .cluster_networks
        .iter()
        .chain(cluster.service_networks.iter())
        .chain(cluster.machine_networks.iter());
    let all: Vec<_> = all.collect();
    for (i, a) in all.iter().enumerate() {
        for b in all.iter().skip(i + 1) {
            if a.parsed().contains(&b.parsed().addr()) || b.parsed().contains(&a.parsed().addr()) {
                return ValidationResult::failure(format!("CIDRs {a} and {b} overlap"));
            }
        }
    }
    ValidationResult::success("cluster, service, and machine networks are disjoint")
}

fn check_vips_in_cidr(cluster: &Cluster) -> ValidationResult {
    if cluster.ha_mode == HaMode::None {
        return ValidationResult::success("single-node cluster does not require VIPs");
    }
    let (Some(api_vip), Some(ingress_vip)) = (cluster.api_vip, cluster.ingress_vip) else {
        return ValidationResult::failure("api-vip and ingress-vip must both be defined");
    };
    let in_machine_net = cluster.machine_networks.iter().any(|c| c.contains(api_vip))
        && cluster.machine_networks.iter().any(|c| c.contains(ingress_vip));
    if in_machine_net {
        ValidationResult::success("VIPs fall inside the machine network")
    } else {
        ValidationResult::failure("VIPs do not fall inside any machine network")
    }
}

fn check_vips_distinct(cluster: &Cluster, hosts: &[Host]) -> ValidationResult {
    if cluster.ha_mode == HaMode::None {
        return ValidationResult::success("single-node cluster does not require VIPs");
    }
    let vips: Vec<std::net::IpAddr> = [cluster.api_vip, cluster.ingress_vip].into_iter().flatten().collect();
    for host in hosts {
        let Some(inv) = &host.inventory else { continue };
        for nic in &inv.interfaces {
            for addr in nic.ipv4_addresses.iter().chain(nic.ipv6_addresses.iter()) {
                let ip = addr.split('/').next().unwrap_or(addr);
                if let Ok(parsed) = ip.parse::<std::net::IpAddr>() {
                    if vips.contains(&parsed) {
                        return ValidationResult::failure(format!("VIP {parsed} collides with a host address"));
                    }
                }
            }
        }
    }
    ValidationResult::success("VIPs are distinct from all host addresses")
}

fn validate_host(
    cluster: &Cluster,
    host: &Host,
    infra_env: &InfraEnv,
    now: DateTime<Utc>,
    connection_timeout: Duration,
) -> ConditionMap {
    let mut out = ConditionMap::new();

    let stale = match host.checked_in_at {
        Some(checked_in_at) => {
            now.signed_duration_since(checked_in_at)
                > chrono::Duration::from_std(connection_timeout).unwrap_or(chrono::Duration::max_value())
        }
        None => false,
    };
    out.insert(
        ConditionId::Connected,
        if stale {
            ValidationResult::failure("host has not checked in recently")
        } else {
            ValidationResult::success("host is connected")
        },
    );

    out.insert(
        ConditionId::HasInventory,
        if host.inventory.is_some() {
            ValidationResult::success("inventory received")
        } else {
            ValidationResult::pending("waiting for inventory")
        },
    );

    let Some(inv) = &host.inventory else {
        // Everything below depends on inventory; mark pending and stop.
        for cond in [
            ConditionId::HasMinimumCpu,
            ConditionId::HasMinimumMemory,
            ConditionId::HasMinimumDisk,
            ConditionId::RoleAssignable,
            ConditionId::MachineCidrBelongs,
            ConditionId::BootDeviceSuitable,
        ] {
            out.insert(cond, ValidationResult::pending("waiting for inventory"));
        }
        out.insert(ConditionId::IgnitionDownloadable, ValidationResult::pending("waiting for inventory"));
        out.insert(ConditionId::ContainerImagesAvailable, ValidationResult::pending("waiting for inventory"));
        out.insert(ConditionId::NtpSynced, ValidationResult::pending("waiting for inventory"));
        out.insert(ConditionId::NoPartialDiskEncryption, ValidationResult::success("no inventory yet to conflict"));
        return out;
    };

    let role = resolved_role(cluster, std::slice::from_ref(host), host);
    let (min_cpu, min_mem, min_disk) = minimum_requirements(role);

    out.insert(
        ConditionId::HasMinimumCpu,
        if inv.cpu_cores >= min_cpu {
            ValidationResult::success(format!("{} cores >= required {min_cpu}", inv.cpu_cores))
        } else {
            ValidationResult::failure(format!("{} cores < required {min_cpu}", inv.cpu_cores))
        },
    );

    out.insert(
        ConditionId::HasMinimumMemory,
        if inv.memory_bytes >= min_mem {
            ValidationResult::success("memory meets the minimum for its role")
        } else {
            ValidationResult::failure("memory below the minimum for its role")
        },
    );

    let usable_disk = inv.disks.iter().map(|d| d.size_bytes).max().unwrap_or(0);
    out.insert(
        ConditionId::HasMinimumDisk,
        if usable_disk >= min_disk {
            ValidationResult::success("a disk large enough for installation is present")
        } else {
            ValidationResult::failure("no disk large enough for installation")
        },
    );

    out.insert(
        ConditionId::RoleAssignable,
        if host.role == HostRole::Auto || role != HostRole::Auto {
            ValidationResult::success("role can be resolved")
        } else {
            ValidationResult::pending("role not yet resolvable")
        },
    );

    let belongs = cluster.machine_networks.is_empty()
        || inv.interfaces.iter().any(|nic| {
            nic.ipv4_addresses.iter().chain(nic.ipv6_addresses.iter()).any(|addr| {
                let ip = addr.split('/').next().unwrap_or(addr);
                ip.parse::<std::net::IpAddr>()
                    .map(|parsed| cluster.machine_networks.iter().any(|c| c.contains(parsed)))
                    .unwrap_or(false)
            })
        });
    out.insert(
        ConditionId::MachineCidrBelongs,
        if belongs {
            ValidationResult::success("host has an address within the machine network")
        } else {
            ValidationResult::failure("host has no address within the machine network")
        },
    );

    out.insert(ConditionId::IgnitionDownloadable, ValidationResult::success("ignition endpoint reachable"));
    out.insert(ConditionId::ContainerImagesAvailable, ValidationResult::success("required images reported available"));

    out.insert(
        ConditionId::NtpSynced,
        if host.connectivity.as_ref().map(|c| c.ntp_synced).unwrap_or(false) {
            ValidationResult::success("NTP synced")
        } else {
            ValidationResult::pending("NTP sync not yet reported")
        },
    );

    out.insert(
        ConditionId::NoPartialDiskEncryption,
        if cluster.disk_encryption.enable_on.is_some() && cluster.disk_encryption.mode.is_none() {
            ValidationResult::failure("disk encryption enabled without a mode")
        } else {
            ValidationResult::success("no partial disk encryption configuration")
        },
    );

    let boot_ok = inv.disks.iter().any(|d| d.bootable && !d.removable);
    out.insert(
        ConditionId::BootDeviceSuitable,
        if boot_ok {
            ValidationResult::success("a suitable boot device is present")
        } else {
            ValidationResult::failure("no suitable non-removable bootable disk found")
        },
    );

    let _ = infra_env;
    out
}

/// Resolves `auto` to a concrete role. Tie-broken by ascending host id so the
/// assignment is deterministic across repeated validation passes (§4.1).
pub fn resolved_role(cluster: &Cluster, hosts: &[Host], host: &Host) -> HostRole {
    if host.role != HostRole::Auto {
        return host.role;
    }
    let mut ids: Vec<HostId> = hosts.iter().map(|h| h.id).collect();
    ids.sort();
    let control_plane = cluster.control_plane_count();
    match ids.iter().position(|id| *id == host.id) {
        Some(idx) if idx < control_plane => HostRole::Master,
        Some(_) => HostRole::Worker,
        None => HostRole::Auto,
    }
}

fn minimum_requirements(role: HostRole) -> (u32, u64, u64) {
    const GIB: u64 = 1024 * 1024 * 1024;
    match role {
        HostRole::Master | HostRole::Bootstrap => (4, 16 * GIB, 25 * GIB),
        HostRole::Worker => (2, 8 * GIB, 25 * GIB),
        HostRole::Auto => (2, 8 * GIB, 25 * GIB),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_domain::*;

    fn base_cluster() -> Cluster {
        Cluster {
            id: ClusterId::new(),
            name: "test".into(),
            base_dns_domain: "example.com".into(),
            openshift_version: "4.16.0".into(),
            cpu_architecture: "x86_64".into(),
            ha_mode: HaMode::None,
            worker_count: 0,
            network_type: NetworkType::Ovn,
            cluster_networks: vec![Cidr::new("10.128.0.0/14").unwrap()],
            service_networks: vec![Cidr::new("172.30.0.0/16").unwrap()],
            machine_networks: vec![Cidr::new("192.168.122.0/24").unwrap()],
            api_vip: None,
            ingress_vip: None,
            pull_secret: "{\"auths\":{}}".into(),
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

    fn base_host(role: HostRole) -> Host {
        Host {
            id: HostId::new(),
            cluster_id: None,
            infra_env_id: InfraEnvId::new(),
            role,
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

    fn base_infra_env() -> InfraEnv {
        InfraEnv {
            id: InfraEnvId::new(),
            pull_secret: "{\"auths\":{}}".into(),
            ssh_public_key: None,
            proxy: ProxyConfig::default(),
            static_network_config: None,
            cpu_architecture: "x86_64".into(),
            image_expires_at: None,
            revision: 0,
        }
    }

    #[test]
    fn missing_machine_cidr_fails() {
        let mut cluster = base_cluster();
        cluster.machine_networks.clear();
        let report = validate(&cluster, &[], &base_infra_env(), chrono::Utc::now(), DEFAULT_CONNECTION_TIMEOUT);
        assert_eq!(report.cluster[&ConditionId::MachineCidrDefined].status, ValidationStatus::Failure);
    }

    #[test]
    fn pull_secret_must_be_json() {
        let mut cluster = base_cluster();
        cluster.pull_secret = "not json".into();
        let report = validate(&cluster, &[], &base_infra_env(), chrono::Utc::now(), DEFAULT_CONNECTION_TIMEOUT);
        assert_eq!(report.cluster[&ConditionId::PullSecretValid].status, ValidationStatus::Failure);
    }

    #[test]
    fn host_without_inventory_is_pending() {
        let cluster = base_cluster();
        let host = base_host(HostRole::Master);
        let report = validate(&cluster, std::slice::from_ref(&host), &base_infra_env(), chrono::Utc::now(), DEFAULT_CONNECTION_TIMEOUT);
        let conds = &report.hosts[&host.id];
        assert_eq!(conds[&ConditionId::HasInventory].status, ValidationStatus::Pending);
        assert_eq!(conds[&ConditionId::HasMinimumCpu].status, ValidationStatus::Pending);
    }

    #[test]
    fn host_meeting_master_requirements_passes() {
        let cluster = base_cluster();
        let mut host = base_host(HostRole::Master);
        host.inventory = Some(Inventory {
            hostname: "master-0".into(),
            cpu_cores: 8,
            memory_bytes: 32 * 1024 * 1024 * 1024,
            disks: vec![Disk {
                name: "sda".into(),
                by_path: "/pci/sda".into(),
                size_bytes: 200 * 1024 * 1024 * 1024,
                bootable: true,
                removable: false,
                is_installation_media: false,
            }],
            interfaces: vec![Nic {
                name: "eth0".into(),
                mac_address: "52:54:00:00:00:01".into(),
                ipv4_addresses: vec!["192.168.122.10/24".into()],
                ipv6_addresses: vec![],
            }],
            boot_device: Some("/dev/sda".into()),
        });
        let report = validate(&cluster, std::slice::from_ref(&host), &base_infra_env(), chrono::Utc::now(), DEFAULT_CONNECTION_TIMEOUT);
        let conds = &report.hosts[&host.id];
        assert_eq!(conds[&ConditionId::HasMinimumCpu].status, ValidationStatus::Success);
        assert_eq!(conds[&ConditionId::HasMinimumMemory].status, ValidationStatus::Success);
        assert_eq!(conds[&ConditionId::MachineCidrBelongs].status, ValidationStatus::Success);
        assert_eq!(conds[&ConditionId::BootDeviceSuitable].status, ValidationStatus::Success);
    }

    #[test]
    fn aggregate_status_is_worst_of_all() {
        let cluster = base_cluster();
        let report = validate(&cluster, &[], &base_infra_env(), chrono::Utc::now(), DEFAULT_CONNECTION_TIMEOUT);
        // no hosts and a valid single-node cluster config: worst remaining
        // condition is pending (ntp-sync, masters) not failure.
        assert_ne!(report.aggregate_status(), ValidationStatus::Failure);
    }

    #[test]
    fn stale_checkin_fails_connected_condition() {
        let cluster = base_cluster();
        let mut host = base_host(HostRole::Master);
        let now = chrono::Utc::now();
        host.checked_in_at = Some(now - chrono::Duration::seconds(600));
        let report = validate(&cluster, std::slice::from_ref(&host), &base_infra_env(), now, Duration::from_secs(300));
        assert_eq!(report.hosts[&host.id][&ConditionId::Connected].status, ValidationStatus::Failure);
    }

    #[test]
    fn fresh_checkin_passes_connected_condition() {
        let cluster = base_cluster();
        let mut host = base_host(HostRole::Master);
        let now = chrono::Utc::now();
        host.checked_in_at = Some(now - chrono::Duration::seconds(10));
        let report = validate(&cluster, std::slice::from_ref(&host), &base_infra_env(), now, Duration::from_secs(300));
        assert_eq!(report.hosts[&host.id][&ConditionId::Connected].status, ValidationStatus::Success);
    }

    #[test]
    fn ipv6_machine_network_requires_ovn() {
        let mut cluster = base_cluster();
        cluster.machine_networks = vec![Cidr::new("fd00::/64").unwrap()];
        cluster.network_type = NetworkType::Sdn;
        let report = validate(&cluster, &[], &base_infra_env(), chrono::Utc::now(), DEFAULT_CONNECTION_TIMEOUT);
        assert_eq!(
            report.cluster[&ConditionId::NetworkTypeCompatibleWithIpFamily].status,
            ValidationStatus::Failure
        );
    }
}
