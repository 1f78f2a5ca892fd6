use ais_domain::{Cluster, ClusterKind, ClusterStatus};
use ais_validate::ValidationStatus;

use crate::error::ClusterSmError;

/// Events that drive the cluster state machine (§4.2). Mirrors the shape of
/// `ais_hostsm::HostEvent`: one pure function here, a retrying store wrapper
/// in [`crate::machine`].
#[derive(Debug, Clone)]
pub enum ClusterEvent {
    /// Recompute status from a freshly-run validation pass. `hosts_ready`
    /// is true once every non-terminal host has reached
    /// `preparing-for-installation` or later.
    Refresh { aggregate: ValidationStatus, hosts_ready: bool },
    StartInstallation,
    /// Fired once the bootstrap host's own status enters the installing
    /// family (§4.2: "`installing` is entered when the bootstrap host
    /// begins installation").
    BootstrapInstalling,
    HostsPreparedSuccessfully,
    AllHostsInstalled,
    ClusterOperatorsAvailable,
    Cancel,
    Reset,
    SetHoldInstallation(bool),
    BeginAddingHosts,
}

pub fn apply_event(cluster: &mut Cluster, event: ClusterEvent) -> Result<ClusterStatus, ClusterSmError> {
    use ClusterStatus::*;

    match event {
        ClusterEvent::SetHoldInstallation(hold) => {
            cluster.hold_installation = hold;
            return Ok(cluster.status);
        }
        ClusterEvent::Cancel => {
            return Ok(Cancelled);
        }
        ClusterEvent::Reset => {
            cluster.install_started_at = None;
            cluster.install_completed_at = None;
            return Ok(PendingForInput);
        }
        ClusterEvent::BeginAddingHosts => {
            if cluster.kind != ClusterKind::Day2Import || cluster.status != Installed {
                return Err(ClusterSmError::InvalidTransition { status: cluster.status });
            }
            return Ok(AddingHosts);
        }
        _ => {}
    }

    if cluster.status.is_terminal() {
        return Err(ClusterSmError::InvalidTransition { status: cluster.status });
    }

    match event {
        ClusterEvent::Refresh { aggregate, hosts_ready } => {
            if matches!(
                cluster.status,
                PreparingForInstallation | Installing | Finalizing | Installed
            ) {
                return Ok(cluster.status);
            }
            Ok(match aggregate {
                ValidationStatus::Failure => Insufficient,
                ValidationStatus::Pending => PendingForInput,
                ValidationStatus::Success if hosts_ready => Ready,
                ValidationStatus::Success => PendingForInput,
            })
        }

        ClusterEvent::StartInstallation => {
            if cluster.status != Ready {
                return Err(ClusterSmError::NotReady { reason: format!("cluster is {}", cluster.status) });
            }
            if cluster.hold_installation {
                return Err(ClusterSmError::NotReady { reason: "hold-installation is set".into() });
            }
            cluster.install_started_at = Some(chrono::Utc::now());
            Ok(PreparingForInstallation)
        }

        ClusterEvent::BootstrapInstalling => {
            if matches!(cluster.status, Installing | Finalizing | Installed) {
                return Ok(cluster.status);
            }
            if !matches!(cluster.status, PreparingForInstallation | PreparingSuccessful) {
                return Err(ClusterSmError::InvalidTransition { status: cluster.status });
            }
            Ok(Installing)
        }

        ClusterEvent::HostsPreparedSuccessfully => {
            if cluster.status != PreparingForInstallation {
                return Err(ClusterSmError::InvalidTransition { status: cluster.status });
            }
            Ok(PreparingSuccessful)
        }

        ClusterEvent::AllHostsInstalled => {
            if !matches!(cluster.status, PreparingSuccessful | Installing) {
                return Err(ClusterSmError::InvalidTransition { status: cluster.status });
            }
            Ok(Finalizing)
        }

        ClusterEvent::ClusterOperatorsAvailable => {
            if cluster.status != Finalizing {
                return Err(ClusterSmError::InvalidTransition { status: cluster.status });
            }
            cluster.install_completed_at = Some(chrono::Utc::now());
            Ok(Installed)
        }

        ClusterEvent::Cancel
        | ClusterEvent::Reset
        | ClusterEvent::SetHoldInstallation(_)
        | ClusterEvent::BeginAddingHosts => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_domain::*;

    fn base_cluster(status: ClusterStatus) -> Cluster {
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
            status,
            status_info: String::new(),
            status_updated_at: chrono::Utc::now(),
            install_started_at: None,
            install_completed_at: None,
            controller_logs_collected_at: None,
            hold_installation: false,
            revision: 0,
        }
    }

    #[test]
    fn refresh_success_with_hosts_ready_moves_to_ready() {
        let mut cluster = base_cluster(ClusterStatus::PendingForInput);
        let status = apply_event(&mut cluster, ClusterEvent::Refresh {
            aggregate: ValidationStatus::Success,
            hosts_ready: true,
        }).unwrap();
        assert_eq!(status, ClusterStatus::Ready);
    }

    #[test]
    fn start_installation_requires_ready() {
        let mut cluster = base_cluster(ClusterStatus::Insufficient);
        let err = apply_event(&mut cluster, ClusterEvent::StartInstallation).unwrap_err();
        assert!(matches!(err, ClusterSmError::NotReady { .. }));
    }

    #[test]
    fn hold_installation_blocks_start() {
        let mut cluster = base_cluster(ClusterStatus::Ready);
        cluster.hold_installation = true;
        let err = apply_event(&mut cluster, ClusterEvent::StartInstallation).unwrap_err();
        assert!(matches!(err, ClusterSmError::NotReady { .. }));
    }

    #[test]
    fn full_happy_path_to_installed() {
        let mut cluster = base_cluster(ClusterStatus::Ready);
        assert_eq!(apply_event(&mut cluster, ClusterEvent::StartInstallation).unwrap(), ClusterStatus::PreparingForInstallation);
        cluster.status = ClusterStatus::PreparingForInstallation;
        assert_eq!(apply_event(&mut cluster, ClusterEvent::HostsPreparedSuccessfully).unwrap(), ClusterStatus::PreparingSuccessful);
        cluster.status = ClusterStatus::PreparingSuccessful;
        assert_eq!(apply_event(&mut cluster, ClusterEvent::BootstrapInstalling).unwrap(), ClusterStatus::Installing);
        cluster.status = ClusterStatus::Installing;
        assert_eq!(apply_event(&mut cluster, ClusterEvent::AllHostsInstalled).unwrap(), ClusterStatus::Finalizing);
        cluster.status = ClusterStatus::Finalizing;
        assert_eq!(apply_event(&mut cluster, ClusterEvent::ClusterOperatorsAvailable).unwrap(), ClusterStatus::Installed);
        assert!(cluster.install_completed_at.is_some());
    }

    #[test]
    fn bootstrap_installing_is_idempotent_once_past_installing() {
        let mut cluster = base_cluster(ClusterStatus::Finalizing);
        let status = apply_event(&mut cluster, ClusterEvent::BootstrapInstalling).unwrap();
        assert_eq!(status, ClusterStatus::Finalizing);
    }

    #[test]
    fn bootstrap_installing_rejected_before_preparing_for_installation() {
        let mut cluster = base_cluster(ClusterStatus::Ready);
        let err = apply_event(&mut cluster, ClusterEvent::BootstrapInstalling).unwrap_err();
        assert!(matches!(err, ClusterSmError::InvalidTransition { .. }));
    }

    #[test]
    fn cancel_works_from_any_non_installed_state() {
        let mut cluster = base_cluster(ClusterStatus::Installing);
        let status = apply_event(&mut cluster, ClusterEvent::Cancel).unwrap();
        assert_eq!(status, ClusterStatus::Cancelled);
    }

    #[test]
    fn day2_cluster_can_enter_adding_hosts() {
        let mut cluster = base_cluster(ClusterStatus::Installed);
        cluster.kind = ClusterKind::Day2Import;
        let status = apply_event(&mut cluster, ClusterEvent::BeginAddingHosts).unwrap();
        assert_eq!(status, ClusterStatus::AddingHosts);
    }
}
