use ais_domain::{Cluster, Disk, DiskCleanupRequest, Host, HostRole, HostStatus, InfraEnv, Step, StepKind};

use crate::error::DispatchError;
use crate::install_cmd::{build_install_command, disks_to_format, InstallerImages};

const MONITORING_TIMEOUT_SECONDS: u64 = 60;
const INSTALL_TIMEOUT_SECONDS: u64 = 3600 * 24;
const DISK_CLEANUP_TIMEOUT_SECONDS: u64 = 600;
const NEXT_STEP_RUNNER_TIMEOUT_SECONDS: u64 = 60;

fn step(id: &str, kind: StepKind, args: Vec<String>, timeout_seconds: u64) -> Step {
    Step { step_id: id.to_string(), kind, args, timeout_seconds }
}

/// Base characterization steps every pre-bind host needs re-run on each poll
/// (§4.4 "discovering" row), plus the next-step-runner poll cadence.
fn discovering_steps() -> Vec<Step> {
    vec![
        step("inventory", StepKind::Inventory, vec![], MONITORING_TIMEOUT_SECONDS),
        step("connectivity-check", StepKind::ConnectivityCheck, vec![], MONITORING_TIMEOUT_SECONDS),
        step("free-network-addresses", StepKind::FreeNetworkAddresses, vec![], MONITORING_TIMEOUT_SECONDS),
        step("ntp-synchronizer", StepKind::NtpSynchronizer, vec![], MONITORING_TIMEOUT_SECONDS),
        step("image-availability", StepKind::ImageAvailability, vec![], MONITORING_TIMEOUT_SECONDS),
        step("next-step-runner", StepKind::NextStepRunner, vec![], NEXT_STEP_RUNNER_TIMEOUT_SECONDS),
    ]
}

/// §4.4 "known/insufficient" row: the discovering set plus domain-resolution,
/// plus api-vip-connectivity for hosts already resolved to worker.
fn known_steps(role: HostRole) -> Vec<Step> {
    let mut steps = discovering_steps();
    steps.push(step("domain-resolution", StepKind::DomainResolution, vec![], MONITORING_TIMEOUT_SECONDS));
    if role == HostRole::Worker {
        steps.push(step(
            "api-vip-connectivity-check",
            StepKind::ApiVipConnectivityCheck,
            vec![],
            MONITORING_TIMEOUT_SECONDS,
        ));
    }
    steps
}

/// §4.4 "preparing-for-installation" row: readiness checks plus disk cleanup,
/// run once a host's role has been pinned and before it starts installing.
fn preparation_steps(disks: &[Disk], host: &Host) -> Result<Vec<Step>, DispatchError> {
    let mut steps = vec![
        step("disk-speed-check", StepKind::DiskSpeedCheck, vec![], MONITORING_TIMEOUT_SECONDS),
        step("container-image-availability", StepKind::ContainerImageAvailability, vec![], MONITORING_TIMEOUT_SECONDS),
    ];
    steps.extend(disk_cleanup_steps(disks, host)?);
    Ok(steps)
}

/// Disk-cleanup requests for every format candidate, skipped entirely when
/// the host's installer args already carry `--save-partindex` (testable
/// property: disk-cleanup suppression).
fn disk_cleanup_steps(disks: &[Disk], host: &Host) -> Result<Vec<Step>, DispatchError> {
    if host.save_partindex_set() {
        return Ok(vec![]);
    }
    disks_to_format(disks)
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            let req = DiskCleanupRequest { path };
            let body = serde_json::to_string(&req)?;
            Ok(step(
                &format!("disk-cleanup-{i}"),
                StepKind::InstallationDiskCleanup,
                vec![body],
                DISK_CLEANUP_TIMEOUT_SECONDS,
            ))
        })
        .collect()
}

/// Projects the steps an agent should be handed on its next poll, purely
/// from the host's current status and the cluster/infra-env it belongs to
/// (§4.4). No side effects; callers persist nothing here.
pub fn next_steps(
    cluster: &Cluster,
    host: &Host,
    infra_env: &InfraEnv,
    images: &InstallerImages,
) -> Result<Vec<Step>, DispatchError> {
    match host.status {
        HostStatus::Discovering => Ok(discovering_steps()),

        HostStatus::Known | HostStatus::Insufficient | HostStatus::PendingForInput => {
            Ok(known_steps(host.role))
        }

        HostStatus::Disconnected | HostStatus::Disabled => Ok(vec![]),

        HostStatus::PreparingForInstallation => {
            let inventory = host.inventory.as_ref().ok_or_else(|| DispatchError::MissingInventory {
                host_id: host.id.to_string(),
            })?;
            preparation_steps(&inventory.disks, host)
        }

        HostStatus::PreparingSuccessful => Ok(vec![]),

        HostStatus::Installing => {
            let inventory = host.inventory.as_ref().ok_or_else(|| DispatchError::MissingInventory {
                host_id: host.id.to_string(),
            })?;
            let bootdevice = inventory.boot_device.clone().ok_or_else(|| DispatchError::MissingBootDevice {
                host_id: host.id.to_string(),
            })?;
            let disks = disks_to_format(&inventory.disks);
            let command = build_install_command(cluster, host, infra_env, &bootdevice, &disks, images)?;
            Ok(vec![step("install", StepKind::Install, vec![command], INSTALL_TIMEOUT_SECONDS)])
        }

        HostStatus::InstallingInProgress => Ok(vec![]),

        HostStatus::InstallingPendingUserAction => Ok(vec![]),

        HostStatus::Resetting => Ok(vec![step(
            "reset-installation",
            StepKind::ResetInstallation,
            vec![],
            MONITORING_TIMEOUT_SECONDS,
        )]),

        HostStatus::ResettingPendingUserAction => Ok(vec![]),

        HostStatus::Error | HostStatus::Cancelled => {
            Ok(vec![step("logs-gather", StepKind::LogsGather, vec![], MONITORING_TIMEOUT_SECONDS)])
        }

        HostStatus::Installed | HostStatus::AddedToExistingCluster => Ok(vec![]),
    }
}
