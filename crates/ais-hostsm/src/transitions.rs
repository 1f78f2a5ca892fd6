use ais_domain::{ConnectivityReport, Host, HostStatus, Inventory, StepReply};
use ais_validate::{ConditionMap, ValidationStatus};

use crate::error::HostSmError;

/// Events that drive the host state machine (§4.1). Each is handled by a
/// pure function below; [`crate::machine::HostStateMachine`] is the only
/// place that touches the store.
#[derive(Debug, Clone)]
pub enum HostEvent {
    RegisterHost,
    UpdateInventory(Inventory),
    UpdateConnectivity(ConnectivityReport),
    Bind,
    Unbind,
    Approve,
    /// Recompute status from a freshly-run validation pass.
    Refresh(ConditionMap),
    Install,
    StepReply(StepReply),
    Cancel,
    Reset,
}

/// Applies `event` to `host`, returning the resulting status or an error if
/// the event makes no sense in the host's current status. Pure: callers are
/// responsible for persisting the result.
pub fn apply_event(host: &mut Host, event: HostEvent) -> Result<HostStatus, HostSmError> {
    use HostStatus::*;

    if host.status.is_terminal() && !matches!(event, HostEvent::Reset) {
        return Err(HostSmError::InvalidTransition { status: host.status });
    }

    match event {
        HostEvent::RegisterHost => Ok(Discovering),

        HostEvent::UpdateInventory(inventory) => {
            host.inventory = Some(inventory);
            Ok(match host.status {
                Discovering => Known,
                other => other,
            })
        }

        HostEvent::UpdateConnectivity(report) => {
            host.connectivity = Some(report);
            Ok(host.status)
        }

        HostEvent::Bind => {
            if !matches!(host.status, Known | Insufficient | PendingForInput | Disconnected) {
                return Err(HostSmError::InvalidTransition { status: host.status });
            }
            Ok(host.status)
        }

        HostEvent::Unbind => {
            host.cluster_id = None;
            Ok(Known)
        }

        HostEvent::Approve => {
            host.approved = true;
            Ok(host.status)
        }

        HostEvent::Refresh(conditions) => Ok(status_from_validations(host, &conditions)),

        HostEvent::Install => {
            if !matches!(host.status, Known | Insufficient | PendingForInput | Disconnected) {
                return Err(HostSmError::InvalidTransition { status: host.status });
            }
            Ok(PreparingForInstallation)
        }

        HostEvent::StepReply(reply) => Ok(apply_step_reply(host, reply)),

        HostEvent::Cancel => Ok(Cancelled),

        HostEvent::Reset => Ok(Resetting),
    }
}

/// Derives a host status from the worst condition across its validation map
/// (§4.3). A stale `connected` condition demotes straight to `disconnected`
/// regardless of anything else; otherwise a host with any hard failure is
/// `insufficient`, one still missing data is `pending-for-input`, and a host
/// passing everything is simply `known` — `preparing-for-installation` is
/// only ever forced by the Cluster SM's `Install` event, never by Refresh.
fn status_from_validations(host: &Host, conditions: &ConditionMap) -> HostStatus {
    if host.status.is_in_installing_family() || host.status.is_terminal() {
        return host.status;
    }
    if conditions.get(&ais_validate::ConditionId::Connected).map(|r| r.status) == Some(ValidationStatus::Failure) {
        return HostStatus::Disconnected;
    }
    let worst = conditions.values().map(|r| r.status).max();
    match worst {
        Some(ValidationStatus::Failure) => HostStatus::Insufficient,
        Some(ValidationStatus::Pending) => HostStatus::PendingForInput,
        Some(ValidationStatus::Success) | None => HostStatus::Known,
    }
}

fn apply_step_reply(host: &mut Host, reply: StepReply) -> HostStatus {
    match host.status {
        HostStatus::PreparingForInstallation => {
            if reply.exit_code == 0 {
                HostStatus::PreparingSuccessful
            } else {
                host.status_info = reply.error.clone();
                HostStatus::Error
            }
        }
        HostStatus::PreparingSuccessful => {
            if reply.exit_code == 0 {
                HostStatus::Installing
            } else {
                host.status_info = reply.error.clone();
                HostStatus::Error
            }
        }
        HostStatus::Installing | HostStatus::InstallingInProgress => {
            if reply.exit_code == 0 {
                HostStatus::InstallingInProgress
            } else {
                host.status_info = reply.error.clone();
                HostStatus::Error
            }
        }
        HostStatus::Resetting => {
            if reply.exit_code == 0 {
                HostStatus::Discovering
            } else {
                host.status_info = reply.error.clone();
                HostStatus::Error
            }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_domain::{HostId, HostRole, InfraEnvId, InstallationProgress};
    use ais_validate::ValidationResult;
    use std::collections::BTreeMap;

    fn host_with(status: HostStatus) -> Host {
        Host {
            id: HostId::new(),
            cluster_id: None,
            infra_env_id: InfraEnvId::new(),
            role: HostRole::Auto,
            inventory: None,
            connectivity: None,
            installation_progress: InstallationProgress::default(),
            installer_args: vec![],
            logs_collected_at: None,
            approved: false,
            validations: serde_json::json!({}),
            status,
            status_info: String::new(),
            status_updated_at: chrono::Utc::now(),
            checked_in_at: None,
            revision: 0,
        }
    }

    #[test]
    fn register_starts_discovering() {
        let mut host = host_with(HostStatus::Discovering);
        let status = apply_event(&mut host, HostEvent::RegisterHost).unwrap();
        assert_eq!(status, HostStatus::Discovering);
    }

    #[test]
    fn inventory_moves_discovering_to_known() {
        let mut host = host_with(HostStatus::Discovering);
        let inv = Inventory::default();
        let status = apply_event(&mut host, HostEvent::UpdateInventory(inv)).unwrap();
        assert_eq!(status, HostStatus::Known);
    }

    #[test]
    fn terminal_status_rejects_events_other_than_reset() {
        let mut host = host_with(HostStatus::Installed);
        let err = apply_event(&mut host, HostEvent::Approve).unwrap_err();
        assert!(matches!(err, HostSmError::InvalidTransition { .. }));
        let status = apply_event(&mut host, HostEvent::Reset).unwrap();
        assert_eq!(status, HostStatus::Resetting);
    }

    #[test]
    fn refresh_with_failure_condition_marks_insufficient() {
        let mut host = host_with(HostStatus::Known);
        let mut conditions = BTreeMap::new();
        conditions.insert(
            ais_validate::ConditionId::HasMinimumCpu,
            ValidationResult { status: ValidationStatus::Failure, message: "too few cores".into() },
        );
        let status = apply_event(&mut host, HostEvent::Refresh(conditions)).unwrap();
        assert_eq!(status, HostStatus::Insufficient);
    }

    #[test]
    fn refresh_all_success_with_cluster_stays_known() {
        let mut host = host_with(HostStatus::Known);
        host.cluster_id = Some(ais_domain::ClusterId::new());
        let mut conditions = BTreeMap::new();
        conditions.insert(
            ais_validate::ConditionId::HasMinimumCpu,
            ValidationResult { status: ValidationStatus::Success, message: "ok".into() },
        );
        let status = apply_event(&mut host, HostEvent::Refresh(conditions)).unwrap();
        assert_eq!(status, HostStatus::Known);
    }

    #[test]
    fn refresh_with_stale_connected_condition_demotes_to_disconnected() {
        let mut host = host_with(HostStatus::Known);
        let mut conditions = BTreeMap::new();
        conditions.insert(
            ais_validate::ConditionId::Connected,
            ValidationResult { status: ValidationStatus::Failure, message: "stale checkin".into() },
        );
        let status = apply_event(&mut host, HostEvent::Refresh(conditions)).unwrap();
        assert_eq!(status, HostStatus::Disconnected);
    }

    #[test]
    fn install_event_forces_known_host_into_preparing() {
        let mut host = host_with(HostStatus::Known);
        let status = apply_event(&mut host, HostEvent::Install).unwrap();
        assert_eq!(status, HostStatus::PreparingForInstallation);
    }

    #[test]
    fn install_event_rejected_from_discovering() {
        let mut host = host_with(HostStatus::Discovering);
        let err = apply_event(&mut host, HostEvent::Install).unwrap_err();
        assert!(matches!(err, HostSmError::InvalidTransition { .. }));
    }

    #[test]
    fn step_reply_chain_carries_host_from_preparing_to_installing_in_progress() {
        let mut host = host_with(HostStatus::PreparingForInstallation);
        let ok = |step_id: &str| StepReply { step_id: step_id.into(), exit_code: 0, output: String::new(), error: String::new() };

        let status = apply_event(&mut host, HostEvent::StepReply(ok("disk-cleanup-0"))).unwrap();
        assert_eq!(status, HostStatus::PreparingSuccessful);
        host.status = status;

        let status = apply_event(&mut host, HostEvent::StepReply(ok("install"))).unwrap();
        assert_eq!(status, HostStatus::Installing);
        host.status = status;

        let status = apply_event(&mut host, HostEvent::StepReply(ok("install"))).unwrap();
        assert_eq!(status, HostStatus::InstallingInProgress);
    }

    #[test]
    fn failed_install_step_moves_to_error() {
        let mut host = host_with(HostStatus::Installing);
        let reply = StepReply { step_id: "install".into(), exit_code: 1, output: String::new(), error: "boom".into() };
        let status = apply_event(&mut host, HostEvent::StepReply(reply)).unwrap();
        assert_eq!(status, HostStatus::Error);
        assert_eq!(host.status_info, "boom");
    }
}
