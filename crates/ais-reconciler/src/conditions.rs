use ais_domain::{ClusterStatus, Host};
use ais_validate::ValidationStatus;

use crate::report::{Condition, ConditionKind, ConditionStatus};

/// Outcome of the sync step (lookup + register/import/update), feeding the
/// `SpecSynced` condition.
pub enum SyncOutcome {
    Ok,
    BackendError(String),
    InputError(String),
}

pub fn spec_synced(outcome: &SyncOutcome) -> Condition {
    match outcome {
        SyncOutcome::Ok => Condition::new(ConditionKind::SpecSynced, ConditionStatus::True, "SyncedOk", "spec applied"),
        SyncOutcome::BackendError(msg) => {
            Condition::new(ConditionKind::SpecSynced, ConditionStatus::False, "BackendError", msg.clone())
        }
        SyncOutcome::InputError(msg) => {
            Condition::new(ConditionKind::SpecSynced, ConditionStatus::False, "InputError", msg.clone())
        }
    }
}

/// `required` is the provision request's total host count (control plane
/// plus requested workers, [`ais_domain::Cluster::required_host_count`]) —
/// not derivable from `ha_mode` alone, since worker count is independent of
/// it (§4.6, §8 "Additional agents"/"Unapproved agents").
pub fn requirements_met(required: usize, cluster_status: ClusterStatus, hosts: &[Host]) -> Condition {
    use ConditionKind::RequirementsMet as K;

    if cluster_status == ClusterStatus::Cancelled {
        return Condition::new(K, ConditionStatus::False, "InstallationStopped", "installation was cancelled");
    }
    if matches!(
        cluster_status,
        ClusterStatus::PreparingForInstallation
            | ClusterStatus::PreparingSuccessful
            | ClusterStatus::Installing
            | ClusterStatus::Finalizing
            | ClusterStatus::Installed
    ) {
        return Condition::new(K, ConditionStatus::True, "AlreadyInstalling", "installation already underway or complete");
    }
    if hosts.is_empty() {
        return Condition::new(K, ConditionStatus::Unknown, "NotAvailable", "no hosts registered yet");
    }
    let unapproved = hosts.iter().filter(|h| !h.approved).count();
    if unapproved > 0 {
        return Condition::new(
            K,
            ConditionStatus::False,
            "UnapprovedAgents",
            format!("{unapproved} host(s) awaiting approval, {required} required"),
        );
    }
    if hosts.len() < required {
        return Condition::new(
            K,
            ConditionStatus::False,
            "InsufficientAgents",
            format!("{} host(s) registered, {required} required", hosts.len()),
        );
    }
    if hosts.len() > required {
        return Condition::new(
            K,
            ConditionStatus::False,
            "AdditionalAgents",
            format!("{} host(s) bound, only {required} required", hosts.len()),
        );
    }
    Condition::new(K, ConditionStatus::True, "Ready", "sufficient approved hosts bound")
}

pub fn validated(aggregate: ValidationStatus) -> Condition {
    use ConditionKind::Validated as K;
    match aggregate {
        ValidationStatus::Success => Condition::new(K, ConditionStatus::True, "ValidationsPassing", "all validations pass"),
        ValidationStatus::Failure => Condition::new(K, ConditionStatus::False, "ValidationsFailing", "one or more validations failing"),
        ValidationStatus::Pending => Condition::new(K, ConditionStatus::Unknown, "ValidationsUserPending", "validations pending user input"),
    }
}

pub fn completed(status: ClusterStatus, hold_installation: bool) -> Condition {
    use ConditionKind::Completed as K;
    if status == ClusterStatus::Installed {
        return Condition::new(K, ConditionStatus::True, "Installed", "installation complete");
    }
    if status == ClusterStatus::Error {
        return Condition::new(K, ConditionStatus::False, "Failed", "installation failed");
    }
    if matches!(
        status,
        ClusterStatus::PreparingForInstallation
            | ClusterStatus::PreparingSuccessful
            | ClusterStatus::Installing
            | ClusterStatus::Finalizing
    ) {
        return Condition::new(K, ConditionStatus::False, "InProgress", "installation in progress");
    }
    if hold_installation {
        return Condition::new(K, ConditionStatus::False, "OnHold", "installation held by spec.holdInstallation");
    }
    Condition::new(K, ConditionStatus::False, "NotStarted", "installation not started")
}

pub fn failed(status: ClusterStatus) -> Condition {
    use ConditionKind::Failed as K;
    if status == ClusterStatus::Error {
        Condition::new(K, ConditionStatus::True, "Failed", "installation failed")
    } else {
        Condition::new(K, ConditionStatus::False, "NotFailed", "no failure observed")
    }
}

pub fn stopped(status: ClusterStatus, install_completed: bool) -> Condition {
    use ConditionKind::Stopped as K;
    if status != ClusterStatus::Cancelled {
        return Condition::new(K, ConditionStatus::False, "NotStopped", "installation not stopped");
    }
    if install_completed {
        Condition::new(K, ConditionStatus::True, "StoppedCompleted", "cancelled after installation already completed")
    } else {
        Condition::new(K, ConditionStatus::True, "StoppedFailed", "cancelled before installation completed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requirements_ready_with_enough_approved_hosts() {
        let hosts = vec![approved_host(), approved_host(), approved_host()];
        let c = requirements_met(3, ClusterStatus::Ready, &hosts);
        assert_eq!(c.reason, "Ready");
    }

    #[test]
    fn requirements_insufficient_below_minimum() {
        let hosts = vec![approved_host()];
        let c = requirements_met(3, ClusterStatus::Ready, &hosts);
        assert_eq!(c.reason, "InsufficientAgents");
    }

    #[test]
    fn requirements_unapproved_blocks_ready() {
        let mut h = approved_host();
        h.approved = false;
        let c = requirements_met(1, ClusterStatus::Ready, &[h]);
        assert_eq!(c.reason, "UnapprovedAgents");
        assert!(c.message.contains("1 required"));
    }

    #[test]
    fn requirements_additional_agents_flagged_regardless_of_ha_mode() {
        let hosts = vec![approved_host(), approved_host(), approved_host(), approved_host(), approved_host()];
        let c = requirements_met(3, ClusterStatus::Ready, &hosts);
        assert_eq!(c.reason, "AdditionalAgents");
    }

    #[test]
    fn completed_on_hold_when_hold_flag_set() {
        let c = completed(ClusterStatus::PendingForInput, true);
        assert_eq!(c.reason, "OnHold");
    }

    #[test]
    fn stopped_reports_not_stopped_when_not_cancelled() {
        let c = stopped(ClusterStatus::Ready, false);
        assert_eq!(c.reason, "NotStopped");
    }

    fn approved_host() -> Host {
        use ais_domain::{HostId, HostRole, HostStatus, InfraEnvId, InstallationProgress};
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
            approved: true,
            validations: serde_json::json!({}),
            status: HostStatus::Known,
            status_info: String::new(),
            status_updated_at: chrono::Utc::now(),
            checked_in_at: None,
            revision: 0,
        }
    }
}
