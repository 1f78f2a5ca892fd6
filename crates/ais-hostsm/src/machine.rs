use std::sync::Arc;

use ais_domain::{Host, HostId, HostRole};
use ais_store::StateStore;
use tracing::{debug, warn};

use crate::error::HostSmError;
use crate::transitions::{apply_event, HostEvent};

const MAX_CAS_RETRIES: u32 = 5;

/// Drives [`HostEvent`]s against a [`StateStore`], retrying on optimistic
/// concurrency conflicts (§4.1). Each call re-reads the host, applies the
/// pure transition, and writes back; a concurrent writer that wins the race
/// just causes a retry against the now-current revision.
pub struct HostStateMachine {
    store: Arc<dyn StateStore>,
}

impl HostStateMachine {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub async fn dispatch(&self, host_id: HostId, event: HostEvent) -> Result<Host, HostSmError> {
        for attempt in 0..MAX_CAS_RETRIES {
            let mut host = self
                .store
                .get_host(host_id)
                .await?
                .ok_or_else(|| ais_store::StoreError::HostNotFound(host_id.to_string()))?;

            let previous_status = host.status;
            let new_status = apply_event(&mut host, event.clone())?;
            host.status = new_status;
            host.status_updated_at = chrono::Utc::now();

            let sent_revision = host.revision;
            match self.store.update_host(host.clone()).await {
                Ok(()) => {
                    host.revision = sent_revision + 1;
                    debug!(host_id = %host_id, from = %previous_status, to = %host.status, "host transitioned");
                    return Ok(host);
                }
                Err(ais_store::StoreError::Conflict { .. }) => {
                    warn!(host_id = %host_id, attempt, "host update conflict, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(HostSmError::RetriesExhausted { host_id: host_id.to_string() })
    }

    /// Pins a resolved role onto a host outside the regular event flow
    /// (§4.1: "role `auto` is resolved at Cluster `preparing-for-installation`").
    /// Role pinning isn't a status transition, so it bypasses `apply_event`
    /// and just CAS-writes the field directly.
    pub async fn pin_role(&self, host_id: HostId, role: HostRole) -> Result<Host, HostSmError> {
        for attempt in 0..MAX_CAS_RETRIES {
            let mut host = self
                .store
                .get_host(host_id)
                .await?
                .ok_or_else(|| ais_store::StoreError::HostNotFound(host_id.to_string()))?;

            host.role = role;
            let sent_revision = host.revision;
            match self.store.update_host(host.clone()).await {
                Ok(()) => {
                    host.revision = sent_revision + 1;
                    debug!(host_id = %host_id, role = %role, "host role pinned");
                    return Ok(host);
                }
                Err(ais_store::StoreError::Conflict { .. }) => {
                    warn!(host_id = %host_id, attempt, "host role pin conflict, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(HostSmError::RetriesExhausted { host_id: host_id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ais_domain::{ClusterId, HostRole, HostStatus, InfraEnvId, InstallationProgress, Inventory};
    use ais_store::InMemoryStore;

    fn new_host() -> Host {
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
            status: HostStatus::Discovering,
            status_info: String::new(),
            status_updated_at: chrono::Utc::now(),
            checked_in_at: None,
            revision: 0,
        }
    }

    #[tokio::test]
    async fn inventory_event_persists_known_status() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let host = new_host();
        let host_id = host.id;
        store.insert_host(host).await.unwrap();

        let sm = HostStateMachine::new(store.clone());
        let updated = sm.dispatch(host_id, HostEvent::UpdateInventory(Inventory::default())).await.unwrap();
        assert_eq!(updated.status, HostStatus::Known);

        let reloaded = store.get_host(host_id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, HostStatus::Known);
        assert_eq!(reloaded.revision, 1);
    }

    #[tokio::test]
    async fn bind_then_unbind_clears_cluster() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let mut host = new_host();
        host.status = HostStatus::Known;
        host.cluster_id = Some(ClusterId::new());
        let host_id = host.id;
        store.insert_host(host).await.unwrap();

        let sm = HostStateMachine::new(store.clone());
        let updated = sm.dispatch(host_id, HostEvent::Unbind).await.unwrap();
        assert!(updated.cluster_id.is_none());
        assert_eq!(updated.status, HostStatus::Known);
    }
}
