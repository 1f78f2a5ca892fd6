use std::sync::Arc;

use ais_clustersm::ClusterStateMachine;
use ais_dispatcher::InstallerImages;
use ais_hostsm::HostStateMachine;
use ais_store::StateStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StateStore>,
    pub hostsm: Arc<HostStateMachine>,
    pub clustersm: Arc<ClusterStateMachine>,
    pub auth_token: Arc<String>,
    pub images: Arc<InstallerImages>,
}
