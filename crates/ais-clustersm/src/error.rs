use ais_domain::ClusterStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterSmError {
    #[error("store error: {0}")]
    Store(#[from] ais_store::StoreError),

    #[error("host transition error during installation startup: {0}")]
    HostTransition(#[from] ais_hostsm::HostSmError),

    #[error("event not valid for cluster in status {status}")]
    InvalidTransition { status: ClusterStatus },

    #[error("cluster is not ready for installation: {reason}")]
    NotReady { reason: String },

    #[error("exceeded retry budget reconciling concurrent writes to cluster {cluster_id}")]
    RetriesExhausted { cluster_id: String },
}
