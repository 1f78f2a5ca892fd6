use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] ais_store::StoreError),

    #[error("host state machine error: {0}")]
    HostSm(#[from] ais_hostsm::HostSmError),

    #[error("cluster state machine error: {0}")]
    ClusterSm(#[from] ais_clustersm::ClusterSmError),

    #[error("declarative source error: {0}")]
    Source(String),

    #[error("internal error: {0}")]
    Internal(String),
}
