use ais_domain::HostStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostSmError {
    #[error("store error: {0}")]
    Store(#[from] ais_store::StoreError),

    #[error("domain error: {0}")]
    Domain(#[from] ais_domain::DomainError),

    #[error("host {host_id} has no {kind} reported yet")]
    MissingData { host_id: String, kind: &'static str },

    #[error("event not valid for host in status {status}")]
    InvalidTransition { status: HostStatus },

    #[error("exceeded retry budget reconciling concurrent writes to host {host_id}")]
    RetriesExhausted { host_id: String },
}
