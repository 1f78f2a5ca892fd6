use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("host not found: {0}")]
    HostNotFound(String),

    #[error("infra-env not found: {0}")]
    InfraEnvNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal store error: {0}")]
    Internal(String),

    /// A conditional write's expected revision did not match the current one.
    /// Callers retry against the freshly-read entity (§5 bounded retry).
    #[error("revision conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },
}
