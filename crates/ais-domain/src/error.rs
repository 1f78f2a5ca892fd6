use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid cidr: {0}")]
    InvalidCidr(String),

    #[error("invalid cluster id: {0}")]
    InvalidClusterId(String),

    #[error("invalid host id: {0}")]
    InvalidHostId(String),

    #[error("invalid infra-env id: {0}")]
    InvalidInfraEnvId(String),

    #[error("role {role} is incompatible with ha-mode {ha_mode}")]
    IncompatibleRole { role: String, ha_mode: String },

    #[error("host {host_id} has no inventory yet")]
    MissingInventory { host_id: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
