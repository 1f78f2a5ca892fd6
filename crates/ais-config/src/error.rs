use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(String),

    #[error("invalid value for {var}: {message}")]
    Parse { var: String, message: String },

    #[error("domain error: {0}")]
    Domain(#[from] ais_domain::DomainError),
}
