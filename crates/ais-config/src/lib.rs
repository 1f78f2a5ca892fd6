mod env;
pub mod error;

pub use env::{AssistedConfig, DeployTarget, StorageBackend};
pub use error::ConfigError;
