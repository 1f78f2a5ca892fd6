use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to encode installer arguments: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("host {host_id} has no inventory; cannot compute boot device")]
    MissingInventory { host_id: String },
    #[error("host {host_id} has no boot device in inventory")]
    MissingBootDevice { host_id: String },
}
