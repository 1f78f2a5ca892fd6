pub mod error;
pub mod machine;
pub mod transitions;

pub use error::ClusterSmError;
pub use machine::ClusterStateMachine;
pub use transitions::{apply_event, ClusterEvent};
