pub mod error;
pub mod machine;
pub mod transitions;

pub use error::HostSmError;
pub use machine::HostStateMachine;
pub use transitions::{apply_event, HostEvent};
