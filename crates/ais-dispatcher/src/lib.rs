pub mod error;
pub mod install_cmd;
pub mod steps;

pub use error::DispatchError;
pub use install_cmd::{build_install_command, disks_to_format, InstallerImages};
pub use steps::next_steps;
