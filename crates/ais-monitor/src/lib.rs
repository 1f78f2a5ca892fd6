pub mod cluster_monitor;
pub mod host_monitor;
pub mod leader;

pub use cluster_monitor::ClusterMonitor;
pub use host_monitor::HostMonitor;
pub use leader::{AlwaysLeader, LeaderGate, LeasedLeaderGate};
