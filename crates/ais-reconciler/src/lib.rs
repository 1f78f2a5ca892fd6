pub mod conditions;
pub mod error;
pub mod reconcile;
pub mod report;
pub mod source;

pub use error::ReconcileError;
pub use reconcile::reconcile;
pub use report::{Change, Condition, ConditionKind, ConditionStatus, DesiredCluster, DesiredHost, ReconcileReport, SpokeKey};
pub use source::{DeclarativeSource, InMemoryDeclarativeSource};
