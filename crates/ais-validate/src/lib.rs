mod validate;

pub use validate::{
    resolved_role, validate, ConditionId, ConditionMap, ValidationReport, ValidationResult, ValidationStatus,
    DEFAULT_CONNECTION_TIMEOUT,
};
