use grading::error::GradingError;
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the assessment lifecycle.
///
/// Every variant maps onto one rejection class of the HTTP layer above:
/// validation => bad request, lock conflict => forbidden/conflict, not found
/// => not found, configuration inconsistency => conflict at the import
/// boundary. All of them are rejected before any state is written.
#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation ran into another assessor's lock, or the actor lacks
    /// the privilege the state machine demands. No state was changed.
    #[error("assessment conflict: {0}")]
    LockConflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The exercise configuration contradicts itself or its import source.
    #[error("configuration inconsistency: {0}")]
    ConfigurationInconsistency(String),
}

impl From<StoreError> for AssessmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AssessmentError::NotFound(err.to_string()),
            StoreError::RoundLocked { .. } | StoreError::RoundAlreadyAssessed { .. } => {
                AssessmentError::LockConflict(err.to_string())
            }
        }
    }
}

impl From<GradingError> for AssessmentError {
    fn from(err: GradingError) -> Self {
        match err {
            GradingError::Validation(msg) => AssessmentError::Validation(msg),
            GradingError::UnknownTestCase(name) => {
                AssessmentError::NotFound(format!("test case '{name}'"))
            }
            GradingError::InvalidConfiguration(msg) => {
                AssessmentError::ConfigurationInconsistency(msg)
            }
        }
    }
}
