use thiserror::Error;
use validator::ValidationErrors;

/// Errors produced by the pure grading core.
///
/// Everything here is rejected before any state is touched; the scoring
/// functions are side-effect free, so a returned error means the inputs were
/// unusable as given.
#[derive(Debug, Error)]
pub enum GradingError {
    /// Input failed a structural or range check (negative weight, manual
    /// feedback without a detail text, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A bulk update referenced a test case name the registry does not know.
    #[error("unknown test case '{0}'")]
    UnknownTestCase(String),

    /// The exercise configuration itself is unusable (e.g. max points <= 0).
    #[error("invalid exercise configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<ValidationErrors> for GradingError {
    fn from(errors: ValidationErrors) -> Self {
        GradingError::Validation(format_validation_errors(&errors))
    }
}

fn format_validation_errors(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| {
            errs.iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        })
        .collect::<Vec<_>>()
        .join("; ")
}
