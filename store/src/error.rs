use thiserror::Error;

/// Errors surfaced by the submission store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The requested correction round is currently locked by another
    /// assessor. Nothing was changed.
    #[error("correction round {round} of submission {submission_id} is locked by assessor {held_by}")]
    RoundLocked {
        submission_id: i64,
        round: u32,
        held_by: i64,
    },

    /// The requested correction round already holds a submitted assessment;
    /// changing it is an override, not a fresh lock.
    #[error("correction round {round} of submission {submission_id} is already assessed")]
    RoundAlreadyAssessed { submission_id: i64, round: u32 },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        StoreError::NotFound { entity, id }
    }
}
