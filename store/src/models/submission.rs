use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One student upload, carrying its results in chronological order.
///
/// The commit hash is opaque metadata supplied by the version-control
/// collaborator; the engine never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub participation_id: i64,
    pub commit_hash: Option<String>,
    pub submitted_at: DateTime<Utc>,
    /// Insertion order is chronological; the last entry is the latest result.
    pub result_ids: Vec<i64>,
}
