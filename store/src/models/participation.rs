use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Whose repository a participation belongs to.
///
/// Template and solution participations exist once per exercise and act as
/// the instructor's reference points during re-evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipationKind {
    Student,
    Template,
    Solution,
}

/// One participant's (or reference repository's) involvement in an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participation {
    pub id: i64,
    pub exercise_id: i64,
    pub kind: ParticipationKind,
    pub student_id: Option<i64>,
    /// Extended deadline for this participant, when granted.
    pub individual_due_date: Option<DateTime<Utc>>,
    /// Insertion order is chronological.
    pub submission_ids: Vec<i64>,
}

impl Participation {
    pub fn is_student(&self) -> bool {
        self.kind == ParticipationKind::Student
    }
}
