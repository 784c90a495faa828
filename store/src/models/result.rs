use chrono::{DateTime, Utc};
use grading::feedback::Feedback;
use grading::scorer::ScoreOutcome;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How a result came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentType {
    /// Produced by a build, no human involved.
    Automatic,
    /// Automatic feedback plus a tutor's manual assessment on top.
    SemiAutomatic,
}

/// One graded outcome of a submission.
///
/// A submission accumulates results in chronological order: the automatic
/// build result first, then one manual result per correction round. A result
/// with no completion date is an assessment in progress, and its assessor
/// holds the lock on that correction round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: i64,
    pub submission_id: i64,
    pub correction_round: u32,
    /// Percentage score, 0 to 200 inclusive after capping.
    pub score: f64,
    /// `None` means "not yet evaluated".
    pub successful: Option<bool>,
    pub rated: bool,
    pub assessment_type: AssessmentType,
    /// `None` while the assessment is in progress.
    pub completion_date: Option<DateTime<Utc>>,
    /// The lock holder while `completion_date` is `None`.
    pub assessor: Option<i64>,
    pub has_complaint: bool,
    pub feedback: Vec<Feedback>,
    pub test_case_count: usize,
    pub passed_test_case_count: usize,
    pub code_issue_count: usize,
}

impl ResultRecord {
    /// A fresh automatic result as delivered by a completed build.
    pub fn automatic(submission_id: i64, completion_date: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            submission_id,
            correction_round: 0,
            score: 0.0,
            successful: None,
            rated: false,
            assessment_type: AssessmentType::Automatic,
            completion_date: Some(completion_date),
            assessor: None,
            has_complaint: false,
            feedback: Vec::new(),
            test_case_count: 0,
            passed_test_case_count: 0,
            code_issue_count: 0,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.completion_date.is_none()
    }

    pub fn is_manual(&self) -> bool {
        self.assessment_type == AssessmentType::SemiAutomatic
    }

    /// Copies a calculation outcome into this record.
    pub fn apply_outcome(&mut self, outcome: ScoreOutcome) {
        self.score = outcome.score;
        self.successful = outcome.successful;
        self.feedback = outcome.feedback;
        self.test_case_count = outcome.test_case_count;
        self.passed_test_case_count = outcome.passed_test_case_count;
        self.code_issue_count = outcome.code_issue_count;
    }

    /// Copies the derived automatic-test counters from another result, as
    /// done when a manual result is seeded from an automatic one.
    pub fn copy_counters_from(&mut self, other: &ResultRecord) {
        self.test_case_count = other.test_case_count;
        self.passed_test_case_count = other.passed_test_case_count;
        self.code_issue_count = other.code_issue_count;
    }
}
