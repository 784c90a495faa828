#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use grading::exercise::ExerciseConfig;
use grading::feedback::Feedback;
use grading::static_analysis::StaticAnalysisCategory;
use grading::test_case::TestCase;
use services::{
    AssessmentService, BuildOutcome, ExerciseSnapshot, GradingService, RecordingNotifier,
};
use store::models::participation::ParticipationKind;
use store::{InMemoryStore, LongFeedbackStore, SubmissionStore};

pub const EXERCISE_ID: i64 = 7;
pub const COMMIT: &str = "c0ffee42";

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub long_feedback: Arc<LongFeedbackStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub grading: GradingService<InMemoryStore>,
    pub assessment: AssessmentService<InMemoryStore>,
}

pub fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let long_feedback = Arc::new(LongFeedbackStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let grading = GradingService::new(store.clone(), long_feedback.clone(), notifier.clone())
        .with_workers(2);
    let assessment = AssessmentService::new(store.clone(), long_feedback.clone());
    Harness {
        store,
        long_feedback,
        notifier,
        grading,
        assessment,
    }
}

/// Two equally weighted test cases on a 42-point exercise: a passing test1
/// alone is worth exactly half the points.
pub fn snapshot() -> ExerciseSnapshot {
    ExerciseSnapshot::new(ExerciseConfig::new(EXERCISE_ID, 42.0)).with_test_cases(vec![
        TestCase::new(1, EXERCISE_ID, "test1"),
        TestCase::new(2, EXERCISE_ID, "test2"),
    ])
}

pub fn snapshot_with_category(category: StaticAnalysisCategory) -> ExerciseSnapshot {
    let mut snapshot = snapshot();
    snapshot.config = snapshot.config.with_static_analysis(None);
    snapshot.categories = vec![category];
    snapshot
}

pub fn passing_failing_build() -> BuildOutcome {
    BuildOutcome {
        commit_hash: Some(COMMIT.into()),
        feedback: vec![
            Feedback::test("test1", true).with_detail("ok"),
            Feedback::test("test2", false).with_detail("expected 1, got 2"),
        ],
    }
}

pub fn all_passing_build() -> BuildOutcome {
    BuildOutcome {
        commit_hash: Some(COMMIT.into()),
        feedback: vec![
            Feedback::test("test1", true).with_detail("ok"),
            Feedback::test("test2", true).with_detail("also ok"),
        ],
    }
}

/// Creates a student participation with one submission under [`COMMIT`].
pub async fn student_with_submission(
    harness: &Harness,
    student_id: i64,
    now: DateTime<Utc>,
) -> (i64, i64) {
    student_with_submission_due(harness, student_id, None, now).await
}

pub async fn student_with_submission_due(
    harness: &Harness,
    student_id: i64,
    individual_due_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (i64, i64) {
    let participation = harness
        .store
        .create_participation(
            EXERCISE_ID,
            ParticipationKind::Student,
            Some(student_id),
            individual_due_date,
        )
        .await;
    let submission = harness
        .store
        .create_submission(participation.id, Some(COMMIT.into()), now)
        .await
        .unwrap();
    (participation.id, submission.id)
}

pub async fn reference_with_submission(
    harness: &Harness,
    kind: ParticipationKind,
    now: DateTime<Utc>,
) -> (i64, i64) {
    let participation = harness
        .store
        .create_participation(EXERCISE_ID, kind, None, None)
        .await;
    let submission = harness
        .store
        .create_submission(participation.id, Some(COMMIT.into()), now)
        .await
        .unwrap();
    (participation.id, submission.id)
}
