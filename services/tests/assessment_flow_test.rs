//! End-to-end lifecycle tests: build intake, locking, manual assessment,
//! overrides, complaints and result deletion.

mod helpers;

use std::sync::Arc;

use chrono::{Duration, Utc};
use grading::feedback::{Feedback, LONG_FEEDBACK_THRESHOLD};
use grading::test_case::TestCase;
use grading::visibility::Visibility;
use helpers::*;
use services::{Actor, AssessmentError, BuildOutcome, ExerciseSnapshot, ManualAssessment};
use store::SubmissionStore;
use store::models::result::AssessmentType;

use grading::exercise::ExerciseConfig;

#[tokio::test]
async fn a_build_becomes_a_scored_automatic_result() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;

    let result = harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();

    assert_eq!(result.submission_id, submission_id);
    assert_eq!(result.assessment_type, AssessmentType::Automatic);
    assert_eq!(result.score, 50.0);
    assert_eq!(result.successful, Some(false));
    assert_eq!(result.test_case_count, 2);
    assert_eq!(result.passed_test_case_count, 1);
    assert!(result.rated);

    let credited = result
        .feedback
        .iter()
        .find(|f| f.test_name() == Some("test1"))
        .unwrap();
    assert_eq!(credited.credits, Some(21.0));
}

#[tokio::test]
async fn a_build_without_matching_commit_gets_a_fallback_submission() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;

    let build = BuildOutcome {
        commit_hash: Some("deadbeef".into()),
        feedback: vec![Feedback::test("test1", true)],
    };
    let result = harness
        .grading
        .process_build_result(participation_id, build, &snapshot(), now)
        .await
        .unwrap();

    assert_ne!(result.submission_id, submission_id);
    let participation = harness.store.participation(participation_id).await.unwrap();
    assert_eq!(participation.submission_ids.len(), 2);
}

#[tokio::test]
async fn a_build_for_the_wrong_exercise_is_rejected() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, _) = student_with_submission(&harness, 100, now).await;

    let mut foreign = snapshot();
    foreign.config.exercise_id = 999;

    let err = harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &foreign, now)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AssessmentError::ConfigurationInconsistency(_)
    ));
}

#[tokio::test]
async fn locking_seeds_the_draft_from_the_automatic_result() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;
    harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();

    let draft = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(11), now)
        .await
        .unwrap();

    assert!(draft.is_locked());
    assert_eq!(draft.assessor, Some(11));
    assert_eq!(draft.assessment_type, AssessmentType::SemiAutomatic);
    assert_eq!(draft.feedback.len(), 2);
    assert_eq!(draft.test_case_count, 2);

    // the same tutor asking again gets the same draft back
    let again = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(11), now)
        .await
        .unwrap();
    assert_eq!(again.id, draft.id);
}

#[tokio::test]
async fn a_second_assessor_cannot_steal_the_lock() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;
    harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();

    harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(11), now)
        .await
        .unwrap();

    let err = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(22), now)
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::LockConflict(_)));

    // and students may not assess at all
    let err = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::student(100), now)
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::LockConflict(_)));
}

#[tokio::test]
async fn concurrent_lock_requests_have_one_winner() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;
    harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();

    let assessment = Arc::new(harness.assessment);
    let mut handles = Vec::new();
    for tutor in [11, 22, 33, 44] {
        let assessment = assessment.clone();
        handles.push(tokio::spawn(async move {
            assessment
                .lock_for_assessment(submission_id, 0, &Actor::tutor(tutor), now)
                .await
        }));
    }

    let mut winners = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(AssessmentError::LockConflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 3);
}

#[tokio::test]
async fn submitting_an_assessment_completes_and_rescores_the_result() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;
    harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();
    let draft = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(11), now)
        .await
        .unwrap();

    let mut feedback = draft.feedback.clone();
    feedback.push(Feedback::manual("clean solution, minor style issues", Some(10.5)));

    let submitted = harness
        .assessment
        .submit_assessment(
            submission_id,
            0,
            &Actor::tutor(11),
            ManualAssessment {
                score: Some(75.0),
                feedback,
            },
            &snapshot(),
            now,
        )
        .await
        .unwrap();

    // 21 test points + 10.5 manual points of 42
    assert_eq!(submitted.score, 75.0);
    assert!(!submitted.is_locked());
    assert!(submitted.rated);
    assert_eq!(submitted.assessor, Some(11));
    assert_eq!(submitted.assessment_type, AssessmentType::SemiAutomatic);
}

#[tokio::test]
async fn submitting_without_a_score_field_is_rejected() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;
    harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();
    let draft = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(11), now)
        .await
        .unwrap();

    let err = harness
        .assessment
        .submit_assessment(
            submission_id,
            0,
            &Actor::tutor(11),
            ManualAssessment {
                score: None,
                feedback: draft.feedback.clone(),
            },
            &snapshot(),
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::Validation(_)));

    // nothing was submitted
    let still_locked = harness
        .store
        .manual_result_for_round(submission_id, 0)
        .await
        .unwrap()
        .unwrap();
    assert!(still_locked.is_locked());
}

#[tokio::test]
async fn only_the_lock_holder_or_an_instructor_may_submit() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;
    harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();
    let draft = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(11), now)
        .await
        .unwrap();

    let assessment = ManualAssessment {
        score: Some(50.0),
        feedback: draft.feedback.clone(),
    };

    let err = harness
        .assessment
        .submit_assessment(
            submission_id,
            0,
            &Actor::tutor(22),
            assessment.clone(),
            &snapshot(),
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::LockConflict(_)));

    // an instructor may take the lock over
    let submitted = harness
        .assessment
        .submit_assessment(
            submission_id,
            0,
            &Actor::instructor(33),
            assessment,
            &snapshot(),
            now,
        )
        .await
        .unwrap();
    assert_eq!(submitted.assessor, Some(33));
}

#[tokio::test]
async fn override_rules_depend_on_the_assessment_due_date() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;
    harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();
    let draft = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(11), now)
        .await
        .unwrap();
    let submitted = harness
        .assessment
        .submit_assessment(
            submission_id,
            0,
            &Actor::tutor(11),
            ManualAssessment {
                score: Some(50.0),
                feedback: draft.feedback.clone(),
            },
            &snapshot(),
            now,
        )
        .await
        .unwrap();

    let revised = ManualAssessment {
        score: Some(50.0),
        feedback: submitted.feedback.clone(),
    };

    // before the assessment due date the original assessor may revise
    let open_period = {
        let mut s = snapshot();
        s.config = s.config.with_assessment_due_date(now + Duration::hours(4));
        s
    };
    harness
        .assessment
        .override_assessment(submitted.id, &Actor::tutor(11), revised.clone(), &open_period, now)
        .await
        .unwrap();

    // after it, only instructors may
    let closed_period = {
        let mut s = snapshot();
        s.config = s.config.with_assessment_due_date(now - Duration::hours(4));
        s
    };
    let err = harness
        .assessment
        .override_assessment(
            submitted.id,
            &Actor::tutor(11),
            revised.clone(),
            &closed_period,
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::LockConflict(_)));

    let overridden = harness
        .assessment
        .override_assessment(
            submitted.id,
            &Actor::instructor(33),
            revised,
            &closed_period,
            now,
        )
        .await
        .unwrap();
    assert_eq!(overridden.assessor, Some(33));
    assert_eq!(overridden.id, submitted.id);
}

#[tokio::test]
async fn complaint_flow_chains_a_response_and_keeps_the_flag() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;
    harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();
    let draft = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(11), now)
        .await
        .unwrap();
    let submitted = harness
        .assessment
        .submit_assessment(
            submission_id,
            0,
            &Actor::tutor(11),
            ManualAssessment {
                score: Some(50.0),
                feedback: draft.feedback.clone(),
            },
            &snapshot(),
            now,
        )
        .await
        .unwrap();

    // the owning student complains; a second complaint is rejected
    let complained = harness
        .assessment
        .file_complaint(submitted.id, &Actor::student(100))
        .await
        .unwrap();
    assert!(complained.has_complaint);
    let err = harness
        .assessment
        .file_complaint(submitted.id, &Actor::student(100))
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::Validation(_)));

    // another student cannot complain about this result
    let err = harness
        .assessment
        .file_complaint(submitted.id, &Actor::student(101))
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::LockConflict(_)));

    // a tutor accepts the complaint with improved feedback
    let mut response_feedback = complained.feedback.clone();
    response_feedback.push(Feedback::manual("complaint accepted, partial credit", Some(10.5)));
    let response = harness
        .assessment
        .respond_to_complaint(
            complained.id,
            &Actor::tutor(22),
            ManualAssessment {
                score: Some(75.0),
                feedback: response_feedback,
            },
            &snapshot(),
            now,
        )
        .await
        .unwrap();

    assert_ne!(response.id, complained.id);
    assert_eq!(response.score, 75.0);
    assert!(!response.has_complaint);

    // the complained-about result keeps its flag, permanently
    let original = harness.store.result(complained.id).await.unwrap();
    assert!(original.has_complaint);

    // even when an instructor later overrides the response
    harness
        .assessment
        .override_assessment(
            response.id,
            &Actor::instructor(33),
            ManualAssessment {
                score: Some(75.0),
                feedback: response.feedback.clone(),
            },
            &snapshot(),
            now,
        )
        .await
        .unwrap();
    let original = harness.store.result(complained.id).await.unwrap();
    assert!(original.has_complaint);
    let response = harness.store.result(response.id).await.unwrap();
    assert!(!response.has_complaint);
}

#[tokio::test]
async fn deletion_rules_protect_everything_but_superseded_automatic_results() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;
    let automatic = harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();
    let draft = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(11), now)
        .await
        .unwrap();
    let manual = harness
        .assessment
        .submit_assessment(
            submission_id,
            0,
            &Actor::tutor(11),
            ManualAssessment {
                score: Some(50.0),
                feedback: draft.feedback.clone(),
            },
            &snapshot(),
            now,
        )
        .await
        .unwrap();

    // students cannot delete anything
    let err = harness
        .assessment
        .delete_result(automatic.id, &Actor::student(100))
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::LockConflict(_)));

    // the manual result is the latest and not automatic, so tutors must not
    let err = harness
        .assessment
        .delete_result(manual.id, &Actor::tutor(11))
        .await
        .unwrap_err();
    assert!(matches!(err, AssessmentError::LockConflict(_)));

    // the superseded automatic result may go
    harness
        .assessment
        .delete_result(automatic.id, &Actor::tutor(11))
        .await
        .unwrap();
    let results = harness
        .store
        .results_of_submission(submission_id)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, manual.id);

    // instructors may delete any result
    harness
        .assessment
        .delete_result(manual.id, &Actor::instructor(33))
        .await
        .unwrap();
    assert!(harness
        .store
        .results_of_submission(submission_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn a_new_build_merges_into_an_existing_manual_result() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;
    harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();
    let draft = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(11), now)
        .await
        .unwrap();
    let mut feedback = draft.feedback.clone();
    feedback.push(Feedback::manual("good structure", Some(10.5)));
    let manual = harness
        .assessment
        .submit_assessment(
            submission_id,
            0,
            &Actor::tutor(11),
            ManualAssessment {
                score: Some(75.0),
                feedback,
            },
            &snapshot(),
            now,
        )
        .await
        .unwrap();

    // the student pushes again, the fixed build passes everything
    let merged = harness
        .grading
        .process_build_result(participation_id, all_passing_build(), &snapshot(), now)
        .await
        .unwrap();

    // same result, updated in place: automatic feedback replaced, the
    // tutor's remark kept, score recomputed (42 capped + 10.5 => 100%)
    assert_eq!(merged.id, manual.id);
    assert_eq!(merged.score, 100.0);
    assert!(!merged.is_locked());
    assert!(merged.feedback.iter().any(|f| f.is_manual()));
    assert_eq!(
        merged
            .feedback
            .iter()
            .filter(|f| f.test_name() == Some("test2"))
            .count(),
        1
    );
}

#[tokio::test]
async fn duplicate_test_output_in_a_build_notifies_staff_once() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, _) = student_with_submission(&harness, 100, now).await;

    let build = BuildOutcome {
        commit_hash: Some(COMMIT.into()),
        feedback: vec![
            Feedback::test("test1", true).with_detail("identical output"),
            Feedback::test("test2", true).with_detail("identical output"),
        ],
    };
    let result = harness
        .grading
        .process_build_result(participation_id, build, &snapshot(), now)
        .await
        .unwrap();

    assert_eq!(result.feedback.len(), 3); // two originals plus one annotation
    assert_eq!(harness.notifier.notified_exercises().await, vec![EXERCISE_ID]);
}

#[tokio::test]
async fn students_see_after_due_date_feedback_only_after_the_due_date() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, _submission) = student_with_submission(&harness, 100, now).await;

    let hidden_until_due = ExerciseSnapshot::new(
        ExerciseConfig::new(EXERCISE_ID, 42.0).with_due_date(now + Duration::hours(6)),
    )
    .with_test_cases(vec![
        TestCase::new(1, EXERCISE_ID, "test1"),
        TestCase::new(2, EXERCISE_ID, "test2").with_visibility(Visibility::AfterDueDate),
    ]);

    let result = harness
        .grading
        .process_build_result(
            participation_id,
            passing_failing_build(),
            &hidden_until_due,
            now,
        )
        .await
        .unwrap();

    // before the due date the hidden test does not count...
    assert_eq!(result.test_case_count, 1);
    assert_eq!(result.score, 100.0);

    // ...and the student does not see its feedback, while staff does
    let student_view = harness
        .assessment
        .view_result(result.id, &Actor::student(100), &hidden_until_due, now)
        .await
        .unwrap();
    assert_eq!(student_view.feedback.len(), 1);
    assert_eq!(student_view.feedback[0].test_name(), Some("test1"));

    let staff_view = harness
        .assessment
        .view_result(result.id, &Actor::tutor(11), &hidden_until_due, now)
        .await
        .unwrap();
    assert_eq!(staff_view.feedback.len(), 2);

    // once the due date has passed, the failing hidden test counts
    let later = now + Duration::hours(7);
    let newer_build = harness
        .grading
        .process_build_result(
            participation_id,
            passing_failing_build(),
            &hidden_until_due,
            later,
        )
        .await
        .unwrap();
    assert_eq!(newer_build.test_case_count, 2);
    assert_eq!(newer_build.score, 50.0);

    let student_view = harness
        .assessment
        .view_result(newer_build.id, &Actor::student(100), &hidden_until_due, later)
        .await
        .unwrap();
    assert_eq!(student_view.feedback.len(), 2);
}

#[tokio::test]
async fn long_manual_feedback_is_externalized_on_submit() {
    let harness = harness();
    let now = Utc::now();
    let (participation_id, submission_id) = student_with_submission(&harness, 100, now).await;
    harness
        .grading
        .process_build_result(participation_id, passing_failing_build(), &snapshot(), now)
        .await
        .unwrap();
    let draft = harness
        .assessment
        .lock_for_assessment(submission_id, 0, &Actor::tutor(11), now)
        .await
        .unwrap();

    let essay = "y".repeat(LONG_FEEDBACK_THRESHOLD + 500);
    let mut feedback = draft.feedback.clone();
    feedback.push(Feedback::manual(essay.clone(), Some(2.0)));

    let submitted = harness
        .assessment
        .submit_assessment(
            submission_id,
            0,
            &Actor::tutor(11),
            ManualAssessment {
                score: Some(55.0),
                feedback,
            },
            &snapshot(),
            now,
        )
        .await
        .unwrap();

    let (index, entry) = submitted
        .feedback
        .iter()
        .enumerate()
        .find(|(_, f)| f.has_long_feedback)
        .unwrap();
    assert_eq!(
        entry.detail_text.as_ref().unwrap().chars().count(),
        LONG_FEEDBACK_THRESHOLD
    );

    let body = harness.long_feedback.get(submitted.id, index).await.unwrap();
    assert_eq!(body, essay);
}
