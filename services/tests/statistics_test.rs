//! Aggregated grading statistics over an exercise's latest automatic results.

mod helpers;

use chrono::Utc;
use grading::feedback::Feedback;
use grading::static_analysis::StaticAnalysisCategory;
use helpers::*;
use services::{BuildOutcome, TestCaseStats, grading_statistics};

#[tokio::test]
async fn statistics_aggregate_test_outcomes_and_issue_counts() {
    let harness = harness();
    let now = Utc::now();
    let snapshot =
        snapshot_with_category(StaticAnalysisCategory::new(1, EXERCISE_ID, "Bad Practice", 1.0));

    let (first, _) = student_with_submission(&harness, 100, now).await;
    let messy_build = BuildOutcome {
        commit_hash: Some(COMMIT.into()),
        feedback: vec![
            Feedback::test("test1", true).with_detail("ok"),
            Feedback::test("test2", false).with_detail("wrong sum"),
            Feedback::static_analysis("spotbugs:URF_UNREAD_FIELD", "Bad Practice")
                .with_detail("unread field"),
            Feedback::static_analysis("spotbugs:DLS_DEAD_LOCAL_STORE", "Bad Practice")
                .with_detail("dead store"),
        ],
    };
    harness
        .grading
        .process_build_result(first, messy_build, &snapshot, now)
        .await
        .unwrap();

    let (second, _) = student_with_submission(&harness, 101, now).await;
    harness
        .grading
        .process_build_result(second, all_passing_build(), &snapshot, now)
        .await
        .unwrap();

    let statistics = grading_statistics(harness.store.as_ref(), &snapshot)
        .await
        .unwrap();

    assert_eq!(statistics.result_count, 2);
    assert_eq!(
        statistics.test_case_stats.get("test1"),
        Some(&TestCaseStats {
            passed: 2,
            failed: 0
        })
    );
    assert_eq!(
        statistics.test_case_stats.get("test2"),
        Some(&TestCaseStats {
            passed: 1,
            failed: 1
        })
    );

    let histogram = statistics.category_issue_histogram.get("Bad Practice").unwrap();
    assert_eq!(histogram.get(&2), Some(&1));
    assert_eq!(histogram.len(), 1);
}

#[tokio::test]
async fn participations_without_results_do_not_distort_the_statistics() {
    let harness = harness();
    let now = Utc::now();
    let snapshot = snapshot();

    // a participation with a submission but no build yet
    student_with_submission(&harness, 100, now).await;

    let statistics = grading_statistics(harness.store.as_ref(), &snapshot)
        .await
        .unwrap();

    assert_eq!(statistics.result_count, 0);
    assert_eq!(
        statistics.test_case_stats.get("test1"),
        Some(&TestCaseStats::default())
    );
}
