//! Aggregated grading statistics for the instructor's configuration page.

use std::collections::HashMap;

use serde::Serialize;
use store::SubmissionStore;
use store::models::result::AssessmentType;

use crate::error::AssessmentError;
use crate::grading_service::ExerciseSnapshot;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TestCaseStats {
    pub passed: usize,
    pub failed: usize,
}

/// Pass/fail counts per test case and an issues-per-result histogram per
/// static-analysis category, over the latest automatic results of an
/// exercise.
#[derive(Debug, Default, Serialize)]
pub struct GradingStatistics {
    pub result_count: usize,
    pub test_case_stats: HashMap<String, TestCaseStats>,
    /// category name -> (issue count -> number of results with that count)
    pub category_issue_histogram: HashMap<String, HashMap<usize, usize>>,
}

pub async fn grading_statistics<S: SubmissionStore>(
    store: &S,
    exercise: &ExerciseSnapshot,
) -> Result<GradingStatistics, AssessmentError> {
    let mut statistics = GradingStatistics::default();
    for test_case in &exercise.test_cases {
        statistics
            .test_case_stats
            .entry(test_case.test_name.clone())
            .or_default();
    }
    for category in &exercise.categories {
        statistics
            .category_issue_histogram
            .entry(category.name.clone())
            .or_default();
    }

    for participation in store.participations_of_exercise(exercise.exercise_id()).await {
        let Some(submission) = store.latest_submission(participation.id).await? else {
            continue;
        };
        let Some(result) = store
            .latest_result_of_type(submission.id, AssessmentType::Automatic)
            .await?
        else {
            continue;
        };

        statistics.result_count += 1;
        let mut issues_per_category: HashMap<String, usize> = HashMap::new();
        for item in &result.feedback {
            if let Some(name) = item.test_name() {
                let entry = statistics
                    .test_case_stats
                    .entry(name.to_string())
                    .or_default();
                if item.is_positive_test() {
                    entry.passed += 1;
                } else {
                    entry.failed += 1;
                }
            } else if let Some(category) = item.static_analysis_category() {
                *issues_per_category.entry(category.to_string()).or_default() += 1;
            }
        }

        for (category, count) in issues_per_category {
            *statistics
                .category_issue_histogram
                .entry(category)
                .or_default()
                .entry(count)
                .or_default() += 1;
        }
    }

    Ok(statistics)
}
