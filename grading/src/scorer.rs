//! The score calculator.
//!
//! A pure function from one feedback set plus the exercise configuration to a
//! bounded percentage score. No storage, no clock, no globals: everything the
//! calculation depends on comes in as an argument, which is what makes bulk
//! re-evaluation embarrassingly parallel and repeat runs reproducible.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::duplicates::{DuplicateReport, annotate_duplicates};
use crate::error::GradingError;
use crate::exercise::{ExerciseConfig, round_score};
use crate::feedback::{Feedback, FeedbackKind, NOT_EXECUTED_DETAIL_TEXT};
use crate::static_analysis::StaticAnalysisCategory;
use crate::test_case::TestCase;

/// Everything one calculation produces.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    /// Final percentage, capped and rounded.
    pub score: f64,
    /// `None` while the exercise has no test cases to judge against.
    pub successful: Option<bool>,
    /// The cleaned and annotated feedback set to persist.
    pub feedback: Vec<Feedback>,
    /// Test cases that counted towards this score.
    pub test_case_count: usize,
    pub passed_test_case_count: usize,
    /// Static-analysis findings that survived category filtering.
    pub code_issue_count: usize,
    pub duplicates: DuplicateReport,
}

/// Calculates the score for one feedback set.
///
/// `include_after_due_date` states whether test cases with `AfterDueDate`
/// visibility may count; the caller derives it from the participation's due
/// date. Feedback for active test cases that may *not* count stays in the
/// returned set (the visibility filter decides what a reader sees), it simply
/// contributes nothing.
pub fn calculate_score(
    mut feedback: Vec<Feedback>,
    test_cases: &[TestCase],
    categories: &[StaticAnalysisCategory],
    config: &ExerciseConfig,
    include_after_due_date: bool,
) -> Result<ScoreOutcome, GradingError> {
    if config.max_points <= 0.0 {
        return Err(GradingError::InvalidConfiguration(format!(
            "exercise {} has no positive max points",
            config.exercise_id
        )));
    }
    for item in &feedback {
        item.validate()?;
    }

    // Static-analysis findings only exist relative to a configured, active
    // category; everything else is dropped from the result for good.
    feedback.retain(|item| {
        if !item.is_static_analysis() {
            return true;
        }
        match item.static_analysis_category() {
            Some(name) => categories.iter().any(|c| c.name == name && c.is_active()),
            None => false,
        }
    });

    let active: Vec<&TestCase> = test_cases.iter().filter(|tc| tc.active).collect();
    let has_test_feedback = feedback.iter().any(|f| f.is_test());
    let has_assessor_feedback = feedback
        .iter()
        .any(|f| f.is_manual() || matches!(f.kind, FeedbackKind::General));

    // A build that produced no test outcome at all (and was not manually
    // assessed either) failed before the tests ran. Keep the static-analysis
    // findings for display but do not fabricate failing tests out of it.
    if !active.is_empty() && !has_test_feedback && !has_assessor_feedback {
        feedback.retain(|item| item.is_static_analysis());
        let code_issue_count = feedback.len();
        return Ok(ScoreOutcome {
            score: 0.0,
            successful: None,
            feedback,
            test_case_count: 0,
            passed_test_case_count: 0,
            code_issue_count,
            duplicates: DuplicateReport::default(),
        });
    }

    // Test feedback that no longer maps onto an active test case (renamed or
    // deactivated tests) is stale and dropped.
    let active_names: HashSet<&str> = active.iter().map(|tc| tc.test_name.as_str()).collect();
    feedback.retain(|item| match item.test_name() {
        Some(name) => active_names.contains(name),
        None => true,
    });

    let duplicates = annotate_duplicates(&mut feedback);

    // Feedback inherits the visibility configured on its test case.
    let visibility_by_name: HashMap<&str, _> = active
        .iter()
        .map(|tc| (tc.test_name.as_str(), tc.visibility))
        .collect();
    for item in feedback.iter_mut() {
        let configured = item
            .test_name()
            .and_then(|name| visibility_by_name.get(name))
            .copied();
        if let Some(visibility) = configured {
            item.visibility = visibility;
        }
    }

    let included: Vec<&TestCase> = active
        .iter()
        .copied()
        .filter(|tc| tc.counts_towards_score(include_after_due_date))
        .collect();

    // Every included test case must be represented: tests the build never
    // reported become synthesized failures.
    for test_case in &included {
        let reported = feedback
            .iter()
            .any(|f| f.test_name() == Some(test_case.test_name.as_str()));
        if !reported {
            feedback.push(
                Feedback::test(test_case.test_name.clone(), false)
                    .with_detail(NOT_EXECUTED_DETAIL_TEXT)
                    .with_visibility(test_case.visibility),
            );
        }
    }

    let weight_sum: f64 = included.iter().map(|tc| tc.weight).sum();

    let mut passed_test_case_count = 0usize;
    let mut test_points = 0.0;
    for test_case in &included {
        let passed = feedback.iter().any(|f| {
            f.is_positive_test() && f.test_name() == Some(test_case.test_name.as_str())
        });
        if !passed {
            continue;
        }
        passed_test_case_count += 1;

        let points = points_for_test_case(test_case, weight_sum, included.len(), config);
        test_points += points;
        if let Some(item) = feedback
            .iter_mut()
            .find(|f| f.test_name() == Some(test_case.test_name.as_str()))
        {
            item.credits = Some(points);
        }
    }

    // Cap before the penalty is applied; otherwise an over-achieving
    // submission could absorb the whole deduction.
    let test_points = cap_points(test_points, config);

    let penalty_points = apply_static_analysis_penalty(&mut feedback, categories, config);
    let code_issue_count = feedback.iter().filter(|f| f.is_static_analysis()).count();

    let assessor_points: f64 = feedback
        .iter()
        .filter(|f| f.is_manual() || matches!(f.kind, FeedbackKind::General))
        .map(|f| f.credits.unwrap_or(0.0))
        .sum();

    // Unassigned credits become an explicit zero so result consumers can sum
    // feedback credits without null handling.
    for item in feedback.iter_mut() {
        if item.credits.is_none() {
            item.credits = Some(0.0);
        }
    }

    let mut points = test_points - penalty_points + assessor_points;
    if points < 0.0 {
        points = 0.0;
    }

    let mut score = points / config.max_points * 100.0;
    score = score.clamp(0.0, config.max_score_percentage());
    let score = round_score(score, config.score_precision);

    let successful = if test_cases.is_empty() {
        None
    } else {
        Some(score >= 100.0)
    };

    debug!(
        exercise = config.exercise_id,
        score,
        passed = passed_test_case_count,
        of = included.len(),
        "score calculated"
    );

    Ok(ScoreOutcome {
        score,
        successful,
        feedback,
        test_case_count: included.len(),
        passed_test_case_count,
        code_issue_count,
        duplicates,
    })
}

/// Points awarded for one passed test case.
///
/// A weight sum of exactly zero switches to equal weighting so an all-zero
/// configuration still distinguishes a passing solution from a failing one.
/// The comparison is deliberately exact: an astronomically small but nonzero
/// weight sum must still contribute normally.
fn points_for_test_case(
    test_case: &TestCase,
    weight_sum: f64,
    included_count: usize,
    config: &ExerciseConfig,
) -> f64 {
    let base = if weight_sum == 0.0 {
        config.max_points / included_count as f64
    } else {
        test_case.weight * test_case.bonus_multiplier / weight_sum * config.max_points
    };
    base + test_case.bonus_points
}

fn cap_points(points: f64, config: &ExerciseConfig) -> f64 {
    if points.is_nan() {
        return 0.0;
    }
    points.min(config.achievable_points())
}

/// Deducts static-analysis penalties and writes the per-finding share back
/// onto the feedback credits, so summing credits reproduces the deduction.
fn apply_static_analysis_penalty(
    feedback: &mut [Feedback],
    categories: &[StaticAnalysisCategory],
    config: &ExerciseConfig,
) -> f64 {
    if !config.static_analysis_enabled {
        return 0.0;
    }

    let exercise_cap = config.max_static_analysis_penalty_points();
    let mut total_penalty = 0.0;

    for category in categories.iter().filter(|c| c.is_active()) {
        let indices: Vec<usize> = feedback
            .iter()
            .enumerate()
            .filter(|(_, f)| f.static_analysis_category() == Some(category.name.as_str()))
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            continue;
        }

        let mut category_penalty = category.penalty_for(indices.len());
        if let Some(cap) = exercise_cap {
            if total_penalty + category_penalty > cap {
                category_penalty = cap - total_penalty;
            }
        }
        total_penalty += category_penalty;

        let per_finding = category_penalty / indices.len() as f64;
        for index in indices {
            feedback[index].credits = Some(-per_finding);
        }
    }

    total_penalty
}
