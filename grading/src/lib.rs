//! # Grading Library
//!
//! The pure core of the programming-exercise grading engine. It turns one
//! feedback set — automated test outcomes, static-analysis findings and
//! manual tutor remarks — plus the exercise's grading configuration into a
//! single bounded, reproducible percentage score.
//!
//! ## Key Concepts
//! - **GradingJob**: builder bundling one submission's feedback with the
//!   exercise configuration for a single calculation.
//! - **Test case registry**: per-exercise weights, bonuses and visibility.
//! - **Static-analysis categories**: grouped findings with a penalty policy.
//! - **Visibility filter**: what a given audience may see of a result.
//!
//! Everything in this crate is side-effect free; persistence and the
//! assessment lifecycle live in their own crates.

pub mod duplicates;
pub mod error;
pub mod exercise;
pub mod feedback;
pub mod scorer;
pub mod static_analysis;
pub mod test_case;
pub mod visibility;

use crate::error::GradingError;
use crate::exercise::ExerciseConfig;
use crate::feedback::Feedback;
use crate::scorer::{ScoreOutcome, calculate_score};
use crate::static_analysis::StaticAnalysisCategory;
use crate::test_case::TestCase;

/// A single score calculation, assembled step by step.
///
/// Bundles the feedback of one submission with the registries and
/// configuration of its exercise. Construction is cheap; nothing happens
/// until [`GradingJob::grade`] runs.
pub struct GradingJob<'a> {
    feedback: Vec<Feedback>,
    test_cases: &'a [TestCase],
    categories: &'a [StaticAnalysisCategory],
    config: &'a ExerciseConfig,
    include_after_due_date: bool,
}

impl<'a> GradingJob<'a> {
    pub fn new(
        feedback: Vec<Feedback>,
        test_cases: &'a [TestCase],
        config: &'a ExerciseConfig,
    ) -> Self {
        Self {
            feedback,
            test_cases,
            categories: &[],
            config,
            include_after_due_date: true,
        }
    }

    /// Attach the exercise's static-analysis categories.
    pub fn with_categories(mut self, categories: &'a [StaticAnalysisCategory]) -> Self {
        self.categories = categories;
        self
    }

    /// Control whether `AfterDueDate` test cases count towards the score.
    pub fn including_after_due_date(mut self, include: bool) -> Self {
        self.include_after_due_date = include;
        self
    }

    /// Run the calculation.
    pub fn grade(self) -> Result<ScoreOutcome, GradingError> {
        calculate_score(
            self.feedback,
            self.test_cases,
            self.categories,
            self.config,
            self.include_after_due_date,
        )
    }
}
