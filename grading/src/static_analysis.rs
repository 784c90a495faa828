//! Static-analysis categories and their penalty policy.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Whether findings in a category are penalized at all.
///
/// Feedback in an inactive category is dropped from results entirely during
/// scoring, not merely hidden.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryState {
    #[default]
    Active,
    Inactive,
}

/// One per-exercise grouping of linter/style rules with its penalty policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticAnalysisCategory {
    pub id: i64,
    pub exercise_id: i64,
    pub name: String,
    /// Points deducted per reported issue in this category.
    pub penalty_per_issue: f64,
    /// Cap on the category's total deduction; `None` leaves it uncapped.
    pub max_penalty: Option<f64>,
    pub state: CategoryState,
}

impl StaticAnalysisCategory {
    pub fn new(id: i64, exercise_id: i64, name: impl Into<String>, penalty_per_issue: f64) -> Self {
        Self {
            id,
            exercise_id,
            name: name.into(),
            penalty_per_issue,
            max_penalty: None,
            state: CategoryState::default(),
        }
    }

    pub fn with_max_penalty(mut self, max_penalty: f64) -> Self {
        self.max_penalty = Some(max_penalty);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.state = CategoryState::Inactive;
        self
    }

    pub fn is_active(&self) -> bool {
        self.state == CategoryState::Active
    }

    /// Deduction for `issue_count` findings, honoring the per-category cap.
    pub fn penalty_for(&self, issue_count: usize) -> f64 {
        let raw = issue_count as f64 * self.penalty_per_issue;
        match self.max_penalty {
            Some(cap) if raw > cap => cap,
            _ => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_scales_with_issue_count() {
        let category = StaticAnalysisCategory::new(1, 1, "Bad Practice", 3.0);
        assert_eq!(category.penalty_for(0), 0.0);
        assert_eq!(category.penalty_for(5), 15.0);
    }

    #[test]
    fn penalty_is_capped_per_category() {
        let category = StaticAnalysisCategory::new(1, 1, "Bad Practice", 3.0).with_max_penalty(10.0);
        assert_eq!(category.penalty_for(5), 10.0);
        assert_eq!(category.penalty_for(3), 9.0);
    }

    #[test]
    fn inactive_categories_report_their_state() {
        let category = StaticAnalysisCategory::new(1, 1, "Style", 0.5).inactive();
        assert!(!category.is_active());
        assert_eq!(category.state, CategoryState::Inactive);
    }
}
