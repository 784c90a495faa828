//! Per-exercise point configuration consumed by the scorer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How the exercise score feeds into the overall course score downstream.
///
/// The numeric score is computed for every variant; the variant only controls
/// the bonus cap here (aggregation itself happens outside this engine).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IncludedInOverallScore {
    #[default]
    IncludedCompletely,
    IncludedAsBonus,
    NotIncluded,
}

/// Everything about an exercise the scorer needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseConfig {
    pub exercise_id: i64,
    pub max_points: f64,
    /// Extra points achievable beyond `max_points`; 0 disables the bonus cap
    /// extension.
    pub bonus_points: f64,
    pub inclusion: IncludedInOverallScore,
    /// Cap on the total static-analysis deduction, in percent of
    /// `max_points`. `None` leaves the deduction uncapped.
    pub max_static_analysis_penalty: Option<f64>,
    pub static_analysis_enabled: bool,
    pub due_date: Option<DateTime<Utc>>,
    pub assessment_due_date: Option<DateTime<Utc>>,
    /// Decimal places kept when rounding the final score percentage.
    pub score_precision: u32,
}

impl ExerciseConfig {
    pub fn new(exercise_id: i64, max_points: f64) -> Self {
        Self {
            exercise_id,
            max_points,
            bonus_points: 0.0,
            inclusion: IncludedInOverallScore::default(),
            max_static_analysis_penalty: None,
            static_analysis_enabled: false,
            due_date: None,
            assessment_due_date: None,
            score_precision: 1,
        }
    }

    pub fn with_bonus_points(mut self, bonus_points: f64) -> Self {
        self.bonus_points = bonus_points;
        self
    }

    pub fn with_inclusion(mut self, inclusion: IncludedInOverallScore) -> Self {
        self.inclusion = inclusion;
        self
    }

    pub fn with_static_analysis(mut self, max_penalty_percent: Option<f64>) -> Self {
        self.static_analysis_enabled = true;
        self.max_static_analysis_penalty = max_penalty_percent;
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_assessment_due_date(mut self, assessment_due_date: DateTime<Utc>) -> Self {
        self.assessment_due_date = Some(assessment_due_date);
        self
    }

    /// An exercise without a due date behaves as if it had already passed:
    /// nothing is held back.
    pub fn due_date_passed(&self, now: DateTime<Utc>) -> bool {
        self.due_date.map(|date| date <= now).unwrap_or(true)
    }

    /// The assessment period never ends while no assessment due date is set.
    pub fn assessment_due_date_passed(&self, now: DateTime<Utc>) -> bool {
        self.assessment_due_date
            .map(|date| date <= now)
            .unwrap_or(false)
    }

    /// Total points a submission can earn, bonus included.
    pub fn achievable_points(&self) -> f64 {
        self.max_points + self.bonus_points
    }

    /// Upper bound for the final score percentage.
    pub fn max_score_percentage(&self) -> f64 {
        if self.inclusion == IncludedInOverallScore::IncludedCompletely && self.bonus_points > 0.0 {
            100.0 + self.bonus_points / self.max_points * 100.0
        } else {
            100.0
        }
    }

    /// The static-analysis deduction cap in points, if one is configured.
    pub fn max_static_analysis_penalty_points(&self) -> Option<f64> {
        self.max_static_analysis_penalty
            .map(|percent| percent / 100.0 * self.max_points)
    }
}

/// Rounds a percentage to the configured number of decimal places.
///
/// Applied exactly once, at the very end of a score calculation; all
/// intermediate arithmetic stays unrounded.
pub fn round_score(score: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (score * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn bonus_extends_the_score_cap_only_when_included_completely() {
        let config = ExerciseConfig::new(1, 42.0).with_bonus_points(42.0);
        assert_eq!(config.max_score_percentage(), 200.0);

        let as_bonus = config
            .clone()
            .with_inclusion(IncludedInOverallScore::IncludedAsBonus);
        assert_eq!(as_bonus.max_score_percentage(), 100.0);

        let no_bonus = ExerciseConfig::new(1, 42.0);
        assert_eq!(no_bonus.max_score_percentage(), 100.0);
    }

    #[test]
    fn missing_due_date_counts_as_passed() {
        let now = Utc::now();
        let config = ExerciseConfig::new(1, 10.0);
        assert!(config.due_date_passed(now));

        let future = config.clone().with_due_date(now + Duration::hours(2));
        assert!(!future.due_date_passed(now));

        let past = config.with_due_date(now - Duration::hours(2));
        assert!(past.due_date_passed(now));
    }

    #[test]
    fn missing_assessment_due_date_never_passes() {
        let now = Utc::now();
        let config = ExerciseConfig::new(1, 10.0);
        assert!(!config.assessment_due_date_passed(now));
        assert!(
            config
                .with_assessment_due_date(now - Duration::minutes(1))
                .assessment_due_date_passed(now)
        );
    }

    #[test]
    fn penalty_cap_is_percent_of_max_points() {
        let config = ExerciseConfig::new(1, 42.0).with_static_analysis(Some(40.0));
        let cap = config.max_static_analysis_penalty_points().unwrap();
        assert!((cap - 16.8).abs() < 1e-9);

        let uncapped = ExerciseConfig::new(1, 42.0).with_static_analysis(None);
        assert_eq!(uncapped.max_static_analysis_penalty_points(), None);
    }

    #[test]
    fn rounding_happens_at_the_requested_precision() {
        assert_eq!(round_score(133.3333333, 1), 133.3);
        assert_eq!(round_score(26.190476, 1), 26.2);
        assert_eq!(round_score(93.335, 2), 93.34);
        assert_eq!(round_score(50.0, 0), 50.0);
    }
}
