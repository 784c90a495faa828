//! The per-exercise test case registry.
//!
//! Test cases are configuration, not build output: they carry the weight,
//! bonus and visibility knobs instructors tune. They are never deleted, only
//! deactivated, so historic results keep referring to a known name; the sole
//! exception is a registry regeneration from a fresh solution build.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::GradingError;
use crate::visibility::Visibility;

/// One named automated check contributing weight/bonus to a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: i64,
    pub exercise_id: i64,
    /// Unique per exercise.
    pub test_name: String,
    pub weight: f64,
    pub bonus_multiplier: f64,
    pub bonus_points: f64,
    pub active: bool,
    pub visibility: Visibility,
}

impl TestCase {
    pub fn new(id: i64, exercise_id: i64, test_name: impl Into<String>) -> Self {
        Self {
            id,
            exercise_id,
            test_name: test_name.into(),
            weight: 1.0,
            bonus_multiplier: 1.0,
            bonus_points: 0.0,
            active: true,
            visibility: Visibility::Always,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_bonus(mut self, multiplier: f64, points: f64) -> Self {
        self.bonus_multiplier = multiplier;
        self.bonus_points = points;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether this test case participates in the score right now.
    ///
    /// `Never` test cases never contribute to the student-visible score, no
    /// matter who asks; their feedback merely stays readable for staff.
    pub fn counts_towards_score(&self, include_after_due_date: bool) -> bool {
        if !self.active {
            return false;
        }
        match self.visibility {
            Visibility::Always => true,
            Visibility::AfterDueDate => include_after_due_date,
            Visibility::Never => false,
        }
    }
}

/// One row of the bulk-update payload for the registry.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TestCaseUpdate {
    pub test_name: String,
    #[validate(range(min = 0.0, message = "weight must not be negative"))]
    pub weight: f64,
    #[validate(range(min = 0.0, message = "bonus multiplier must not be negative"))]
    pub bonus_multiplier: f64,
    #[validate(range(min = 0.0, message = "bonus points must not be negative"))]
    pub bonus_points: f64,
    pub active: bool,
    pub visibility: Visibility,
}

/// Applies a bulk update to the registry, all-or-nothing.
///
/// Every row is validated and resolved against the registry before the first
/// write, so a rejected update leaves the registry untouched.
pub fn apply_bulk_update(
    registry: &mut [TestCase],
    updates: &[TestCaseUpdate],
) -> Result<usize, GradingError> {
    for update in updates {
        update.validate()?;
    }

    let mut targets = Vec::with_capacity(updates.len());
    for update in updates {
        let index = registry
            .iter()
            .position(|tc| tc.test_name == update.test_name)
            .ok_or_else(|| GradingError::UnknownTestCase(update.test_name.clone()))?;
        targets.push(index);
    }

    for (index, update) in targets.into_iter().zip(updates) {
        let test_case = &mut registry[index];
        test_case.weight = update.weight;
        test_case.bonus_multiplier = update.bonus_multiplier;
        test_case.bonus_points = update.bonus_points;
        test_case.active = update.active;
        test_case.visibility = update.visibility;
    }

    Ok(updates.len())
}

/// Restores the neutral grading configuration on every test case.
pub fn reset_registry(registry: &mut [TestCase]) {
    for test_case in registry.iter_mut() {
        test_case.weight = 1.0;
        test_case.bonus_multiplier = 1.0;
        test_case.bonus_points = 0.0;
    }
}

/// Outcome of reconciling the registry with a solution build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySync {
    pub added: usize,
    pub activated: usize,
    pub deactivated: usize,
}

/// Reconciles the registry with the test names observed in a solution build.
///
/// Observed names are (re)activated and unknown ones appended with neutral
/// defaults; configured names the build no longer reports are deactivated.
/// This is the only path that grows the registry.
pub fn sync_with_solution_run(
    registry: &mut Vec<TestCase>,
    exercise_id: i64,
    observed_names: &[String],
) -> RegistrySync {
    let mut sync = RegistrySync::default();

    for test_case in registry.iter_mut() {
        let observed = observed_names.iter().any(|n| *n == test_case.test_name);
        if observed && !test_case.active {
            test_case.active = true;
            sync.activated += 1;
        } else if !observed && test_case.active {
            test_case.active = false;
            sync.deactivated += 1;
        }
    }

    let mut next_id = registry.iter().map(|tc| tc.id).max().unwrap_or(0) + 1;
    for name in observed_names {
        if !registry.iter().any(|tc| &tc.test_name == name) {
            registry.push(TestCase::new(next_id, exercise_id, name.clone()));
            next_id += 1;
            sync.added += 1;
        }
    }

    sync
}
