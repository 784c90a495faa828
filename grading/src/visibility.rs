//! Visibility policy for test cases and the feedback attached to them.
//!
//! Visibility controls what a student may *see*; whether a test case *counts*
//! towards the score is decided separately by the scorer. Staff audiences
//! always see everything so they can grade transparently.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::feedback::Feedback;

/// When feedback tied to a test case becomes visible to students.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// Visible from exercise start.
    #[default]
    Always,
    /// Hidden from students until the exercise due date has passed.
    AfterDueDate,
    /// Never shown to students; staff still see it.
    Never,
}

/// Who is asking to see a piece of feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Student,
    /// Tutors, editors and instructors.
    Staff,
}

/// Decides whether a single feedback item may be shown to the given audience.
pub fn is_visible(visibility: Visibility, due_date_passed: bool, audience: Audience) -> bool {
    match audience {
        Audience::Staff => true,
        Audience::Student => match visibility {
            Visibility::Always => true,
            Visibility::AfterDueDate => due_date_passed,
            Visibility::Never => false,
        },
    }
}

/// Filters a feedback set down to what the audience may see.
///
/// The visibility tag stays on each surviving item so a client can still mark
/// "only visible after the due date" entries differently for staff.
pub fn filter_feedback(
    feedback: Vec<Feedback>,
    due_date_passed: bool,
    audience: Audience,
) -> Vec<Feedback> {
    feedback
        .into_iter()
        .filter(|item| is_visible(item.visibility, due_date_passed, audience))
        .collect()
}
