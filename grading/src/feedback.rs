//! The feedback model: the atomic unit every result is assembled from.
//!
//! A feedback entry is either tied to an automated test case, a static
//! analysis finding, manual tutor input, or free-standing general credit. The
//! flavors are an explicit sum type so downstream code never has to infer the
//! kind from which optional fields happen to be set.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::GradingError;
use crate::visibility::Visibility;

/// Detail texts longer than this are moved out of the inline field into the
/// long-feedback side store.
pub const LONG_FEEDBACK_THRESHOLD: usize = 5_000;

/// Appended to an inline detail text that was cut off for the side store.
pub const TRUNCATION_MARKER: &str = " [...]";

/// Detail text synthesized for an active test case the build never reported.
pub const NOT_EXECUTED_DETAIL_TEXT: &str = "Test was not executed.";

/// Detail text of the annotation appended for duplicated test case output.
pub const DUPLICATE_DETAIL_TEXT: &str =
    "This is a duplicate test case. Please review all your test cases and verify that your test cases have unique names!";

/// The flavor of a feedback entry together with its kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedbackKind {
    /// Outcome of one named automated test case.
    Test { test_name: String, positive: bool },
    /// One static-analysis finding; `detail` carries at least a `category`.
    StaticAnalysis {
        identifier: String,
        detail: serde_json::Value,
    },
    /// Tutor-written feedback, optionally unreferenced (not anchored in code).
    Manual { unreferenced: bool },
    /// Untyped feedback that only carries credits.
    General,
}

/// One feedback entry, owned by exactly one result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    /// Points contributed by this entry; `None` until scoring assigns them,
    /// or for manual remarks without a score.
    pub credits: Option<f64>,
    pub detail_text: Option<String>,
    pub visibility: Visibility,
    /// Set when the full detail text lives in the long-feedback side store.
    pub has_long_feedback: bool,
}

impl Feedback {
    pub fn test(test_name: impl Into<String>, positive: bool) -> Self {
        Self {
            kind: FeedbackKind::Test {
                test_name: test_name.into(),
                positive,
            },
            credits: None,
            detail_text: None,
            visibility: Visibility::Always,
            has_long_feedback: false,
        }
    }

    pub fn static_analysis(identifier: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            kind: FeedbackKind::StaticAnalysis {
                identifier: identifier.into(),
                detail: json!({ "category": category.into() }),
            },
            credits: None,
            detail_text: None,
            visibility: Visibility::Always,
            has_long_feedback: false,
        }
    }

    pub fn manual(detail_text: impl Into<String>, credits: Option<f64>) -> Self {
        Self {
            kind: FeedbackKind::Manual {
                unreferenced: false,
            },
            credits,
            detail_text: Some(detail_text.into()),
            visibility: Visibility::Always,
            has_long_feedback: false,
        }
    }

    pub fn manual_unreferenced(detail_text: impl Into<String>, credits: Option<f64>) -> Self {
        Self {
            kind: FeedbackKind::Manual { unreferenced: true },
            credits,
            detail_text: Some(detail_text.into()),
            visibility: Visibility::Always,
            has_long_feedback: false,
        }
    }

    pub fn general(credits: f64) -> Self {
        Self {
            kind: FeedbackKind::General,
            credits: Some(credits),
            detail_text: None,
            visibility: Visibility::Always,
            has_long_feedback: false,
        }
    }

    pub fn with_detail(mut self, detail_text: impl Into<String>) -> Self {
        self.detail_text = Some(detail_text.into());
        self
    }

    pub fn with_credits(mut self, credits: f64) -> Self {
        self.credits = Some(credits);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn is_test(&self) -> bool {
        matches!(self.kind, FeedbackKind::Test { .. })
    }

    pub fn is_static_analysis(&self) -> bool {
        matches!(self.kind, FeedbackKind::StaticAnalysis { .. })
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.kind, FeedbackKind::Manual { .. })
    }

    pub fn test_name(&self) -> Option<&str> {
        match &self.kind {
            FeedbackKind::Test { test_name, .. } => Some(test_name),
            _ => None,
        }
    }

    /// True for a test feedback entry reporting a pass.
    pub fn is_positive_test(&self) -> bool {
        matches!(self.kind, FeedbackKind::Test { positive: true, .. })
    }

    /// Category name carried in a static-analysis detail payload.
    pub fn static_analysis_category(&self) -> Option<&str> {
        match &self.kind {
            FeedbackKind::StaticAnalysis { detail, .. } => {
                detail.get("category").and_then(|v| v.as_str())
            }
            _ => None,
        }
    }

    /// Structural validation applied before any persistence or scoring.
    ///
    /// Manual feedback without a detail text is rejected outright rather than
    /// silently skipped, so a tutor cannot submit an empty remark.
    pub fn validate(&self) -> Result<(), GradingError> {
        if self.is_manual() {
            let missing = self
                .detail_text
                .as_deref()
                .map(|text| text.trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(GradingError::Validation(
                    "manual feedback requires a detail text".into(),
                ));
            }
        }
        Ok(())
    }

    /// Moves an over-long detail text out of the inline field.
    ///
    /// Returns the full body for the side store and leaves a truncated inline
    /// text behind; entries within the threshold are left untouched.
    pub fn externalize_long_detail(&mut self) -> Option<String> {
        let text = self.detail_text.as_deref()?;
        if text.chars().count() <= LONG_FEEDBACK_THRESHOLD {
            return None;
        }

        let full = text.to_owned();
        let kept = LONG_FEEDBACK_THRESHOLD - TRUNCATION_MARKER.chars().count();
        let mut truncated: String = full.chars().take(kept).collect();
        truncated.push_str(TRUNCATION_MARKER);

        self.detail_text = Some(truncated);
        self.has_long_feedback = true;
        Some(full)
    }
}
