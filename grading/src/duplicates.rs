//! Detection of duplicated test case output.
//!
//! Two nominally distinct test cases reporting byte-identical detail text
//! almost always mean a copy-pasted test definition in the exercise. The
//! offending entries are annotated in place rather than removed, so the
//! grading trail stays complete; the caller notifies staff once per exercise.

use std::collections::HashMap;

use crate::feedback::{DUPLICATE_DETAIL_TEXT, Feedback, FeedbackKind, NOT_EXECUTED_DETAIL_TEXT};

/// What the duplicate pre-pass found in one feedback set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DuplicateReport {
    /// Test names whose output duplicated an earlier test's, sorted and
    /// deduplicated (this is the notification payload detail).
    pub duplicated_test_names: Vec<String>,
    /// Number of annotation entries appended to the feedback set.
    pub annotations_added: usize,
}

impl DuplicateReport {
    pub fn found(&self) -> bool {
        self.annotations_added > 0
    }
}

/// Annotates duplicated automatic test output.
///
/// For each group of test feedback entries carrying the same non-empty detail
/// text, every entry after the first that belongs to a *different* test case
/// gets a negative annotation entry appended. The original entries stay in
/// the set untouched.
///
/// Annotations from an earlier pass are dropped and re-derived, and texts the
/// engine generates itself (not-executed placeholders, the annotations) never
/// participate in detection, so re-running the pass over already persisted
/// feedback reproduces the same set instead of compounding it.
pub fn annotate_duplicates(feedback: &mut Vec<Feedback>) -> DuplicateReport {
    feedback.retain(|item| item.detail_text.as_deref() != Some(DUPLICATE_DETAIL_TEXT));

    let mut annotated_names: Vec<String> = Vec::new();

    {
        let mut first_by_text: HashMap<&str, &str> = HashMap::new();
        for item in feedback.iter() {
            let FeedbackKind::Test { test_name, .. } = &item.kind else {
                continue;
            };
            let Some(text) = item.detail_text.as_deref().filter(|t| !t.is_empty()) else {
                continue;
            };
            if text == NOT_EXECUTED_DETAIL_TEXT {
                continue;
            }
            match first_by_text.get(text) {
                None => {
                    first_by_text.insert(text, test_name);
                }
                Some(first) if *first != test_name.as_str() => {
                    annotated_names.push(test_name.clone());
                }
                // The same test repeating its own text is not a name clash.
                Some(_) => {}
            }
        }
    }

    let annotations_added = annotated_names.len();
    for name in &annotated_names {
        feedback.push(Feedback::test(name.clone(), false).with_detail(DUPLICATE_DETAIL_TEXT));
    }

    let mut duplicated_test_names = annotated_names;
    duplicated_test_names.sort();
    duplicated_test_names.dedup();

    DuplicateReport {
        duplicated_test_names,
        annotations_added,
    }
}
