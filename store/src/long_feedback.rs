//! Side store for over-long feedback detail texts.
//!
//! Feedback entries keep a truncated inline text; the full body lives here,
//! addressed by the owning result and the entry's position within it. Bodies
//! are dropped together with their result, independent of the result's other
//! fields.

use std::collections::HashMap;

use tokio::sync::Mutex;

/// Addresses one feedback entry within a result.
pub type LongFeedbackKey = (i64, usize);

#[derive(Default)]
pub struct LongFeedbackStore {
    bodies: Mutex<HashMap<LongFeedbackKey, String>>,
}

impl LongFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put(&self, result_id: i64, feedback_index: usize, body: String) {
        self.bodies
            .lock()
            .await
            .insert((result_id, feedback_index), body);
    }

    pub async fn get(&self, result_id: i64, feedback_index: usize) -> Option<String> {
        self.bodies
            .lock()
            .await
            .get(&(result_id, feedback_index))
            .cloned()
    }

    /// Drops every body belonging to the result, e.g. when it is deleted or
    /// its feedback is replaced by a re-evaluation.
    pub async fn remove_for_result(&self, result_id: i64) {
        self.bodies
            .lock()
            .await
            .retain(|(owner, _), _| *owner != result_id);
    }
}
