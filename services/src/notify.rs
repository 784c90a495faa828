//! Seam to the notification collaborator.
//!
//! The engine fires exactly one notification per exercise per evaluation pass
//! when duplicate test cases are detected; the payload is the exercise
//! identity only. What happens with it (group notification, mail, ...) is the
//! collaborator's business.

use async_trait::async_trait;
use tokio::sync::Mutex;

#[async_trait]
pub trait DuplicateTestNotifier: Send + Sync {
    async fn notify_duplicate_test_cases(&self, exercise_id: i64);
}

/// Production default when no external collaborator is wired up: the event
/// lands in the log where operators will see it.
pub struct LoggingNotifier;

#[async_trait]
impl DuplicateTestNotifier for LoggingNotifier {
    async fn notify_duplicate_test_cases(&self, exercise_id: i64) {
        log::warn!("exercise {exercise_id} has duplicate test cases, editors and instructors should review the test names");
    }
}

/// Captures notified exercise ids; the test double for the collaborator.
#[derive(Default)]
pub struct RecordingNotifier {
    notified: Mutex<Vec<i64>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn notified_exercises(&self) -> Vec<i64> {
        self.notified.lock().await.clone()
    }
}

#[async_trait]
impl DuplicateTestNotifier for RecordingNotifier {
    async fn notify_duplicate_test_cases(&self, exercise_id: i64) {
        self.notified.lock().await.push(exercise_id);
    }
}
