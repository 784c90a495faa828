//! Lifecycle services of the grading engine.
//!
//! [`GradingService`] turns finished builds into scored results and rolls
//! configuration changes out over an exercise; [`AssessmentService`] drives
//! the manual assessment state machine with its locking and override rules.
//! Both are thin orchestrations over the pure `grading` crate and the
//! `store` persistence contract.

pub mod actor;
pub mod assessment_service;
pub mod error;
pub mod grading_service;
pub mod notify;
pub mod queue;
pub mod statistics;

pub use actor::{Actor, Role};
pub use assessment_service::{AssessmentService, ManualAssessment};
pub use error::AssessmentError;
pub use grading_service::{
    BuildOutcome, ExerciseSnapshot, GradingService, ReEvaluateOptions, ReEvaluationReport,
};
pub use notify::{DuplicateTestNotifier, LoggingNotifier, RecordingNotifier};
pub use statistics::{GradingStatistics, TestCaseStats, grading_statistics};
