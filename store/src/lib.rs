//! In-process implementation of the persistence collaborator.
//!
//! Holds the submission → result → feedback graph and guarantees the single
//! invariant the assessment lifecycle depends on: at most one uncompleted
//! manual result per (submission, correction round), created atomically.

pub mod arena;
pub mod error;
pub mod long_feedback;
pub mod models;

pub use arena::{InMemoryStore, LockAcquisition, SubmissionStore};
pub use error::StoreError;
pub use long_feedback::LongFeedbackStore;
