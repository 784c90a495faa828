//! The submission/result arena.
//!
//! Results are stored flat and indexed by id; submissions hold the ordered id
//! list, and the "latest result" or "first manual result" views are derived
//! by lookup instead of live object-graph pointers. The [`SubmissionStore`]
//! trait is the persistence collaborator's contract; [`InMemoryStore`] is the
//! in-process reference implementation backing tests and single-node
//! deployments.
//!
//! The one operation that must serialize is [`SubmissionStore::lock_result_for_round`]:
//! creating the manual result for a correction round is a compare-and-set, so
//! two tutors racing for the same round cannot both win.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::participation::{Participation, ParticipationKind};
use crate::models::result::{AssessmentType, ResultRecord};
use crate::models::submission::Submission;

/// Outcome of a lock request for a correction round.
#[derive(Debug, Clone, PartialEq)]
pub struct LockAcquisition {
    pub result: ResultRecord,
    /// False when the requester already held the lock and got it back.
    pub created: bool,
}

/// Transactional create/read/update/delete over the submission graph, with
/// the per-(submission, correction round) uniqueness guarantee.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn create_participation(
        &self,
        exercise_id: i64,
        kind: ParticipationKind,
        student_id: Option<i64>,
        individual_due_date: Option<DateTime<Utc>>,
    ) -> Participation;

    async fn create_submission(
        &self,
        participation_id: i64,
        commit_hash: Option<String>,
        submitted_at: DateTime<Utc>,
    ) -> Result<Submission, StoreError>;

    /// Appends a completed result to a submission, assigning its id.
    async fn insert_result(&self, record: ResultRecord) -> Result<ResultRecord, StoreError>;

    /// Atomically creates the manual result for a correction round, or
    /// returns the existing one when the requester already holds the lock.
    ///
    /// Fails with [`StoreError::RoundLocked`] when another assessor holds the
    /// round and [`StoreError::RoundAlreadyAssessed`] when the round has a
    /// submitted assessment; neither failure changes any state.
    async fn lock_result_for_round(
        &self,
        submission_id: i64,
        round: u32,
        assessor: i64,
        seed: ResultRecord,
    ) -> Result<LockAcquisition, StoreError>;

    async fn update_result(&self, record: ResultRecord) -> Result<ResultRecord, StoreError>;

    /// Removes a result, preserving the order of the remaining results.
    async fn delete_result(&self, result_id: i64) -> Result<(), StoreError>;

    async fn result(&self, result_id: i64) -> Result<ResultRecord, StoreError>;

    async fn submission(&self, submission_id: i64) -> Result<Submission, StoreError>;

    async fn participation(&self, participation_id: i64) -> Result<Participation, StoreError>;

    /// All results of a submission in chronological order.
    async fn results_of_submission(
        &self,
        submission_id: i64,
    ) -> Result<Vec<ResultRecord>, StoreError>;

    async fn latest_result(&self, submission_id: i64)
    -> Result<Option<ResultRecord>, StoreError>;

    async fn latest_result_of_type(
        &self,
        submission_id: i64,
        assessment_type: AssessmentType,
    ) -> Result<Option<ResultRecord>, StoreError>;

    /// The earliest manual result; it carries the original complaint flag
    /// across later overrides.
    async fn first_manual_result(
        &self,
        submission_id: i64,
    ) -> Result<Option<ResultRecord>, StoreError>;

    async fn manual_result_for_round(
        &self,
        submission_id: i64,
        round: u32,
    ) -> Result<Option<ResultRecord>, StoreError>;

    async fn participations_of_exercise(&self, exercise_id: i64) -> Vec<Participation>;

    async fn latest_submission(
        &self,
        participation_id: i64,
    ) -> Result<Option<Submission>, StoreError>;
}

#[derive(Default)]
struct Inner {
    participations: HashMap<i64, Participation>,
    submissions: HashMap<i64, Submission>,
    results: HashMap<i64, ResultRecord>,
    next_participation_id: i64,
    next_submission_id: i64,
    next_result_id: i64,
}

impl Inner {
    fn submission(&self, id: i64) -> Result<&Submission, StoreError> {
        self.submissions
            .get(&id)
            .ok_or_else(|| StoreError::not_found("submission", id))
    }

    fn ordered_results(&self, submission_id: i64) -> Result<Vec<&ResultRecord>, StoreError> {
        let submission = self.submission(submission_id)?;
        Ok(submission
            .result_ids
            .iter()
            .filter_map(|id| self.results.get(id))
            .collect())
    }
}

/// The in-memory store. A single mutex around the graph makes every
/// operation — in particular the round lock — linearizable.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for InMemoryStore {
    async fn create_participation(
        &self,
        exercise_id: i64,
        kind: ParticipationKind,
        student_id: Option<i64>,
        individual_due_date: Option<DateTime<Utc>>,
    ) -> Participation {
        let mut inner = self.inner.lock().await;
        inner.next_participation_id += 1;
        let participation = Participation {
            id: inner.next_participation_id,
            exercise_id,
            kind,
            student_id,
            individual_due_date,
            submission_ids: Vec::new(),
        };
        inner
            .participations
            .insert(participation.id, participation.clone());
        participation
    }

    async fn create_submission(
        &self,
        participation_id: i64,
        commit_hash: Option<String>,
        submitted_at: DateTime<Utc>,
    ) -> Result<Submission, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.participations.contains_key(&participation_id) {
            return Err(StoreError::not_found("participation", participation_id));
        }
        inner.next_submission_id += 1;
        let submission = Submission {
            id: inner.next_submission_id,
            participation_id,
            commit_hash,
            submitted_at,
            result_ids: Vec::new(),
        };
        inner
            .submissions
            .insert(submission.id, submission.clone());
        inner
            .participations
            .get_mut(&participation_id)
            .expect("checked above")
            .submission_ids
            .push(submission.id);
        Ok(submission)
    }

    async fn insert_result(&self, mut record: ResultRecord) -> Result<ResultRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.submissions.contains_key(&record.submission_id) {
            return Err(StoreError::not_found("submission", record.submission_id));
        }
        inner.next_result_id += 1;
        record.id = inner.next_result_id;
        inner.results.insert(record.id, record.clone());
        inner
            .submissions
            .get_mut(&record.submission_id)
            .expect("checked above")
            .result_ids
            .push(record.id);
        Ok(record)
    }

    async fn lock_result_for_round(
        &self,
        submission_id: i64,
        round: u32,
        assessor: i64,
        mut seed: ResultRecord,
    ) -> Result<LockAcquisition, StoreError> {
        let mut inner = self.inner.lock().await;

        let existing = inner
            .ordered_results(submission_id)?
            .into_iter()
            .find(|r| r.is_manual() && r.correction_round == round)
            .cloned();

        if let Some(result) = existing {
            return match (result.is_locked(), result.assessor) {
                (true, Some(holder)) if holder == assessor => Ok(LockAcquisition {
                    result,
                    created: false,
                }),
                (true, holder) => Err(StoreError::RoundLocked {
                    submission_id,
                    round,
                    held_by: holder.unwrap_or_default(),
                }),
                (false, _) => Err(StoreError::RoundAlreadyAssessed {
                    submission_id,
                    round,
                }),
            };
        }

        inner.next_result_id += 1;
        seed.id = inner.next_result_id;
        seed.submission_id = submission_id;
        seed.correction_round = round;
        seed.assessment_type = AssessmentType::SemiAutomatic;
        seed.completion_date = None;
        seed.assessor = Some(assessor);

        inner.results.insert(seed.id, seed.clone());
        inner
            .submissions
            .get_mut(&submission_id)
            .expect("resolved above")
            .result_ids
            .push(seed.id);

        debug!(
            "assessment locked: submission {submission_id}, round {round}, assessor {assessor}"
        );
        Ok(LockAcquisition {
            result: seed,
            created: true,
        })
    }

    async fn update_result(&self, record: ResultRecord) -> Result<ResultRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        if !inner.results.contains_key(&record.id) {
            return Err(StoreError::not_found("result", record.id));
        }
        inner.results.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete_result(&self, result_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .results
            .remove(&result_id)
            .ok_or_else(|| StoreError::not_found("result", result_id))?;
        if let Some(submission) = inner.submissions.get_mut(&record.submission_id) {
            submission.result_ids.retain(|id| *id != result_id);
        }
        Ok(())
    }

    async fn result(&self, result_id: i64) -> Result<ResultRecord, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .results
            .get(&result_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("result", result_id))
    }

    async fn submission(&self, submission_id: i64) -> Result<Submission, StoreError> {
        let inner = self.inner.lock().await;
        inner.submission(submission_id).cloned()
    }

    async fn participation(&self, participation_id: i64) -> Result<Participation, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .participations
            .get(&participation_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("participation", participation_id))
    }

    async fn results_of_submission(
        &self,
        submission_id: i64,
    ) -> Result<Vec<ResultRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .ordered_results(submission_id)?
            .into_iter()
            .cloned()
            .collect())
    }

    async fn latest_result(
        &self,
        submission_id: i64,
    ) -> Result<Option<ResultRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.ordered_results(submission_id)?.last().cloned().cloned())
    }

    async fn latest_result_of_type(
        &self,
        submission_id: i64,
        assessment_type: AssessmentType,
    ) -> Result<Option<ResultRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .ordered_results(submission_id)?
            .into_iter()
            .rev()
            .find(|r| r.assessment_type == assessment_type)
            .cloned())
    }

    async fn first_manual_result(
        &self,
        submission_id: i64,
    ) -> Result<Option<ResultRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .ordered_results(submission_id)?
            .into_iter()
            .find(|r| r.is_manual())
            .cloned())
    }

    async fn manual_result_for_round(
        &self,
        submission_id: i64,
        round: u32,
    ) -> Result<Option<ResultRecord>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .ordered_results(submission_id)?
            .into_iter()
            .find(|r| r.is_manual() && r.correction_round == round)
            .cloned())
    }

    async fn participations_of_exercise(&self, exercise_id: i64) -> Vec<Participation> {
        let inner = self.inner.lock().await;
        let mut participations: Vec<Participation> = inner
            .participations
            .values()
            .filter(|p| p.exercise_id == exercise_id)
            .cloned()
            .collect();
        participations.sort_by_key(|p| p.id);
        participations
    }

    async fn latest_submission(
        &self,
        participation_id: i64,
    ) -> Result<Option<Submission>, StoreError> {
        let inner = self.inner.lock().await;
        let participation = inner
            .participations
            .get(&participation_id)
            .ok_or_else(|| StoreError::not_found("participation", participation_id))?;
        Ok(participation
            .submission_ids
            .last()
            .and_then(|id| inner.submissions.get(id))
            .cloned())
    }
}
