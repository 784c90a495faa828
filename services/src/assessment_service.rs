//! Manual assessment lifecycle: locking, submission, override, complaints.
//!
//! Every operation takes the acting user as an explicit [`Actor`] and checks
//! it against the lock and override rules of the state machine. Rejections
//! never change state; the one racy step — creating the lock for a correction
//! round — is delegated to the store's atomic create-if-absent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use grading::GradingJob;
use grading::feedback::Feedback;
use grading::visibility::filter_feedback;
use log::debug;

use store::models::result::{AssessmentType, ResultRecord};
use store::{LongFeedbackStore, SubmissionStore};

use crate::actor::{Actor, Role};
use crate::error::AssessmentError;
use crate::grading_service::{ExerciseSnapshot, due_date_passed_for, externalize_feedback};

/// A tutor's submitted assessment: the full feedback list plus the score
/// field the client is required to send. The engine recomputes the
/// authoritative score from the feedback; the declared value only guards
/// against clients dropping the field.
#[derive(Debug, Clone)]
pub struct ManualAssessment {
    pub score: Option<f64>,
    pub feedback: Vec<Feedback>,
}

pub struct AssessmentService<S> {
    store: Arc<S>,
    long_feedback: Arc<LongFeedbackStore>,
}

impl<S: SubmissionStore> AssessmentService<S> {
    pub fn new(store: Arc<S>, long_feedback: Arc<LongFeedbackStore>) -> Self {
        Self {
            store,
            long_feedback,
        }
    }

    /// Locks a submission's correction round for the acting tutor.
    ///
    /// Creates the round's manual result with no completion date, seeded with
    /// the predecessor's feedback (the latest automatic result for round 0,
    /// the previous round otherwise). Re-locking by the same assessor returns
    /// the existing draft; anyone else is rejected without a state change.
    pub async fn lock_for_assessment(
        &self,
        submission_id: i64,
        correction_round: u32,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<ResultRecord, AssessmentError> {
        if !actor.is_staff() {
            return Err(AssessmentError::LockConflict(
                "students may not assess submissions".into(),
            ));
        }

        let predecessor = if correction_round == 0 {
            self.store
                .latest_result_of_type(submission_id, AssessmentType::Automatic)
                .await?
        } else {
            self.store
                .manual_result_for_round(submission_id, correction_round - 1)
                .await?
        };

        let mut seed = ResultRecord::automatic(submission_id, now);
        seed.rated = true;
        if let Some(source) = &predecessor {
            seed.feedback = source.feedback.clone();
            seed.score = source.score;
            seed.successful = source.successful;
            seed.copy_counters_from(source);
        }

        let acquisition = self
            .store
            .lock_result_for_round(submission_id, correction_round, actor.user_id, seed)
            .await?;
        Ok(acquisition.result)
    }

    /// Submits the assessment for a locked correction round.
    ///
    /// Only the lock holder may submit; an instructor may take over someone
    /// else's lock. The result becomes completed and rated.
    pub async fn submit_assessment(
        &self,
        submission_id: i64,
        correction_round: u32,
        actor: &Actor,
        assessment: ManualAssessment,
        exercise: &ExerciseSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ResultRecord, AssessmentError> {
        let record = self
            .store
            .manual_result_for_round(submission_id, correction_round)
            .await?
            .ok_or_else(|| {
                AssessmentError::NotFound(format!(
                    "no manual result for submission {submission_id}, round {correction_round}"
                ))
            })?;

        if !record.is_locked() {
            return Err(AssessmentError::LockConflict(
                "assessment already submitted, use an override".into(),
            ));
        }
        if !actor.is_instructor() && record.assessor != Some(actor.user_id) {
            return Err(AssessmentError::LockConflict(format!(
                "correction round {} is locked by assessor {}",
                correction_round,
                record.assessor.unwrap_or_default()
            )));
        }

        self.apply_assessment(record, actor, assessment, exercise, now)
            .await
    }

    /// Overrides an already submitted assessment in place.
    ///
    /// Addressed by result id, because a correction round can hold both the
    /// complained-about result and its response. Instructors may always
    /// override; the original assessor may only do so while the assessment
    /// due date has not passed. The result keeps its identity, so complaint
    /// flags on other results in the chain are never touched.
    pub async fn override_assessment(
        &self,
        result_id: i64,
        actor: &Actor,
        assessment: ManualAssessment,
        exercise: &ExerciseSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ResultRecord, AssessmentError> {
        let record = self.store.result(result_id).await?;

        if !record.is_manual() {
            return Err(AssessmentError::Validation(
                "automatic results are re-evaluated, not overridden".into(),
            ));
        }
        if record.is_locked() {
            return Err(AssessmentError::LockConflict(
                "assessment still in progress, submit it instead".into(),
            ));
        }
        let allowed = actor.is_instructor()
            || (record.assessor == Some(actor.user_id)
                && !exercise.config.assessment_due_date_passed(now));
        if !allowed {
            return Err(AssessmentError::LockConflict(
                "only instructors may override after the assessment due date".into(),
            ));
        }

        self.apply_assessment(record, actor, assessment, exercise, now)
            .await
    }

    /// Flags a completed result as complained-about. The flag is permanent:
    /// nothing in the engine ever clears it again.
    pub async fn file_complaint(
        &self,
        result_id: i64,
        actor: &Actor,
    ) -> Result<ResultRecord, AssessmentError> {
        let mut record = self.store.result(result_id).await?;
        if record.is_locked() {
            return Err(AssessmentError::Validation(
                "cannot complain about an assessment in progress".into(),
            ));
        }
        if record.has_complaint {
            return Err(AssessmentError::Validation(
                "result already has a complaint".into(),
            ));
        }
        if actor.role == Role::Student {
            let submission = self.store.submission(record.submission_id).await?;
            let participation = self.store.participation(submission.participation_id).await?;
            if participation.student_id != Some(actor.user_id) {
                return Err(AssessmentError::LockConflict(
                    "students may only complain about their own results".into(),
                ));
            }
        }

        record.has_complaint = true;
        Ok(self.store.update_result(record).await?)
    }

    /// Accepts a complaint by appending a fresh result with the response
    /// feedback and score.
    ///
    /// The complained-about result keeps `has_complaint = true` permanently;
    /// the response itself starts clean — it is the answer, not a further
    /// grievance.
    pub async fn respond_to_complaint(
        &self,
        complained_result_id: i64,
        actor: &Actor,
        assessment: ManualAssessment,
        exercise: &ExerciseSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ResultRecord, AssessmentError> {
        if !actor.is_staff() {
            return Err(AssessmentError::LockConflict(
                "only staff may respond to complaints".into(),
            ));
        }
        let complained = self.store.result(complained_result_id).await?;
        if !complained.has_complaint {
            return Err(AssessmentError::Validation(
                "result has no complaint to respond to".into(),
            ));
        }

        let outcome = self
            .scored_assessment(&complained, &assessment, exercise, now)
            .await?;

        let mut response = ResultRecord::automatic(complained.submission_id, now);
        response.assessment_type = AssessmentType::SemiAutomatic;
        response.correction_round = complained.correction_round;
        response.assessor = Some(actor.user_id);
        response.rated = true;
        response.has_complaint = false;
        response.apply_outcome(outcome);

        let mut response = self.store.insert_result(response).await?;
        externalize_feedback(&mut response, &self.long_feedback).await;
        Ok(self.store.update_result(response).await?)
    }

    /// Deletes a result. Instructors may delete any result; other staff only
    /// automatic results that a newer result has superseded. The remaining
    /// results keep their relative order.
    pub async fn delete_result(
        &self,
        result_id: i64,
        actor: &Actor,
    ) -> Result<(), AssessmentError> {
        let record = self.store.result(result_id).await?;

        if !actor.is_instructor() {
            if !actor.is_staff() {
                return Err(AssessmentError::LockConflict(
                    "students may not delete results".into(),
                ));
            }
            let latest = self.store.latest_result(record.submission_id).await?;
            let is_latest = latest.map(|r| r.id == record.id).unwrap_or(false);
            if record.assessment_type != AssessmentType::Automatic || is_latest {
                return Err(AssessmentError::LockConflict(
                    "only superseded automatic results may be deleted".into(),
                ));
            }
        }

        self.store.delete_result(result_id).await?;
        self.long_feedback.remove_for_result(result_id).await;
        Ok(())
    }

    /// Reads a result with its feedback filtered for the acting audience.
    pub async fn view_result(
        &self,
        result_id: i64,
        actor: &Actor,
        exercise: &ExerciseSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ResultRecord, AssessmentError> {
        let mut record = self.store.result(result_id).await?;
        let submission = self.store.submission(record.submission_id).await?;
        let participation = self.store.participation(submission.participation_id).await?;

        let due_date_passed = due_date_passed_for(&participation, &exercise.config, now);
        record.feedback = filter_feedback(record.feedback, due_date_passed, actor.audience());
        Ok(record)
    }

    /// Validates the submitted assessment and recomputes its score.
    async fn scored_assessment(
        &self,
        record: &ResultRecord,
        assessment: &ManualAssessment,
        exercise: &ExerciseSnapshot,
        now: DateTime<Utc>,
    ) -> Result<grading::scorer::ScoreOutcome, AssessmentError> {
        let declared = assessment.score.ok_or_else(|| {
            AssessmentError::Validation("manual result submission requires a score".into())
        })?;
        for item in &assessment.feedback {
            item.validate()?;
        }

        let submission = self.store.submission(record.submission_id).await?;
        let participation = self.store.participation(submission.participation_id).await?;
        let include_after_due_date = due_date_passed_for(&participation, &exercise.config, now);

        let outcome = GradingJob::new(
            assessment.feedback.clone(),
            &exercise.test_cases,
            &exercise.config,
        )
        .with_categories(&exercise.categories)
        .including_after_due_date(include_after_due_date)
        .grade()?;

        if (outcome.score - declared).abs() > 1e-9 {
            debug!(
                "declared score {declared} differs from calculated score {} for result {}",
                outcome.score, record.id
            );
        }
        Ok(outcome)
    }

    async fn apply_assessment(
        &self,
        mut record: ResultRecord,
        actor: &Actor,
        assessment: ManualAssessment,
        exercise: &ExerciseSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ResultRecord, AssessmentError> {
        let outcome = self
            .scored_assessment(&record, &assessment, exercise, now)
            .await?;

        record.apply_outcome(outcome);
        record.completion_date = Some(now);
        record.rated = true;
        record.assessor = Some(actor.user_id);

        externalize_feedback(&mut record, &self.long_feedback).await;
        Ok(self.store.update_result(record).await?)
    }
}
