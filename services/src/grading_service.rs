//! Build-result intake and bulk re-evaluation.
//!
//! This service owns the automatic half of the result lifecycle: a completed
//! build is turned into a scored automatic result (or merged into an open
//! manual one), and configuration changes are rolled out over every
//! participation of an exercise through a bounded worker pool.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use grading::GradingJob;
use grading::exercise::ExerciseConfig;
use grading::feedback::Feedback;
use grading::static_analysis::StaticAnalysisCategory;
use grading::test_case::TestCase;
use log::{info, warn};
use tokio::sync::Mutex;

use store::models::participation::Participation;
use store::models::result::{AssessmentType, ResultRecord};
use store::models::submission::Submission;
use store::{LongFeedbackStore, SubmissionStore};

use crate::error::AssessmentError;
use crate::actor::Actor;
use crate::notify::DuplicateTestNotifier;
use crate::queue::{self, WorkerQueue};

/// The grading-relevant slice of an exercise: its point configuration plus
/// both registries, captured at one moment in time.
#[derive(Debug, Clone)]
pub struct ExerciseSnapshot {
    pub config: ExerciseConfig,
    pub test_cases: Vec<TestCase>,
    pub categories: Vec<StaticAnalysisCategory>,
}

impl ExerciseSnapshot {
    pub fn new(config: ExerciseConfig) -> Self {
        Self {
            config,
            test_cases: Vec::new(),
            categories: Vec::new(),
        }
    }

    pub fn with_test_cases(mut self, test_cases: Vec<TestCase>) -> Self {
        self.test_cases = test_cases;
        self
    }

    pub fn with_categories(mut self, categories: Vec<StaticAnalysisCategory>) -> Self {
        self.categories = categories;
        self
    }

    pub fn exercise_id(&self) -> i64 {
        self.config.exercise_id
    }
}

/// What the build collaborator delivers for one finished build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Opaque commit identity used to find the matching submission.
    pub commit_hash: Option<String>,
    pub feedback: Vec<Feedback>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReEvaluateOptions {
    /// Also re-grade participations whose individual due date has not passed
    /// yet. Off by default so extended-time students are not re-graded
    /// against a configuration change before their window closes.
    pub include_extended_due_dates: bool,
}

#[derive(Debug)]
pub struct ReEvaluationFailure {
    pub participation_id: i64,
    pub error: AssessmentError,
}

/// Outcome of one bulk re-evaluation pass. Failures are collected, never
/// fatal: every other participation still gets its updated results.
#[derive(Debug, Default)]
pub struct ReEvaluationReport {
    pub updated_results: usize,
    pub skipped_participations: usize,
    pub failures: Vec<ReEvaluationFailure>,
}

pub struct GradingService<S> {
    store: Arc<S>,
    long_feedback: Arc<LongFeedbackStore>,
    notifier: Arc<dyn DuplicateTestNotifier>,
    workers: usize,
}

impl<S: SubmissionStore + 'static> GradingService<S> {
    pub fn new(
        store: Arc<S>,
        long_feedback: Arc<LongFeedbackStore>,
        notifier: Arc<dyn DuplicateTestNotifier>,
    ) -> Self {
        Self {
            store,
            long_feedback,
            notifier,
            workers: common::config::Config::get_or_default().reevaluation_workers,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Processes one finished build into a scored result.
    ///
    /// The submission is matched by commit hash; when none matches (delivery
    /// raced the upload), a fallback submission is created so the result is
    /// never dropped. If the submission's latest result is a manual one, the
    /// fresh automatic feedback is merged into it instead of appending a new
    /// result, preserving a tutor's in-progress draft.
    pub async fn process_build_result(
        &self,
        participation_id: i64,
        build: BuildOutcome,
        exercise: &ExerciseSnapshot,
        now: DateTime<Utc>,
    ) -> Result<ResultRecord, AssessmentError> {
        let participation = self.store.participation(participation_id).await?;
        if participation.exercise_id != exercise.exercise_id() {
            return Err(AssessmentError::ConfigurationInconsistency(format!(
                "participation {participation_id} belongs to exercise {}, not {}",
                participation.exercise_id,
                exercise.exercise_id()
            )));
        }

        let submission = self
            .submission_for_build(&participation, &build, now)
            .await?;
        let include_after_due_date = due_date_passed_for(&participation, &exercise.config, now);

        let outcome = GradingJob::new(build.feedback, &exercise.test_cases, &exercise.config)
            .with_categories(&exercise.categories)
            .including_after_due_date(include_after_due_date)
            .grade()?;
        if outcome.duplicates.found() {
            self.notifier
                .notify_duplicate_test_cases(exercise.exercise_id())
                .await;
        }

        let latest = self.store.latest_result(submission.id).await?;
        if let Some(manual) = latest.filter(|r| r.is_manual()) {
            return self
                .merge_into_manual_result(manual, outcome.feedback, exercise, include_after_due_date)
                .await;
        }

        let mut record = ResultRecord::automatic(submission.id, now);
        record.rated = is_rated(&participation, &exercise.config, submission.submitted_at);
        record.apply_outcome(outcome);

        let mut record = self.store.insert_result(record).await?;
        externalize_feedback(&mut record, &self.long_feedback).await;
        let record = self.store.update_result(record).await?;
        Ok(record)
    }

    /// Folds fresh automatic feedback into the submission's open or submitted
    /// manual result: old automatic entries are replaced, tutor entries kept,
    /// the score recomputed over the merged set. A draft (uncompleted) manual
    /// result stays a draft.
    async fn merge_into_manual_result(
        &self,
        mut manual: ResultRecord,
        automatic_feedback: Vec<Feedback>,
        exercise: &ExerciseSnapshot,
        include_after_due_date: bool,
    ) -> Result<ResultRecord, AssessmentError> {
        let mut merged = automatic_feedback;
        merged.extend(
            manual
                .feedback
                .drain(..)
                .filter(|f| !f.is_test() && !f.is_static_analysis()),
        );

        let outcome = GradingJob::new(merged, &exercise.test_cases, &exercise.config)
            .with_categories(&exercise.categories)
            .including_after_due_date(include_after_due_date)
            .grade()?;
        manual.apply_outcome(outcome);

        externalize_feedback(&mut manual, &self.long_feedback).await;
        let manual = self.store.update_result(manual).await?;
        Ok(manual)
    }

    async fn submission_for_build(
        &self,
        participation: &Participation,
        build: &BuildOutcome,
        now: DateTime<Utc>,
    ) -> Result<Submission, AssessmentError> {
        if let Some(hash) = build.commit_hash.as_deref() {
            for submission_id in participation.submission_ids.iter().rev() {
                let submission = self.store.submission(*submission_id).await?;
                if submission.commit_hash.as_deref() == Some(hash) {
                    return Ok(submission);
                }
            }
        }

        warn!(
            "no pending submission for participation {} and commit {:?}, creating a fallback",
            participation.id, build.commit_hash
        );
        Ok(self
            .store
            .create_submission(participation.id, build.commit_hash.clone(), now)
            .await?)
    }

    /// Re-scores the latest automatic and latest manual result of every
    /// participation of the exercise with the current configuration.
    ///
    /// Work runs participation-by-participation on a bounded worker pool;
    /// each participation's writes stand alone, so one failure is recorded
    /// and the batch continues. Re-running the pass over unchanged inputs
    /// reproduces the same scores.
    pub async fn re_evaluate_exercise(
        &self,
        exercise: &ExerciseSnapshot,
        actor: &Actor,
        options: ReEvaluateOptions,
        now: DateTime<Utc>,
    ) -> Result<ReEvaluationReport, AssessmentError> {
        let participations = self
            .store
            .participations_of_exercise(exercise.exercise_id())
            .await;

        let mut report = ReEvaluationReport::default();
        let queue = Arc::new(Mutex::new(WorkerQueue::new(self.workers)));
        let snapshot = Arc::new(exercise.clone());
        let mut handles = Vec::new();

        for participation in participations {
            if !options.include_extended_due_dates
                && participation.is_student()
                && participation
                    .individual_due_date
                    .map(|date| date > now)
                    .unwrap_or(false)
            {
                report.skipped_participations += 1;
                continue;
            }

            let store = self.store.clone();
            let long_feedback = self.long_feedback.clone();
            let snapshot = snapshot.clone();
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                queue::acquire(&queue).await;
                let outcome = re_evaluate_participation(
                    store.as_ref(),
                    &long_feedback,
                    &snapshot,
                    &participation,
                    now,
                )
                .await;
                queue::release(&queue).await;
                (participation.id, outcome)
            }));
        }

        let mut duplicates_found = false;
        for handle in handles {
            let (participation_id, outcome) = handle
                .await
                .map_err(|e| AssessmentError::Validation(format!("worker panicked: {e}")))?;
            match outcome {
                Ok((updated, duplicates)) => {
                    report.updated_results += updated;
                    duplicates_found |= duplicates;
                }
                Err(error) => {
                    warn!("re-evaluation of participation {participation_id} failed: {error}");
                    report.failures.push(ReEvaluationFailure {
                        participation_id,
                        error,
                    });
                }
            }
        }

        if duplicates_found {
            self.notifier
                .notify_duplicate_test_cases(exercise.exercise_id())
                .await;
        }

        info!(
            "user {} triggered a re-evaluation of {} results for exercise {} ({} skipped, {} failed)",
            actor.user_id,
            report.updated_results,
            exercise.exercise_id(),
            report.skipped_participations,
            report.failures.len()
        );

        Ok(report)
    }
}

/// Re-scores one participation's latest automatic and latest manual result.
/// Returns the number of updated results and whether duplicates were seen.
async fn re_evaluate_participation<S: SubmissionStore>(
    store: &S,
    long_feedback: &LongFeedbackStore,
    exercise: &ExerciseSnapshot,
    participation: &Participation,
    now: DateTime<Utc>,
) -> Result<(usize, bool), AssessmentError> {
    let Some(submission) = store.latest_submission(participation.id).await? else {
        return Ok((0, false));
    };
    let include_after_due_date = due_date_passed_for(participation, &exercise.config, now);

    let mut updated = 0;
    let mut duplicates_found = false;
    for assessment_type in [AssessmentType::Automatic, AssessmentType::SemiAutomatic] {
        let Some(mut record) = store
            .latest_result_of_type(submission.id, assessment_type)
            .await?
        else {
            continue;
        };

        let outcome = GradingJob::new(
            record.feedback.clone(),
            &exercise.test_cases,
            &exercise.config,
        )
        .with_categories(&exercise.categories)
        .including_after_due_date(include_after_due_date)
        .grade()?;
        duplicates_found |= outcome.duplicates.found();

        record.apply_outcome(outcome);
        externalize_feedback(&mut record, long_feedback).await;
        store.update_result(record).await?;
        updated += 1;
    }

    Ok((updated, duplicates_found))
}

/// Whether `AfterDueDate` test cases count for this participation right now.
/// Non-student participations (template/solution) always include everything.
pub(crate) fn due_date_passed_for(
    participation: &Participation,
    config: &ExerciseConfig,
    now: DateTime<Utc>,
) -> bool {
    if !participation.is_student() {
        return true;
    }
    match participation.individual_due_date {
        Some(date) => date <= now,
        None => config.due_date_passed(now),
    }
}

/// A result counts towards the grade when its submission arrived in time.
fn is_rated(
    participation: &Participation,
    config: &ExerciseConfig,
    submitted_at: DateTime<Utc>,
) -> bool {
    if !participation.is_student() {
        return true;
    }
    match participation.individual_due_date.or(config.due_date) {
        Some(due) => submitted_at <= due,
        None => true,
    }
}

/// Moves over-long detail texts into the side store. The record must already
/// have its final id.
pub(crate) async fn externalize_feedback(
    record: &mut ResultRecord,
    long_feedback: &LongFeedbackStore,
) {
    long_feedback.remove_for_result(record.id).await;
    for (index, item) in record.feedback.iter_mut().enumerate() {
        if let Some(body) = item.externalize_long_detail() {
            long_feedback.put(record.id, index, body).await;
        }
    }
}
