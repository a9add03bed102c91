use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use exam_core::model::{
    AnswerOption, ExamAttempt, Question, QuestionId, ResponseMap, SessionId, Subject,
    SubmitTrigger, Submission, TestDefinition,
};
use exam_core::question_set::QuestionSet;
use exam_core::scoring;
use exam_core::status::{DerivedStatus, StatusCounts, classify};
use exam_core::time::elapsed_seconds;
use storage::repository::{AttemptRepository, StorageError};
use tokio::sync::watch;

use super::navigation::Navigator;
use super::progress::SubmitPreview;
use super::responses::{ResponseStore, with_timeout};
use crate::Clock;
use crate::error::SessionError;
use crate::timer::ExamTimer;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a session. There is no way back from `Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    InProgress,
    Submitted,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One candidate's timed attempt, from loading through submission.
///
/// Owns the question sequence, the session-local response view, the
/// navigation cursor and the countdown. All candidate actions go through
/// `&mut self`; share it behind an async mutex so that manual submission and
/// timer expiry serialize on the phase check.
pub struct ExamSession {
    attempt: ExamAttempt,
    test: TestDefinition,
    clock: Clock,
    questions: QuestionSet,
    responses: ResponseStore,
    navigator: Navigator,
    phase: SessionPhase,
    attempts: Arc<dyn AttemptRepository>,
    persist_timeout: Duration,
    arrived_at: Option<DateTime<Utc>>,
    pending_time: BTreeMap<QuestionId, u32>,
    submission_persisted: bool,
    timer: Option<ExamTimer>,
}

impl ExamSession {
    /// Create a session in the `Loading` phase. Call [`ExamSession::begin`]
    /// before issuing candidate actions.
    #[must_use]
    pub fn new(
        attempt: ExamAttempt,
        test: TestDefinition,
        questions: QuestionSet,
        attempts: Arc<dyn AttemptRepository>,
        clock: Clock,
        persist_timeout: Duration,
    ) -> Self {
        let responses = ResponseStore::new(attempt.id(), Arc::clone(&attempts), persist_timeout);
        let navigator = Navigator::new(questions.len());
        Self {
            attempt,
            test,
            clock,
            questions,
            responses,
            navigator,
            phase: SessionPhase::Loading,
            attempts,
            persist_timeout,
            arrived_at: None,
            pending_time: BTreeMap::new(),
            submission_persisted: false,
            timer: None,
        }
    }

    /// Initialize a response state for every question and enter `InProgress`.
    ///
    /// Safe to call again after a failure; states already stored are kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PersistenceFailed` if initialization cannot be
    /// stored (the session stays `Loading`), or
    /// `SessionError::SessionAlreadySubmitted` after submission.
    pub async fn begin(&mut self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::InProgress => return Ok(()),
            SessionPhase::Submitted => return Err(SessionError::SessionAlreadySubmitted),
            SessionPhase::Loading => {}
        }

        let now = self.clock.now();
        let ids = self.questions.ids();
        self.responses.ensure_initialized(&ids, now).await?;

        self.phase = SessionPhase::InProgress;
        self.arrived_at = Some(now);
        tracing::info!(
            session_id = %self.id(),
            test_id = %self.test.id(),
            questions = ids.len(),
            "exam session in progress"
        );
        Ok(())
    }

    /// Hand the running countdown to the session. A timer attached after
    /// submission is stopped at once.
    pub fn attach_timer(&mut self, timer: ExamTimer) {
        if self.phase == SessionPhase::Submitted {
            timer.stop();
        }
        self.timer = Some(timer);
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.attempt.id()
    }

    #[must_use]
    pub fn test(&self) -> &TestDefinition {
        &self.test
    }

    #[must_use]
    pub fn attempt(&self) -> &ExamAttempt {
        &self.attempt
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.attempt.started_at()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.phase == SessionPhase::Submitted
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    #[must_use]
    pub fn responses(&self) -> &ResponseMap {
        self.responses.snapshot()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.navigator.current()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.navigator.current())
    }

    /// Subject of the question under the cursor.
    #[must_use]
    pub fn current_subject(&self) -> Option<Subject> {
        self.questions.subject_at(self.navigator.current())
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.navigator.is_first()
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.navigator.is_last()
    }

    #[must_use]
    pub fn status_of(&self, index: usize) -> Option<DerivedStatus> {
        self.questions
            .get(index)
            .map(|q| classify(self.responses.get(q.id())))
    }

    /// Navigator statuses in sequence order.
    #[must_use]
    pub fn statuses(&self) -> Vec<DerivedStatus> {
        self.questions
            .iter()
            .map(|q| classify(self.responses.get(q.id())))
            .collect()
    }

    #[must_use]
    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::tally(self.questions.questions(), self.responses.snapshot())
    }

    /// Seconds left on the countdown, or derived from the clock when no timer
    /// is attached.
    #[must_use]
    pub fn remaining_seconds(&self) -> u64 {
        if let Some(timer) = &self.timer {
            return timer.remaining_seconds();
        }
        let elapsed = match self.submission() {
            Some(submission) => submission.time_taken_seconds,
            None => elapsed_seconds(self.started_at(), self.clock.now()),
        };
        self.test.duration_seconds().saturating_sub(elapsed)
    }

    #[must_use]
    pub fn is_low_time(&self) -> bool {
        self.timer.as_ref().is_some_and(ExamTimer::is_low_time)
    }

    #[must_use]
    pub fn subscribe_remaining(&self) -> Option<watch::Receiver<u64>> {
        self.timer.as_ref().map(ExamTimer::subscribe)
    }

    /// Seconds on a question still waiting to be flushed to the store.
    #[must_use]
    pub fn pending_time(&self, question_id: QuestionId) -> u32 {
        self.pending_time.get(&question_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn submission(&self) -> Option<&Submission> {
        self.attempt.submission()
    }

    /// Whether the attempt store holds the submission and every second of
    /// time spent.
    #[must_use]
    pub fn is_submission_persisted(&self) -> bool {
        self.submission_persisted && self.pending_time.is_empty()
    }

    // ─── Answering ───────────────────────────────────────────────────────────

    /// Select `option` on the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PersistenceFailed` if the change is not stored
    /// (nothing changes locally), or a phase error outside `InProgress`.
    pub async fn select_answer(
        &mut self,
        option: AnswerOption,
    ) -> Result<DerivedStatus, SessionError> {
        let question_id = self.current_question_id()?;
        let now = self.clock.now();
        let state = self.responses.select(question_id, option, now).await?;
        Ok(classify(Some(state)))
    }

    /// Flip the review flag on the current question.
    ///
    /// # Errors
    ///
    /// Same as [`ExamSession::select_answer`].
    pub async fn toggle_review(&mut self) -> Result<DerivedStatus, SessionError> {
        let question_id = self.current_question_id()?;
        let now = self.clock.now();
        let state = self.responses.toggle_review(question_id, now).await?;
        Ok(classify(Some(state)))
    }

    /// Clear the selection on the current question.
    ///
    /// # Errors
    ///
    /// Same as [`ExamSession::select_answer`].
    pub async fn clear_response(&mut self) -> Result<DerivedStatus, SessionError> {
        let question_id = self.current_question_id()?;
        let now = self.clock.now();
        let state = self.responses.clear(question_id, now).await?;
        Ok(classify(Some(state)))
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Loading => Err(SessionError::NotStarted),
            SessionPhase::InProgress => Ok(()),
            SessionPhase::Submitted => Err(SessionError::SessionAlreadySubmitted),
        }
    }

    fn current_question_id(&self) -> Result<QuestionId, SessionError> {
        self.ensure_in_progress()?;
        let index = self.navigator.current();
        self.questions
            .get(index)
            .map(Question::id)
            .ok_or(SessionError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            })
    }

    // ─── Navigation ──────────────────────────────────────────────────────────

    /// Move to the next question. A no-op on the last one.
    ///
    /// # Errors
    ///
    /// Returns a phase error outside `InProgress`.
    pub async fn next(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        let target = self.navigator.peek_next();
        self.move_to(target).await
    }

    /// Move to the previous question. A no-op on the first one.
    ///
    /// # Errors
    ///
    /// Returns a phase error outside `InProgress`.
    pub async fn previous(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        let target = self.navigator.peek_previous();
        self.move_to(target).await
    }

    /// Jump to `index`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::IndexOutOfRange` outside the sequence, or a
    /// phase error outside `InProgress`.
    pub async fn go_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        self.navigator.check(index)?;
        self.move_to(index).await
    }

    /// Jump to the first question of `subject`. Returns `None` when the
    /// subject has no questions in this session.
    ///
    /// # Errors
    ///
    /// Returns a phase error outside `InProgress`.
    pub async fn go_to_subject(
        &mut self,
        subject: Subject,
    ) -> Result<Option<usize>, SessionError> {
        self.ensure_in_progress()?;
        match self.questions.first_index_of(subject) {
            Some(index) => self.move_to(index).await.map(Some),
            None => Ok(None),
        }
    }

    async fn move_to(&mut self, target: usize) -> Result<usize, SessionError> {
        if target == self.navigator.current() {
            return Ok(target);
        }
        self.navigator.check(target)?;
        self.flush_time().await;
        self.navigator.go_to(target)?;
        self.arrived_at = Some(self.clock.now());
        tracing::debug!(
            session_id = %self.id(),
            index = target,
            subject = self.current_subject().map(Subject::as_str),
            "navigated"
        );
        Ok(target)
    }

    /// Add the time since arrival on the current question to its pending
    /// seconds, then try to store everything pending. Failures stay pending.
    async fn flush_time(&mut self) {
        let now = self.record_elapsed();
        if let Err(err) = self.flush_pending(now).await {
            tracing::debug!(session_id = %self.id(), error = %err, "time spent kept pending");
        }
    }

    fn record_elapsed(&mut self) -> DateTime<Utc> {
        let now = self.clock.now();
        let current = self.current_question().map(Question::id);
        if let (Some(arrived_at), Some(question_id)) = (self.arrived_at, current) {
            let seconds = u32::try_from(elapsed_seconds(arrived_at, now)).unwrap_or(u32::MAX);
            if seconds > 0 {
                let slot = self.pending_time.entry(question_id).or_insert(0);
                *slot = slot.saturating_add(seconds);
            }
        }
        self.arrived_at = Some(now);
        now
    }

    /// Store every pending entry. Returns the last failure; failed entries
    /// stay pending.
    async fn flush_pending(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        let pending = std::mem::take(&mut self.pending_time);
        let mut outcome = Ok(());
        for (question_id, seconds) in pending {
            if let Err(err) = self.responses.add_time_spent(question_id, seconds, now).await {
                self.pending_time.insert(question_id, seconds);
                outcome = Err(err);
            }
        }
        outcome
    }

    // ─── Submission ──────────────────────────────────────────────────────────

    /// Counts and remaining time for a confirmation step. Changes nothing.
    ///
    /// # Errors
    ///
    /// Returns a phase error outside `InProgress`.
    pub fn request_submit(&self) -> Result<SubmitPreview, SessionError> {
        self.ensure_in_progress()?;
        Ok(SubmitPreview {
            counts: self.status_counts(),
            total_questions: u32::try_from(self.questions.len()).unwrap_or(u32::MAX),
            remaining_seconds: self.remaining_seconds(),
        })
    }

    /// Submit on the candidate's confirmation.
    ///
    /// # Errors
    ///
    /// See [`ExamSession::expire`].
    pub async fn confirm_submit(&mut self) -> Result<Submission, SessionError> {
        self.submit(SubmitTrigger::Manual).await
    }

    /// Submit because the time budget ran out.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionAlreadySubmitted` if a submission already
    /// happened, `SessionError::NotStarted` while loading, and
    /// `SessionError::PersistenceFailed` if the result or the remaining time
    /// spent could not be stored. In the last case the session is still
    /// submitted locally; retry with [`ExamSession::finalize_submission`].
    pub async fn expire(&mut self) -> Result<Submission, SessionError> {
        self.submit(SubmitTrigger::Expired).await
    }

    async fn submit(&mut self, trigger: SubmitTrigger) -> Result<Submission, SessionError> {
        self.ensure_in_progress()?;
        self.phase = SessionPhase::Submitted;
        if let Some(timer) = &self.timer {
            timer.stop();
        }
        let now = self.record_elapsed().max(self.started_at());
        let score = scoring::score(self.questions.questions(), self.responses.snapshot());
        let submission = Submission::new(self.started_at(), now, score, trigger);
        self.attempt.record_submission(submission)?;
        tracing::info!(
            session_id = %self.id(),
            trigger = trigger.as_str(),
            score = score.total,
            correct = score.correct,
            incorrect = score.incorrect,
            unanswered = score.unanswered,
            "exam submitted"
        );

        self.persist_submission().await
    }

    /// Retry storing a submission, and any time spent still pending, after a
    /// failed write. Returns the same result every time; the score is never
    /// recomputed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotSubmitted` before submission,
    /// `SessionError::NotStarted` while loading, or
    /// `SessionError::PersistenceFailed` if the store still rejects it.
    pub async fn finalize_submission(&mut self) -> Result<Submission, SessionError> {
        match self.phase {
            SessionPhase::Loading => Err(SessionError::NotStarted),
            SessionPhase::InProgress => Err(SessionError::NotSubmitted),
            SessionPhase::Submitted => self.persist_submission().await,
        }
    }

    async fn persist_submission(&mut self) -> Result<Submission, SessionError> {
        let submission = self
            .attempt
            .submission()
            .cloned()
            .ok_or(SessionError::NotSubmitted)?;

        if !self.submission_persisted {
            let stored = with_timeout(
                self.persist_timeout,
                self.attempts.submit_attempt(self.id(), &submission),
            )
            .await;
            match stored {
                Ok(()) => {
                    self.submission_persisted = true;
                    tracing::info!(session_id = %self.id(), "submission persisted");
                }
                Err(StorageError::Conflict) => {
                    self.submission_persisted = true;
                    tracing::warn!(session_id = %self.id(), "submission was already recorded");
                }
                Err(err) => {
                    tracing::warn!(
                        session_id = %self.id(),
                        error = %err,
                        "submission not persisted"
                    );
                    return Err(SessionError::PersistenceFailed(err));
                }
            }
        }

        if !self.pending_time.is_empty() {
            let now = self.clock.now();
            self.flush_pending(now).await.inspect_err(|err| {
                tracing::warn!(
                    session_id = %self.id(),
                    error = %err,
                    questions = self.pending_time.len(),
                    "time spent not persisted after submission"
                );
            })?;
        }
        Ok(submission)
    }
}

impl std::fmt::Debug for ExamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExamSession")
            .field("id", &self.id())
            .field("test_id", &self.test.id())
            .field("phase", &self.phase)
            .field("index", &self.navigator.current())
            .field("questions", &self.questions.len())
            .finish_non_exhaustive()
    }
}
