use std::sync::{Arc, Weak};
use std::time::Duration;

use exam_core::model::{ExamAttempt, SessionId, Submission, TestId};
use exam_core::time::{Countdown, DEFAULT_LOW_TIME_SECS, elapsed_seconds};
use storage::repository::{AttemptRepository, CatalogRepository, NewAttemptRecord};
use tokio::sync::{Mutex, MutexGuard};

use super::loader::QuestionSetLoader;
use super::responses::with_timeout;
use super::service::ExamSession;
use crate::Clock;
use crate::config::ExamConfig;
use crate::error::SessionError;
use crate::timer::ExamTimer;

/// A running session shared between the candidate's actions and its timer.
#[derive(Clone)]
pub struct ActiveExam {
    id: SessionId,
    session: Arc<Mutex<ExamSession>>,
}

impl ActiveExam {
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Wait for exclusive access to the session.
    pub async fn lock(&self) -> MutexGuard<'_, ExamSession> {
        self.session.lock().await
    }

    #[must_use]
    pub fn handle(&self) -> Arc<Mutex<ExamSession>> {
        Arc::clone(&self.session)
    }
}

impl std::fmt::Debug for ActiveExam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveExam").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Orchestrates session start, resume and submission retry.
#[derive(Clone)]
pub struct ExamLoopService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn AttemptRepository>,
    loader: QuestionSetLoader,
    persist_timeout: Duration,
    low_time_threshold: u64,
}

impl ExamLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        let defaults = ExamConfig::default();
        Self {
            clock,
            loader: QuestionSetLoader::new(Arc::clone(&catalog)),
            catalog,
            attempts,
            persist_timeout: defaults.persist_timeout,
            low_time_threshold: DEFAULT_LOW_TIME_SECS,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: &ExamConfig) -> Self {
        self.persist_timeout = config.persist_timeout;
        self.low_time_threshold = config.low_time_threshold_secs;
        self
    }

    #[must_use]
    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    /// Start a new attempt at `test_id` and its countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` for an unknown test,
    /// `SessionError::DataUnavailable` if the catalog cannot be read,
    /// `SessionError::PersistenceFailed` if the attempt cannot be created, and
    /// `SessionError::StartInterrupted` if it was created but not fully
    /// initialized; pass its `session_id` to
    /// [`ExamLoopService::resume_session`] to finish.
    pub async fn start_session(&self, test_id: TestId) -> Result<ActiveExam, SessionError> {
        let test = self
            .catalog
            .get_test(test_id)
            .await
            .map_err(SessionError::from_read)?;
        let questions = self.loader.load(test.quotas()).await?;

        let started_at = self.clock.now();
        let session_id = with_timeout(
            self.persist_timeout,
            self.attempts.create_attempt(NewAttemptRecord {
                test_id,
                started_at,
            }),
        )
        .await
        .map_err(|err| {
            tracing::warn!(test_id = %test_id, error = %err, "attempt not created");
            SessionError::PersistenceFailed(err)
        })?;

        let budget = test.duration_seconds();
        let mut session = ExamSession::new(
            ExamAttempt::new(session_id, test_id, started_at),
            test,
            questions,
            Arc::clone(&self.attempts),
            self.clock.clone(),
            self.persist_timeout,
        );
        session.begin().await.map_err(|err| match err {
            SessionError::PersistenceFailed(source) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %source,
                    "attempt created but not initialized"
                );
                SessionError::StartInterrupted { session_id, source }
            }
            other => other,
        })?;
        tracing::info!(session_id = %session_id, budget_secs = budget, "exam session started");

        Ok(self.activate(session, budget).await)
    }

    /// Reopen an unsubmitted attempt with whatever time it has left.
    ///
    /// Persisted answers are restored; questions without a stored state get
    /// a default one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SessionAlreadySubmitted` for a submitted
    /// attempt, `SessionError::NotFound` for an unknown one, and the errors of
    /// [`ExamLoopService::start_session`] otherwise.
    pub async fn resume_session(&self, session_id: SessionId) -> Result<ActiveExam, SessionError> {
        let attempt = self
            .attempts
            .get_attempt(session_id)
            .await
            .map_err(SessionError::from_read)?;
        if attempt.is_submitted() {
            return Err(SessionError::SessionAlreadySubmitted);
        }

        let test = self
            .catalog
            .get_test(attempt.test_id())
            .await
            .map_err(SessionError::from_read)?;
        let questions = self.loader.load(test.quotas()).await?;

        let elapsed = elapsed_seconds(attempt.started_at(), self.clock.now());
        let remaining = test.duration_seconds().saturating_sub(elapsed);
        let mut session = ExamSession::new(
            attempt,
            test,
            questions,
            Arc::clone(&self.attempts),
            self.clock.clone(),
            self.persist_timeout,
        );
        session.begin().await?;
        tracing::info!(session_id = %session_id, remaining_secs = remaining, "exam session resumed");

        Ok(self.activate(session, remaining).await)
    }

    /// Retry storing the submission of `exam`.
    ///
    /// # Errors
    ///
    /// See [`ExamSession::finalize_submission`].
    pub async fn finalize_submission(&self, exam: &ActiveExam) -> Result<Submission, SessionError> {
        exam.lock().await.finalize_submission().await
    }

    async fn activate(&self, session: ExamSession, budget_secs: u64) -> ActiveExam {
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        let weak = Arc::downgrade(&shared);

        let countdown = Countdown::new(budget_secs).with_low_time_threshold(self.low_time_threshold);
        let mut guard = shared.lock().await;
        guard.attach_timer(ExamTimer::start(countdown, move || {
            tokio::spawn(expire_session(weak));
        }));
        drop(guard);

        ActiveExam {
            id,
            session: shared,
        }
    }
}

async fn expire_session(session: Weak<Mutex<ExamSession>>) {
    let Some(session) = session.upgrade() else {
        return;
    };
    let mut guard = session.lock().await;
    let id = guard.id();
    match guard.expire().await {
        Ok(submission) => {
            tracing::info!(
                session_id = %id,
                score = submission.score.total,
                "exam submitted on expiry"
            );
        }
        Err(SessionError::SessionAlreadySubmitted) => {
            tracing::debug!(session_id = %id, "expiry after submission ignored");
        }
        Err(SessionError::PersistenceFailed(err)) => {
            tracing::warn!(
                session_id = %id,
                error = %err,
                "expired submission awaits finalization"
            );
        }
        Err(err) => {
            tracing::warn!(session_id = %id, error = %err, "expiry failed");
        }
    }
}
