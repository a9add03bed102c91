use std::collections::btree_map::Entry;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use exam_core::model::{AnswerOption, QuestionId, ResponseMap, ResponseState, SessionId};
use exam_core::status::{DerivedStatus, classify};
use storage::repository::{AttemptRepository, StorageError};

use crate::error::SessionError;

/// Await a store call, turning an elapsed `limit` into `StorageError::Timeout`.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, StorageError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(StorageError::Timeout))
}

/// Session-local view of the response states, kept in step with the
/// attempt store.
///
/// Every mutation computes the next state, persists it, and only then adopts
/// it. A failed or timed out write leaves the local map untouched.
pub struct ResponseStore {
    session_id: SessionId,
    attempts: Arc<dyn AttemptRepository>,
    persist_timeout: Duration,
    responses: ResponseMap,
}

impl ResponseStore {
    #[must_use]
    pub fn new(
        session_id: SessionId,
        attempts: Arc<dyn AttemptRepository>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            session_id,
            attempts,
            persist_timeout,
            responses: ResponseMap::new(),
        }
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Create a default state for every question that has none yet.
    ///
    /// States already stored are adopted as they are, so re-running after a
    /// partial pass (or on resume) never overwrites progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PersistenceFailed` if a state cannot be stored;
    /// the states created before the failure are kept.
    pub async fn ensure_initialized(
        &mut self,
        question_ids: &[QuestionId],
        now: DateTime<Utc>,
    ) -> Result<(), SessionError> {
        for &question_id in question_ids {
            if self.responses.contains_key(&question_id) {
                continue;
            }
            let stored = with_timeout(
                self.persist_timeout,
                self.attempts
                    .init_response(self.session_id, &ResponseState::new(question_id, now)),
            )
            .await
            .map_err(|err| self.persistence_failed(question_id, err))?;
            self.responses.insert(question_id, stored);
        }
        tracing::debug!(
            session_id = %self.session_id,
            questions = question_ids.len(),
            "response states initialized"
        );
        Ok(())
    }

    /// Set the selected option.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PersistenceFailed` if the store rejects or times out.
    pub async fn select(
        &mut self,
        question_id: QuestionId,
        option: AnswerOption,
        now: DateTime<Utc>,
    ) -> Result<&ResponseState, SessionError> {
        self.apply(question_id, now, |state| state.with_selection(option, now))
            .await
    }

    /// Flip the marked-for-review flag.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PersistenceFailed` if the store rejects or times out.
    pub async fn toggle_review(
        &mut self,
        question_id: QuestionId,
        now: DateTime<Utc>,
    ) -> Result<&ResponseState, SessionError> {
        self.apply(question_id, now, |state| state.with_review_toggled(now))
            .await
    }

    /// Reset the selection to none. The review flag is kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PersistenceFailed` if the store rejects or times out.
    pub async fn clear(
        &mut self,
        question_id: QuestionId,
        now: DateTime<Utc>,
    ) -> Result<&ResponseState, SessionError> {
        self.apply(question_id, now, |state| state.cleared(now))
            .await
    }

    /// Add `seconds` to the time spent on a question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::PersistenceFailed` if the store rejects or times out.
    pub async fn add_time_spent(
        &mut self,
        question_id: QuestionId,
        seconds: u32,
        now: DateTime<Utc>,
    ) -> Result<&ResponseState, SessionError> {
        self.apply(question_id, now, |state| state.with_time_added(seconds, now))
            .await
    }

    #[must_use]
    pub fn snapshot(&self) -> &ResponseMap {
        &self.responses
    }

    #[must_use]
    pub fn get(&self, question_id: QuestionId) -> Option<&ResponseState> {
        self.responses.get(&question_id)
    }

    #[must_use]
    pub fn status_of(&self, question_id: QuestionId) -> DerivedStatus {
        classify(self.get(question_id))
    }

    async fn apply(
        &mut self,
        question_id: QuestionId,
        now: DateTime<Utc>,
        transition: impl FnOnce(&ResponseState) -> ResponseState,
    ) -> Result<&ResponseState, SessionError> {
        let next = match self.responses.get(&question_id) {
            Some(current) => transition(current),
            None => transition(&ResponseState::new(question_id, now)),
        };

        with_timeout(
            self.persist_timeout,
            self.attempts.upsert_response(self.session_id, &next),
        )
        .await
        .map_err(|err| self.persistence_failed(question_id, err))?;

        tracing::debug!(
            session_id = %self.session_id,
            question_id = %question_id,
            selected = next.selected.map(AnswerOption::as_str),
            marked = next.marked_for_review,
            "response persisted"
        );
        let slot = match self.responses.entry(question_id) {
            Entry::Occupied(mut entry) => {
                entry.insert(next);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(next),
        };
        Ok(slot)
    }

    fn persistence_failed(&self, question_id: QuestionId, err: StorageError) -> SessionError {
        tracing::warn!(
            session_id = %self.session_id,
            question_id = %question_id,
            error = %err,
            "response not persisted"
        );
        SessionError::PersistenceFailed(err)
    }
}
