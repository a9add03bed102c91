use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{
    ExamAttempt, Question, QuestionId, ResponseState, SessionId, Subject, Submission,
    TestDefinition, TestId,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Data needed to open a new attempt; the store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttemptRecord {
    pub test_id: TestId,
    pub started_at: DateTime<Utc>,
}

/// Read side of the question bank and test definitions.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist or update a test definition.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the test cannot be stored.
    async fn upsert_test(&self, test: &TestDefinition) -> Result<(), StorageError>;

    /// Fetch a test by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_test(&self, id: TestId) -> Result<TestDefinition, StorageError>;

    /// All tests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_tests(&self) -> Result<Vec<TestDefinition>, StorageError>;

    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Up to `limit` questions of a subject, in stable catalog order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn questions_by_subject(
        &self,
        subject: Subject,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError>;

    /// Fetch questions by ID, in the order requested.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any are missing, or other storage errors.
    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError>;
}

/// Persistence for attempts and their per-question response states.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Open a new attempt and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn create_attempt(&self, attempt: NewAttemptRecord) -> Result<SessionId, StorageError>;

    /// Fetch an attempt by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: SessionId) -> Result<ExamAttempt, StorageError>;

    /// All response states recorded for an attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the responses cannot be read.
    async fn list_responses(&self, session_id: SessionId)
    -> Result<Vec<ResponseState>, StorageError>;

    /// Insert `state` unless a state already exists for its question, then
    /// return whichever state is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the attempt is unknown, or other storage errors.
    async fn init_response(
        &self,
        session_id: SessionId,
        state: &ResponseState,
    ) -> Result<ResponseState, StorageError>;

    /// Insert or overwrite the state for `state.question_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the attempt is unknown, or other storage errors.
    async fn upsert_response(
        &self,
        session_id: SessionId,
        state: &ResponseState,
    ) -> Result<(), StorageError>;

    /// Write the final score, counts and submit timestamp.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the attempt is already submitted,
    /// `StorageError::NotFound` if it does not exist, or other storage errors.
    async fn submit_attempt(
        &self,
        id: SessionId,
        submission: &Submission,
    ) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tests: Arc<Mutex<BTreeMap<TestId, TestDefinition>>>,
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    attempts: Arc<Mutex<BTreeMap<SessionId, ExamAttempt>>>,
    responses: Arc<Mutex<BTreeMap<(SessionId, QuestionId), ResponseState>>>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_attempt(&self, id: SessionId) -> Result<(), StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        if guard.contains_key(&id) {
            Ok(())
        } else {
            Err(StorageError::NotFound)
        }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_test(&self, test: &TestDefinition) -> Result<(), StorageError> {
        let mut guard = self.tests.lock().map_err(poisoned)?;
        guard.insert(test.id(), test.clone());
        Ok(())
    }

    async fn get_test(&self, id: TestId) -> Result<TestDefinition, StorageError> {
        let guard = self.tests.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_tests(&self) -> Result<Vec<TestDefinition>, StorageError> {
        let guard = self.tests.lock().map_err(poisoned)?;
        let mut tests: Vec<TestDefinition> = guard.values().cloned().collect();
        tests.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(tests)
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(poisoned)?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn questions_by_subject(
        &self,
        subject: Subject,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard
            .values()
            .filter(|q| q.subject() == subject)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(poisoned)?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match guard.get(id) {
                Some(question) => found.push(question.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn create_attempt(&self, attempt: NewAttemptRecord) -> Result<SessionId, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let next = guard.keys().next_back().map_or(1, |id| id.value() + 1);
        let id = SessionId::new(next);
        guard.insert(id, ExamAttempt::new(id, attempt.test_id, attempt.started_at));
        Ok(id)
    }

    async fn get_attempt(&self, id: SessionId) -> Result<ExamAttempt, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_responses(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ResponseState>, StorageError> {
        let guard = self.responses.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|((sid, _), _)| *sid == session_id)
            .map(|(_, state)| state.clone())
            .collect())
    }

    async fn init_response(
        &self,
        session_id: SessionId,
        state: &ResponseState,
    ) -> Result<ResponseState, StorageError> {
        self.ensure_attempt(session_id)?;
        let mut guard = self.responses.lock().map_err(poisoned)?;
        let stored = guard
            .entry((session_id, state.question_id))
            .or_insert_with(|| state.clone());
        Ok(stored.clone())
    }

    async fn upsert_response(
        &self,
        session_id: SessionId,
        state: &ResponseState,
    ) -> Result<(), StorageError> {
        self.ensure_attempt(session_id)?;
        let mut guard = self.responses.lock().map_err(poisoned)?;
        guard.insert((session_id, state.question_id), state.clone());
        Ok(())
    }

    async fn submit_attempt(
        &self,
        id: SessionId,
        submission: &Submission,
    ) -> Result<(), StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let attempt = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        if attempt.is_submitted() {
            return Err(StorageError::Conflict);
        }
        attempt
            .record_submission(submission.clone())
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Aggregates catalog and attempt repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self { catalog, attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::{
        AnswerOption, Difficulty, QuestionDraft, SubjectQuotas, SubmitTrigger,
    };
    use exam_core::scoring::Score;
    use exam_core::time::fixed_now;

    fn build_question(id: u64, subject: Subject) -> Question {
        QuestionDraft {
            subject,
            topic: "General".into(),
            text: format!("Q{id}"),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct: AnswerOption::A,
            marks: 4,
            negative_marks: -1,
            difficulty: Difficulty::Easy,
        }
        .validate(QuestionId::new(id), fixed_now())
        .unwrap()
    }

    fn build_test(id: u64, created_offset_days: i64) -> TestDefinition {
        TestDefinition::new(
            TestId::new(id),
            format!("Mock {id}"),
            None,
            60,
            SubjectQuotas::uniform(1),
            fixed_now() + Duration::days(created_offset_days),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn lists_tests_newest_first() {
        let repo = InMemoryRepository::new();
        repo.upsert_test(&build_test(1, 0)).await.unwrap();
        repo.upsert_test(&build_test(2, 2)).await.unwrap();
        repo.upsert_test(&build_test(3, 1)).await.unwrap();

        let ids: Vec<u64> = repo
            .list_tests()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id().value())
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn questions_by_subject_respects_limit_and_order() {
        let repo = InMemoryRepository::new();
        for (id, subject) in [
            (3, Subject::Physics),
            (1, Subject::Physics),
            (2, Subject::Chemistry),
            (4, Subject::Physics),
        ] {
            repo.upsert_question(&build_question(id, subject))
                .await
                .unwrap();
        }

        let physics = repo
            .questions_by_subject(Subject::Physics, 2)
            .await
            .unwrap();
        let ids: Vec<u64> = physics.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn init_response_keeps_existing_state() {
        let repo = InMemoryRepository::new();
        let session = repo
            .create_attempt(NewAttemptRecord {
                test_id: TestId::new(1),
                started_at: fixed_now(),
            })
            .await
            .unwrap();
        let qid = QuestionId::new(5);
        let answered =
            ResponseState::new(qid, fixed_now()).with_selection(AnswerOption::B, fixed_now());
        repo.upsert_response(session, &answered).await.unwrap();

        let stored = repo
            .init_response(session, &ResponseState::new(qid, fixed_now()))
            .await
            .unwrap();
        assert_eq!(stored, answered);
        assert_eq!(repo.list_responses(session).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_submission_conflicts() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let session = repo
            .create_attempt(NewAttemptRecord {
                test_id: TestId::new(1),
                started_at: now,
            })
            .await
            .unwrap();
        let submission = Submission::new(now, now, Score::default(), SubmitTrigger::Manual);
        repo.submit_attempt(session, &submission).await.unwrap();

        let err = repo.submit_attempt(session, &submission).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn responses_require_a_known_attempt() {
        let repo = InMemoryRepository::new();
        let state = ResponseState::new(QuestionId::new(1), fixed_now());
        let err = repo
            .upsert_response(SessionId::new(99), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }
}
