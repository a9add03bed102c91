#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use exam_core::model::{
    AnswerOption, Difficulty, ExamAttempt, Question, QuestionDraft, QuestionId, ResponseState,
    SessionId, Subject, SubjectQuotas, Submission, TestDefinition, TestId,
};
use exam_core::time::fixed_now;
use services::{Clock, ExamLoopService};
use storage::repository::{
    AttemptRepository, CatalogRepository, InMemoryRepository, NewAttemptRecord, StorageError,
};

pub fn test_id() -> TestId {
    TestId::new(1)
}

pub fn question(id: u64, subject: Subject) -> Question {
    QuestionDraft {
        subject,
        topic: "General".into(),
        text: format!("Question {id}"),
        options: ["one".into(), "two".into(), "three".into(), "four".into()],
        correct: AnswerOption::A,
        marks: 4,
        negative_marks: -1,
        difficulty: Difficulty::Medium,
    }
    .validate(QuestionId::new(id), fixed_now())
    .unwrap()
}

/// One question per subject (ids 1, 2, 3) under a test of `duration_minutes`.
pub async fn seed_catalog(repo: &InMemoryRepository, duration_minutes: u32) {
    let test = TestDefinition::new(
        test_id(),
        "Mock",
        None,
        duration_minutes,
        SubjectQuotas::uniform(1),
        fixed_now(),
    )
    .unwrap();
    repo.upsert_test(&test).await.unwrap();
    for (id, subject) in [
        (1, Subject::Physics),
        (2, Subject::Chemistry),
        (3, Subject::Mathematics),
    ] {
        repo.upsert_question(&question(id, subject)).await.unwrap();
    }
}

/// Attempt store wrapper with switchable failures and a submit counter.
#[derive(Clone, Default)]
pub struct FlakyAttempts {
    pub inner: InMemoryRepository,
    fail_writes: Arc<AtomicBool>,
    hang_writes: Arc<AtomicBool>,
    fail_submit: Arc<AtomicBool>,
    submit_calls: Arc<AtomicUsize>,
    init_calls: Arc<AtomicUsize>,
    init_limit: Arc<AtomicUsize>,
}

impl FlakyAttempts {
    pub fn new(inner: InMemoryRepository) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    pub fn hang_writes(&self, on: bool) {
        self.hang_writes.store(on, Ordering::SeqCst);
    }

    pub fn fail_submit(&self, on: bool) {
        self.fail_submit.store(on, Ordering::SeqCst);
    }

    /// Let only the next `allowed` initializations through; `None` lifts
    /// the limit.
    pub fn limit_inits(&self, allowed: Option<usize>) {
        self.init_calls.store(0, Ordering::SeqCst);
        self.init_limit
            .store(allowed.map_or(0, |n| n + 1), Ordering::SeqCst);
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    async fn write_gate(&self) -> Result<(), StorageError> {
        if self.hang_writes.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for FlakyAttempts {
    async fn create_attempt(&self, attempt: NewAttemptRecord) -> Result<SessionId, StorageError> {
        self.inner.create_attempt(attempt).await
    }

    async fn get_attempt(&self, id: SessionId) -> Result<ExamAttempt, StorageError> {
        self.inner.get_attempt(id).await
    }

    async fn list_responses(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ResponseState>, StorageError> {
        self.inner.list_responses(session_id).await
    }

    async fn init_response(
        &self,
        session_id: SessionId,
        state: &ResponseState,
    ) -> Result<ResponseState, StorageError> {
        self.write_gate().await?;
        let limit = self.init_limit.load(Ordering::SeqCst);
        let call = self.init_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if limit != 0 && call >= limit {
            return Err(StorageError::Connection("store offline".into()));
        }
        self.inner.init_response(session_id, state).await
    }

    async fn upsert_response(
        &self,
        session_id: SessionId,
        state: &ResponseState,
    ) -> Result<(), StorageError> {
        self.write_gate().await?;
        self.inner.upsert_response(session_id, state).await
    }

    async fn submit_attempt(
        &self,
        id: SessionId,
        submission: &Submission,
    ) -> Result<(), StorageError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store offline".into()));
        }
        self.inner.submit_attempt(id, submission).await
    }
}

/// Catalog whose every read fails.
pub struct OfflineCatalog;

#[async_trait]
impl CatalogRepository for OfflineCatalog {
    async fn upsert_test(&self, _test: &TestDefinition) -> Result<(), StorageError> {
        Err(StorageError::Connection("catalog offline".into()))
    }

    async fn get_test(&self, _id: TestId) -> Result<TestDefinition, StorageError> {
        Err(StorageError::Connection("catalog offline".into()))
    }

    async fn list_tests(&self) -> Result<Vec<TestDefinition>, StorageError> {
        Err(StorageError::Connection("catalog offline".into()))
    }

    async fn upsert_question(&self, _question: &Question) -> Result<(), StorageError> {
        Err(StorageError::Connection("catalog offline".into()))
    }

    async fn questions_by_subject(
        &self,
        _subject: Subject,
        _limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        Err(StorageError::Connection("catalog offline".into()))
    }

    async fn get_questions(&self, _ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        Err(StorageError::Connection("catalog offline".into()))
    }
}

/// Loop service over a seeded catalog and a flaky attempt store.
pub async fn flaky_loop(clock: Clock, duration_minutes: u32) -> (ExamLoopService, FlakyAttempts) {
    let repo = InMemoryRepository::new();
    seed_catalog(&repo, duration_minutes).await;
    let attempts = FlakyAttempts::new(repo.clone());
    let service = ExamLoopService::new(clock, Arc::new(repo), Arc::new(attempts.clone()));
    (service, attempts)
}
