use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use exam_core::model::{QuestionId, ResponseMap, SessionId, Subject, SubmitTrigger, TestId};
use exam_core::scoring::{Score, SubjectScore, breakdown_by_subject, max_marks};
use storage::repository::{AttemptRepository, CatalogRepository};

use crate::error::ResultsError;

/// Graded outcome of a submitted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamReport {
    pub session_id: SessionId,
    pub test_id: TestId,
    pub test_title: String,
    pub started_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    pub time_taken_seconds: u64,
    pub trigger: SubmitTrigger,
    /// Score recorded at submission.
    pub score: Score,
    pub accuracy_percent: f64,
    /// Sum of each question's positive marks.
    pub max_marks: i32,
    pub subjects: Vec<SubjectScore>,
}

impl ExamReport {
    #[must_use]
    pub fn subject(&self, subject: Subject) -> Option<&SubjectScore> {
        self.subjects.iter().find(|row| row.subject == subject)
    }
}

/// Builds reports for submitted sessions.
#[derive(Clone)]
pub struct ResultsService {
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl ResultsService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { catalog, attempts }
    }

    /// Load the report of `session_id`.
    ///
    /// # Errors
    ///
    /// Returns `ResultsError::NotFound` for an unknown session,
    /// `ResultsError::NotSubmitted` if it is still running, or
    /// `ResultsError::Storage` for other storage failures.
    pub async fn load(&self, session_id: SessionId) -> Result<ExamReport, ResultsError> {
        let attempt = self.attempts.get_attempt(session_id).await?;
        let submission = attempt
            .submission()
            .cloned()
            .ok_or(ResultsError::NotSubmitted)?;
        let test = self.catalog.get_test(attempt.test_id()).await?;

        let responses: ResponseMap = self
            .attempts
            .list_responses(session_id)
            .await?
            .into_iter()
            .map(|state| (state.question_id, state))
            .collect();
        let ids: Vec<QuestionId> = responses.keys().copied().collect();
        let questions = self.catalog.get_questions(&ids).await?;

        Ok(ExamReport {
            session_id,
            test_id: test.id(),
            test_title: test.title().to_string(),
            started_at: attempt.started_at(),
            submitted_at: submission.submitted_at,
            time_taken_seconds: submission.time_taken_seconds,
            trigger: submission.trigger,
            score: submission.score,
            accuracy_percent: submission.score.accuracy_percent(),
            max_marks: max_marks(&questions),
            subjects: breakdown_by_subject(&questions, &responses),
        })
    }
}
