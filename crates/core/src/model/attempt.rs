use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{SessionId, TestId};
use crate::scoring::Score;
use crate::time::elapsed_seconds;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempt {0} is already submitted")]
    AlreadySubmitted(SessionId),

    #[error("submitted_at is before started_at")]
    InvalidTimeRange,

    #[error("unknown submit trigger: {0}")]
    UnknownTrigger(String),
}

/// What ended the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitTrigger {
    /// The candidate confirmed submission.
    Manual,
    /// The time budget ran out.
    Expired,
}

impl SubmitTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitTrigger::Manual => "manual",
            SubmitTrigger::Expired => "expired",
        }
    }

    /// # Errors
    ///
    /// Returns `AttemptError::UnknownTrigger` for unrecognized values.
    pub fn parse(value: &str) -> Result<Self, AttemptError> {
        match value {
            "manual" => Ok(SubmitTrigger::Manual),
            "expired" => Ok(SubmitTrigger::Expired),
            other => Err(AttemptError::UnknownTrigger(other.to_owned())),
        }
    }
}

/// Final outcome recorded on an attempt when it is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub submitted_at: DateTime<Utc>,
    pub time_taken_seconds: u64,
    pub score: Score,
    pub trigger: SubmitTrigger,
}

impl Submission {
    #[must_use]
    pub fn new(
        started_at: DateTime<Utc>,
        submitted_at: DateTime<Utc>,
        score: Score,
        trigger: SubmitTrigger,
    ) -> Self {
        Self {
            submitted_at,
            time_taken_seconds: elapsed_seconds(started_at, submitted_at),
            score,
            trigger,
        }
    }
}

/// One candidate's timed attempt at a test.
///
/// The submission is written at most once; there is no way back to an
/// unsubmitted attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamAttempt {
    id: SessionId,
    test_id: TestId,
    started_at: DateTime<Utc>,
    submission: Option<Submission>,
}

impl ExamAttempt {
    #[must_use]
    pub fn new(id: SessionId, test_id: TestId, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            test_id,
            started_at,
            submission: None,
        }
    }

    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::InvalidTimeRange` if the submission predates the start.
    pub fn from_persisted(
        id: SessionId,
        test_id: TestId,
        started_at: DateTime<Utc>,
        submission: Option<Submission>,
    ) -> Result<Self, AttemptError> {
        if let Some(s) = &submission {
            if s.submitted_at < started_at {
                return Err(AttemptError::InvalidTimeRange);
            }
        }
        Ok(Self {
            id,
            test_id,
            started_at,
            submission,
        })
    }

    /// Record the final outcome.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::AlreadySubmitted` on a second call and
    /// `AttemptError::InvalidTimeRange` if `submitted_at` precedes the start.
    pub fn record_submission(&mut self, submission: Submission) -> Result<(), AttemptError> {
        if self.submission.is_some() {
            return Err(AttemptError::AlreadySubmitted(self.id));
        }
        if submission.submitted_at < self.started_at {
            return Err(AttemptError::InvalidTimeRange);
        }
        self.submission = Some(submission);
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.submission.is_some()
    }
}
