use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::TestId;
use crate::model::subject::Subject;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestError {
    #[error("test title cannot be empty")]
    EmptyTitle,

    #[error("test duration must be > 0 minutes")]
    InvalidDuration,

    #[error("total questions ({total}) does not match subject quotas ({sum})")]
    QuotaMismatch { total: u32, sum: u32 },
}

//
// ─── QUOTAS ────────────────────────────────────────────────────────────────────
//

/// Number of questions drawn from each subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubjectQuotas {
    pub physics: u32,
    pub chemistry: u32,
    pub mathematics: u32,
}

impl SubjectQuotas {
    #[must_use]
    pub fn new(physics: u32, chemistry: u32, mathematics: u32) -> Self {
        Self {
            physics,
            chemistry,
            mathematics,
        }
    }

    /// The same quota for every subject.
    #[must_use]
    pub fn uniform(per_subject: u32) -> Self {
        Self::new(per_subject, per_subject, per_subject)
    }

    #[must_use]
    pub fn for_subject(&self, subject: Subject) -> u32 {
        match subject {
            Subject::Physics => self.physics,
            Subject::Chemistry => self.chemistry,
            Subject::Mathematics => self.mathematics,
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.physics
            .saturating_add(self.chemistry)
            .saturating_add(self.mathematics)
    }
}

//
// ─── TEST DEFINITION ───────────────────────────────────────────────────────────
//

/// A timed exam definition: duration plus per-subject quotas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDefinition {
    id: TestId,
    title: String,
    description: Option<String>,
    duration_minutes: u32,
    quotas: SubjectQuotas,
    created_at: DateTime<Utc>,
}

impl TestDefinition {
    /// Creates a new test definition.
    ///
    /// # Errors
    ///
    /// Returns `TestError` if the title is blank or the duration is zero.
    /// Quotas may all be zero.
    pub fn new(
        id: TestId,
        title: impl Into<String>,
        description: Option<String>,
        duration_minutes: u32,
        quotas: SubjectQuotas,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TestError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TestError::EmptyTitle);
        }
        if duration_minutes == 0 {
            return Err(TestError::InvalidDuration);
        }

        Ok(Self {
            id,
            title,
            description: description.filter(|d| !d.trim().is_empty()),
            duration_minutes,
            quotas,
            created_at,
        })
    }

    /// Rehydrate a definition from storage, checking the stored total.
    ///
    /// # Errors
    ///
    /// Returns `TestError::QuotaMismatch` if `total_questions` disagrees with
    /// the quotas, or any error from [`TestDefinition::new`].
    pub fn from_persisted(
        id: TestId,
        title: String,
        description: Option<String>,
        duration_minutes: u32,
        total_questions: u32,
        quotas: SubjectQuotas,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TestError> {
        let sum = quotas.total();
        if sum != total_questions {
            return Err(TestError::QuotaMismatch {
                total: total_questions,
                sum,
            });
        }
        Self::new(id, title, description, duration_minutes, quotas, created_at)
    }

    #[must_use]
    pub fn id(&self) -> TestId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Time budget in seconds.
    #[must_use]
    pub fn duration_seconds(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    #[must_use]
    pub fn quotas(&self) -> SubjectQuotas {
        self.quotas
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.quotas.total()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn total_is_sum_of_quotas() {
        let test = TestDefinition::new(
            TestId::new(1),
            "Mock 1",
            None,
            180,
            SubjectQuotas::new(25, 25, 30),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(test.total_questions(), 80);
        assert_eq!(test.duration_seconds(), 10_800);
        assert_eq!(test.quotas().for_subject(Subject::Mathematics), 30);
    }

    #[test]
    fn persisted_total_must_match_quotas() {
        let err = TestDefinition::from_persisted(
            TestId::new(1),
            "Mock".into(),
            None,
            60,
            10,
            SubjectQuotas::uniform(3),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, TestError::QuotaMismatch { total: 10, sum: 9 });
    }

    #[test]
    fn zero_quotas_are_allowed() {
        let test = TestDefinition::new(
            TestId::new(1),
            "Empty",
            None,
            60,
            SubjectQuotas::default(),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(test.total_questions(), 0);
    }

    #[test]
    fn blank_description_is_dropped() {
        let test = TestDefinition::new(
            TestId::new(1),
            "Mock",
            Some("   ".into()),
            60,
            SubjectQuotas::uniform(1),
            fixed_now(),
        )
        .unwrap();
        assert_eq!(test.description(), None);
    }
}
