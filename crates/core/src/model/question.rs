use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::subject::{AnswerOption, Difficulty, Subject};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("option {0} text cannot be empty")]
    EmptyOption(AnswerOption),

    #[error("positive marks must be > 0, got {0}")]
    InvalidMarks(i32),

    #[error("negative marks must be <= 0, got {0}")]
    InvalidNegativeMarks(i32),
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it arrives from an author or a catalog row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub subject: Subject,
    pub topic: String,
    pub text: String,
    pub options: [String; 4],
    pub correct: AnswerOption,
    pub marks: i32,
    pub negative_marks: i32,
    pub difficulty: Difficulty,
}

impl QuestionDraft {
    /// Validate the draft and assign its identity.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if text or any option is blank, if `marks` is
    /// not positive, or if `negative_marks` is positive.
    pub fn validate(
        self,
        id: QuestionId,
        created_at: DateTime<Utc>,
    ) -> Result<Question, QuestionError> {
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        for option in AnswerOption::ALL {
            if self.options[option.index()].trim().is_empty() {
                return Err(QuestionError::EmptyOption(option));
            }
        }
        if self.marks <= 0 {
            return Err(QuestionError::InvalidMarks(self.marks));
        }
        if self.negative_marks > 0 {
            return Err(QuestionError::InvalidNegativeMarks(self.negative_marks));
        }

        Ok(Question {
            id,
            subject: self.subject,
            topic: self.topic,
            text: self.text,
            options: self.options,
            correct: self.correct,
            marks: self.marks,
            negative_marks: self.negative_marks,
            difficulty: self.difficulty,
            created_at,
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Immutable multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    subject: Subject,
    topic: String,
    text: String,
    options: [String; 4],
    correct: AnswerOption,
    marks: i32,
    negative_marks: i32,
    difficulty: Difficulty,
    created_at: DateTime<Utc>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn option_text(&self, option: AnswerOption) -> &str {
        &self.options[option.index()]
    }

    #[must_use]
    pub fn options(&self) -> &[String; 4] {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> AnswerOption {
        self.correct
    }

    /// Marks awarded for a correct answer (always positive).
    #[must_use]
    pub fn marks(&self) -> i32 {
        self.marks
    }

    /// Marks applied for a wrong answer (zero or negative).
    #[must_use]
    pub fn negative_marks(&self) -> i32 {
        self.negative_marks
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_correct(&self, selected: AnswerOption) -> bool {
        self.correct == selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft() -> QuestionDraft {
        QuestionDraft {
            subject: Subject::Physics,
            topic: "Kinematics".into(),
            text: "A ball is dropped from rest. Its speed after 1 s is closest to?".into(),
            options: [
                "1 m/s".into(),
                "5 m/s".into(),
                "10 m/s".into(),
                "20 m/s".into(),
            ],
            correct: AnswerOption::C,
            marks: 4,
            negative_marks: -1,
            difficulty: Difficulty::Easy,
        }
    }

    #[test]
    fn valid_draft_becomes_question() {
        let q = draft().validate(QuestionId::new(7), fixed_now()).unwrap();
        assert_eq!(q.id(), QuestionId::new(7));
        assert_eq!(q.option_text(AnswerOption::C), "10 m/s");
        assert!(q.is_correct(AnswerOption::C));
        assert!(!q.is_correct(AnswerOption::A));
    }

    #[test]
    fn blank_option_is_rejected() {
        let mut d = draft();
        d.options[1] = "  ".into();
        let err = d.validate(QuestionId::new(1), fixed_now()).unwrap_err();
        assert_eq!(err, QuestionError::EmptyOption(AnswerOption::B));
    }

    #[test]
    fn positive_negative_marks_are_rejected() {
        let mut d = draft();
        d.negative_marks = 1;
        let err = d.validate(QuestionId::new(1), fixed_now()).unwrap_err();
        assert_eq!(err, QuestionError::InvalidNegativeMarks(1));
    }

    #[test]
    fn zero_negative_marks_are_allowed() {
        let mut d = draft();
        d.negative_marks = 0;
        assert!(d.validate(QuestionId::new(1), fixed_now()).is_ok());
    }
}
