use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;
use crate::model::subject::AnswerOption;

/// Session-local answers keyed by question.
pub type ResponseMap = BTreeMap<QuestionId, ResponseState>;

/// A candidate's current answer, review flag and time spent on one question.
///
/// Transitions return a new value instead of mutating in place, so a caller
/// can persist the next state before adopting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseState {
    pub question_id: QuestionId,
    pub selected: Option<AnswerOption>,
    pub marked_for_review: bool,
    pub time_spent_seconds: u32,
    pub updated_at: DateTime<Utc>,
}

impl ResponseState {
    /// Default state: no selection, not marked, no time spent.
    #[must_use]
    pub fn new(question_id: QuestionId, now: DateTime<Utc>) -> Self {
        Self {
            question_id,
            selected: None,
            marked_for_review: false,
            time_spent_seconds: 0,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.selected.is_some()
    }

    #[must_use]
    pub fn with_selection(&self, option: AnswerOption, now: DateTime<Utc>) -> Self {
        Self {
            selected: Some(option),
            updated_at: now,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_review_toggled(&self, now: DateTime<Utc>) -> Self {
        Self {
            marked_for_review: !self.marked_for_review,
            updated_at: now,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn cleared(&self, now: DateTime<Utc>) -> Self {
        Self {
            selected: None,
            updated_at: now,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_time_added(&self, seconds: u32, now: DateTime<Utc>) -> Self {
        Self {
            time_spent_seconds: self.time_spent_seconds.saturating_add(seconds),
            updated_at: now,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn clearing_keeps_review_flag_and_time() {
        let now = fixed_now();
        let state = ResponseState::new(QuestionId::new(1), now)
            .with_selection(AnswerOption::B, now)
            .with_review_toggled(now)
            .with_time_added(12, now)
            .cleared(now);

        assert_eq!(state.selected, None);
        assert!(state.marked_for_review);
        assert_eq!(state.time_spent_seconds, 12);
    }

    #[test]
    fn transitions_do_not_touch_the_original() {
        let now = fixed_now();
        let original = ResponseState::new(QuestionId::new(1), now);
        let next = original.with_selection(AnswerOption::A, now);
        assert!(!original.is_answered());
        assert!(next.is_answered());
    }
}
