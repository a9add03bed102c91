//! Display classification of questions for the navigator view.

use serde::{Deserialize, Serialize};

use crate::model::{Question, ResponseMap, ResponseState};

/// Navigator status of a single question, derived from its response state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivedStatus {
    NotVisited,
    NotAnswered,
    Answered,
    Marked,
    AnsweredMarked,
}

impl DerivedStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DerivedStatus::NotVisited => "not-visited",
            DerivedStatus::NotAnswered => "not-answered",
            DerivedStatus::Answered => "answered",
            DerivedStatus::Marked => "marked",
            DerivedStatus::AnsweredMarked => "answered-marked",
        }
    }
}

/// Classify a question from its (possibly missing) response state.
#[must_use]
pub fn classify(state: Option<&ResponseState>) -> DerivedStatus {
    let Some(state) = state else {
        return DerivedStatus::NotVisited;
    };
    match (state.selected.is_some(), state.marked_for_review) {
        (true, true) => DerivedStatus::AnsweredMarked,
        (true, false) => DerivedStatus::Answered,
        (false, true) => DerivedStatus::Marked,
        (false, false) => DerivedStatus::NotAnswered,
    }
}

/// Per-status totals across a question sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusCounts {
    pub not_visited: u32,
    pub not_answered: u32,
    pub answered: u32,
    pub marked: u32,
    pub answered_marked: u32,
}

impl StatusCounts {
    #[must_use]
    pub fn tally(questions: &[Question], responses: &ResponseMap) -> Self {
        questions
            .iter()
            .map(|q| classify(responses.get(&q.id())))
            .fold(Self::default(), |mut counts, status| {
                counts.record(status);
                counts
            })
    }

    fn record(&mut self, status: DerivedStatus) {
        let slot = match status {
            DerivedStatus::NotVisited => &mut self.not_visited,
            DerivedStatus::NotAnswered => &mut self.not_answered,
            DerivedStatus::Answered => &mut self.answered,
            DerivedStatus::Marked => &mut self.marked,
            DerivedStatus::AnsweredMarked => &mut self.answered_marked,
        };
        *slot = slot.saturating_add(1);
    }

    #[must_use]
    pub fn get(&self, status: DerivedStatus) -> u32 {
        match status {
            DerivedStatus::NotVisited => self.not_visited,
            DerivedStatus::NotAnswered => self.not_answered,
            DerivedStatus::Answered => self.answered,
            DerivedStatus::Marked => self.marked,
            DerivedStatus::AnsweredMarked => self.answered_marked,
        }
    }

    /// Questions that carry a selection, marked or not.
    #[must_use]
    pub fn with_selection(&self) -> u32 {
        self.answered.saturating_add(self.answered_marked)
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.not_visited
            .saturating_add(self.not_answered)
            .saturating_add(self.answered)
            .saturating_add(self.marked)
            .saturating_add(self.answered_marked)
    }
}
