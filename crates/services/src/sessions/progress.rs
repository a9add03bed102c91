use serde::{Deserialize, Serialize};

use exam_core::status::StatusCounts;
use exam_core::time::format_hms;

/// What the candidate is about to submit, shown before confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitPreview {
    pub counts: StatusCounts,
    pub total_questions: u32,
    pub remaining_seconds: u64,
}

impl SubmitPreview {
    /// Questions without a selection, whatever their review flag.
    #[must_use]
    pub fn unanswered(&self) -> u32 {
        self.total_questions
            .saturating_sub(self.counts.with_selection())
    }

    #[must_use]
    pub fn remaining_hms(&self) -> String {
        format_hms(self.remaining_seconds)
    }
}
