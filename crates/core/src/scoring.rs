use serde::{Deserialize, Serialize};

use crate::model::{Question, ResponseMap, Subject};

/// Graded outcome of a set of answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Score {
    /// Sum of awarded and deducted marks; may be negative.
    pub total: i32,
    pub correct: u32,
    pub incorrect: u32,
    pub unanswered: u32,
}

impl Score {
    /// Questions that carried a selection at submission.
    #[must_use]
    pub fn attempted(&self) -> u32 {
        self.correct.saturating_add(self.incorrect)
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.attempted().saturating_add(self.unanswered)
    }

    /// Share of attempted questions answered correctly, in percent.
    ///
    /// Returns `0.0` when nothing was attempted.
    #[must_use]
    pub fn accuracy_percent(&self) -> f64 {
        let attempted = self.attempted();
        if attempted == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(attempted) * 100.0
    }

    fn add(&mut self, question: &Question, responses: &ResponseMap) {
        match responses.get(&question.id()).and_then(|r| r.selected) {
            None => self.unanswered = self.unanswered.saturating_add(1),
            Some(selected) if question.is_correct(selected) => {
                self.correct = self.correct.saturating_add(1);
                self.total = self.total.saturating_add(question.marks());
            }
            Some(_) => {
                self.incorrect = self.incorrect.saturating_add(1);
                self.total = self.total.saturating_add(question.negative_marks());
            }
        }
    }
}

/// Grade every question in `sequence` against the final responses.
///
/// A question with no response state, or with no selection, counts as
/// unanswered. Pure fold: identical inputs always produce identical output.
#[must_use]
pub fn score(sequence: &[Question], responses: &ResponseMap) -> Score {
    sequence.iter().fold(Score::default(), |mut acc, q| {
        acc.add(q, responses);
        acc
    })
}

/// Highest total attainable over `sequence`.
#[must_use]
pub fn max_marks(sequence: &[Question]) -> i32 {
    sequence
        .iter()
        .fold(0_i32, |acc, q| acc.saturating_add(q.marks()))
}

/// Score restricted to one subject's questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub subject: Subject,
    pub score: Score,
    pub max_marks: i32,
}

/// Per-subject scores in block order. Subjects with no questions are omitted.
#[must_use]
pub fn breakdown_by_subject(sequence: &[Question], responses: &ResponseMap) -> Vec<SubjectScore> {
    Subject::ALL
        .iter()
        .filter_map(|&subject| {
            let questions: Vec<Question> = sequence
                .iter()
                .filter(|q| q.subject() == subject)
                .cloned()
                .collect();
            if questions.is_empty() {
                return None;
            }
            Some(SubjectScore {
                subject,
                score: score(&questions, responses),
                max_marks: max_marks(&questions),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, Difficulty, QuestionDraft, QuestionId, ResponseState};
    use crate::time::fixed_now;

    fn question(id: u64, subject: Subject, marks: i32, negative_marks: i32) -> Question {
        QuestionDraft {
            subject,
            topic: "General".into(),
            text: format!("Question {id}"),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct: AnswerOption::A,
            marks,
            negative_marks,
            difficulty: Difficulty::Medium,
        }
        .validate(QuestionId::new(id), fixed_now())
        .unwrap()
    }

    fn answer(responses: &mut ResponseMap, id: u64, option: AnswerOption) {
        let qid = QuestionId::new(id);
        responses.insert(
            qid,
            ResponseState::new(qid, fixed_now()).with_selection(option, fixed_now()),
        );
    }

    fn sample_sequence() -> Vec<Question> {
        vec![
            question(1, Subject::Physics, 4, -1),
            question(2, Subject::Chemistry, 4, -1),
            question(3, Subject::Mathematics, 4, -1),
        ]
    }

    #[test]
    fn one_right_one_wrong_one_blank() {
        let sequence = sample_sequence();
        let mut responses = ResponseMap::new();
        answer(&mut responses, 1, AnswerOption::A);
        answer(&mut responses, 2, AnswerOption::B);
        responses.insert(
            QuestionId::new(3),
            ResponseState::new(QuestionId::new(3), fixed_now()),
        );

        let result = score(&sequence, &responses);
        assert_eq!(
            result,
            Score {
                total: 3,
                correct: 1,
                incorrect: 1,
                unanswered: 1,
            }
        );
        assert_eq!(score(&sequence, &responses), result);
    }

    #[test]
    fn total_can_go_negative() {
        let sequence = sample_sequence();
        let mut responses = ResponseMap::new();
        for id in 1..=3 {
            answer(&mut responses, id, AnswerOption::D);
        }
        let result = score(&sequence, &responses);
        assert_eq!(result.total, -3);
        assert_eq!(result.incorrect, 3);
        assert!(result.accuracy_percent().abs() < f64::EPSILON);
    }

    #[test]
    fn missing_state_counts_as_unanswered() {
        let result = score(&sample_sequence(), &ResponseMap::new());
        assert_eq!(result.unanswered, 3);
        assert_eq!(result.total, 0);
        assert_eq!(result.question_count(), 3);
    }

    #[test]
    fn max_marks_uses_each_questions_value() {
        let sequence = vec![
            question(1, Subject::Physics, 4, -1),
            question(2, Subject::Physics, 3, 0),
        ];
        assert_eq!(max_marks(&sequence), 7);
    }

    #[test]
    fn breakdown_follows_subject_order() {
        let sequence = vec![
            question(1, Subject::Mathematics, 4, -1),
            question(2, Subject::Physics, 4, -1),
            question(3, Subject::Physics, 4, -1),
        ];
        let mut responses = ResponseMap::new();
        answer(&mut responses, 2, AnswerOption::A);

        let rows = breakdown_by_subject(&sequence, &responses);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subject, Subject::Physics);
        assert_eq!(rows[0].score.correct, 1);
        assert_eq!(rows[0].score.unanswered, 1);
        assert_eq!(rows[0].max_marks, 8);
        assert_eq!(rows[1].subject, Subject::Mathematics);
    }
}
