use std::collections::{BTreeMap, HashSet};

use crate::model::{Question, QuestionId, Subject, SubjectQuotas};

/// Shortfall of one subject block against its quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockShortfall {
    pub subject: Subject,
    pub requested: u32,
    pub available: usize,
}

/// Ordered, immutable question sequence of a session.
///
/// Physics first, then chemistry, then mathematics; each block keeps the
/// retrieval order of its source and is cut to the subject quota.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuestionSet {
    questions: Vec<Question>,
    shortfalls: Vec<BlockShortfall>,
}

impl QuestionSet {
    /// Assemble the sequence from questions fetched per subject.
    ///
    /// Questions filed under the wrong subject and repeated identifiers are
    /// skipped. A block with fewer questions than its quota is kept short and
    /// reported through [`QuestionSet::shortfalls`].
    #[must_use]
    pub fn assemble(quotas: SubjectQuotas, mut by_subject: BTreeMap<Subject, Vec<Question>>) -> Self {
        let mut seen = HashSet::new();
        let mut questions = Vec::new();
        let mut shortfalls = Vec::new();

        for subject in Subject::ALL {
            let quota = quotas.for_subject(subject);
            let limit = usize::try_from(quota).unwrap_or(usize::MAX);
            let block: Vec<Question> = by_subject
                .remove(&subject)
                .unwrap_or_default()
                .into_iter()
                .filter(|q| q.subject() == subject)
                .filter(|q| seen.insert(q.id()))
                .take(limit)
                .collect();

            if block.len() < limit {
                shortfalls.push(BlockShortfall {
                    subject,
                    requested: quota,
                    available: block.len(),
                });
            }
            questions.extend(block);
        }

        Self {
            questions,
            shortfalls,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn ids(&self) -> Vec<QuestionId> {
        self.questions.iter().map(Question::id).collect()
    }

    #[must_use]
    pub fn position_of(&self, id: QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| q.id() == id)
    }

    #[must_use]
    pub fn subject_at(&self, index: usize) -> Option<Subject> {
        self.get(index).map(Question::subject)
    }

    /// Index of the first question of `subject`, if the block is non-empty.
    #[must_use]
    pub fn first_index_of(&self, subject: Subject) -> Option<usize> {
        self.questions.iter().position(|q| q.subject() == subject)
    }

    #[must_use]
    pub fn shortfalls(&self) -> &[BlockShortfall] {
        &self.shortfalls
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, Difficulty, QuestionDraft};
    use crate::time::fixed_now;

    fn question(id: u64, subject: Subject) -> Question {
        QuestionDraft {
            subject,
            topic: "General".into(),
            text: format!("Question {id}"),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct: AnswerOption::B,
            marks: 4,
            negative_marks: -1,
            difficulty: Difficulty::Hard,
        }
        .validate(QuestionId::new(id), fixed_now())
        .unwrap()
    }

    fn bank() -> BTreeMap<Subject, Vec<Question>> {
        let mut map = BTreeMap::new();
        map.insert(
            Subject::Mathematics,
            vec![question(30, Subject::Mathematics), question(31, Subject::Mathematics)],
        );
        map.insert(
            Subject::Physics,
            vec![
                question(12, Subject::Physics),
                question(10, Subject::Physics),
                question(11, Subject::Physics),
            ],
        );
        map.insert(Subject::Chemistry, vec![question(20, Subject::Chemistry)]);
        map
    }

    #[test]
    fn blocks_follow_subject_order_and_retrieval_order() {
        let set = QuestionSet::assemble(SubjectQuotas::new(2, 1, 2), bank());
        let ids: Vec<u64> = set.ids().iter().map(QuestionId::value).collect();
        assert_eq!(ids, vec![12, 10, 20, 30, 31]);
        assert!(set.shortfalls().is_empty());
        assert_eq!(set.subject_at(2), Some(Subject::Chemistry));
        assert_eq!(set.first_index_of(Subject::Mathematics), Some(3));
    }

    #[test]
    fn short_block_is_tolerated() {
        let set = QuestionSet::assemble(SubjectQuotas::new(1, 5, 0), bank());
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.shortfalls(),
            &[BlockShortfall {
                subject: Subject::Chemistry,
                requested: 5,
                available: 1,
            }]
        );
    }

    #[test]
    fn misfiled_and_duplicate_questions_are_skipped() {
        let mut map = BTreeMap::new();
        map.insert(
            Subject::Physics,
            vec![
                question(1, Subject::Physics),
                question(1, Subject::Physics),
                question(2, Subject::Chemistry),
                question(3, Subject::Physics),
            ],
        );
        let set = QuestionSet::assemble(SubjectQuotas::new(3, 0, 0), map);
        let ids: Vec<u64> = set.ids().iter().map(QuestionId::value).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
