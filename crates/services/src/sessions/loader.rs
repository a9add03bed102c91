use std::collections::BTreeMap;
use std::sync::Arc;

use exam_core::model::{Subject, SubjectQuotas};
use exam_core::question_set::QuestionSet;
use storage::repository::CatalogRepository;

use crate::error::SessionError;

/// Builds a session's question sequence from the catalog.
#[derive(Clone)]
pub struct QuestionSetLoader {
    catalog: Arc<dyn CatalogRepository>,
}

impl QuestionSetLoader {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// Fetch each subject's block and assemble physics, chemistry, then
    /// mathematics, each cut to its quota.
    ///
    /// A short block is kept short.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::DataUnavailable` if the catalog cannot be read.
    pub async fn load(&self, quotas: SubjectQuotas) -> Result<QuestionSet, SessionError> {
        let mut by_subject = BTreeMap::new();
        for subject in Subject::ALL {
            let quota = quotas.for_subject(subject);
            if quota == 0 {
                continue;
            }
            let block = self
                .catalog
                .questions_by_subject(subject, quota)
                .await
                .map_err(SessionError::DataUnavailable)?;
            by_subject.insert(subject, block);
        }

        let set = QuestionSet::assemble(quotas, by_subject);
        for shortfall in set.shortfalls() {
            tracing::warn!(
                subject = %shortfall.subject,
                requested = shortfall.requested,
                available = shortfall.available,
                "question block shorter than quota"
            );
        }
        Ok(set)
    }
}
