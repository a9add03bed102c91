use std::sync::Arc;

use exam_core::model::{TestDefinition, TestId};
use storage::repository::CatalogRepository;

use crate::error::CatalogError;

/// Test selection over the catalog.
#[derive(Clone)]
pub struct TestCatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl TestCatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// Every available test, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DataUnavailable` if the catalog cannot be read.
    pub async fn list_tests(&self) -> Result<Vec<TestDefinition>, CatalogError> {
        let tests = self.catalog.list_tests().await.map_err(|err| {
            tracing::warn!(error = %err, "test catalog unavailable");
            CatalogError::DataUnavailable(err)
        })?;
        Ok(tests)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown test, or
    /// `CatalogError::DataUnavailable` if the catalog cannot be read.
    pub async fn get_test(&self, id: TestId) -> Result<TestDefinition, CatalogError> {
        Ok(self.catalog.get_test(id).await?)
    }
}
