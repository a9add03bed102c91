use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::TestCatalogService;
use crate::config::ExamConfig;
use crate::error::AppServicesError;
use crate::results_service::ResultsService;
use crate::sessions::ExamLoopService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    config: ExamConfig,
    catalog: Arc<TestCatalogService>,
    exam_loop: Arc<ExamLoopService>,
    results: Arc<ResultsService>,
}

impl AppServices {
    /// Build services backed by `SQLite` at `config.db_url`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(config: ExamConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        tracing::info!(db_url = %config.db_url, "storage ready");
        Ok(Self::from_storage(&storage, config, clock))
    }

    /// Build services from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` for invalid configuration or storage setup failures.
    pub async fn from_env(clock: Clock) -> Result<Self, AppServicesError> {
        let config = ExamConfig::from_env()?;
        Self::new_sqlite(config, clock).await
    }

    /// Build services over in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), ExamConfig::default(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, config: ExamConfig, clock: Clock) -> Self {
        let catalog = Arc::new(TestCatalogService::new(Arc::clone(&storage.catalog)));
        let exam_loop = Arc::new(
            ExamLoopService::new(
                clock,
                Arc::clone(&storage.catalog),
                Arc::clone(&storage.attempts),
            )
            .with_config(&config),
        );
        let results = Arc::new(ResultsService::new(
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.attempts),
        ));

        Self {
            config,
            catalog,
            exam_loop,
            results,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<TestCatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn exam_loop(&self) -> Arc<ExamLoopService> {
        Arc::clone(&self.exam_loop)
    }

    #[must_use]
    pub fn results(&self) -> Arc<ResultsService> {
        Arc::clone(&self.results)
    }
}
