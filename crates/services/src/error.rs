//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{AttemptError, SessionId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::config::ConfigError;

/// Errors emitted by the exam session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The catalog could not be read; fatal to session start.
    #[error("exam data unavailable: {0}")]
    DataUnavailable(#[source] StorageError),

    /// A mutation could not be durably recorded; local state is unchanged.
    #[error("could not persist change: {0}")]
    PersistenceFailed(#[source] StorageError),

    #[error("question index {index} out of range (0..{len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The attempt was created but its response states were not all
    /// stored. Resume `session_id` to finish initialization.
    #[error("session {session_id} started but not initialized: {source}")]
    StartInterrupted {
        session_id: SessionId,
        #[source]
        source: StorageError,
    },

    #[error("session already submitted")]
    SessionAlreadySubmitted,

    #[error("session has not started")]
    NotStarted,

    #[error("session has not been submitted")]
    NotSubmitted,

    #[error("test or session not found")]
    NotFound,

    #[error(transparent)]
    Attempt(#[from] AttemptError),
}

impl SessionError {
    /// Read failure, keeping `NotFound` distinct.
    pub(crate) fn from_read(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound,
            other => Self::DataUnavailable(other),
        }
    }
}

/// Errors emitted by `TestCatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("test not found")]
    NotFound,
    #[error("test catalog unavailable: {0}")]
    DataUnavailable(#[source] StorageError),
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound,
            other => Self::DataUnavailable(other),
        }
    }
}

/// Errors emitted by `ResultsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResultsError {
    #[error("session not found")]
    NotFound,
    #[error("session has not been submitted")]
    NotSubmitted,
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ResultsError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
