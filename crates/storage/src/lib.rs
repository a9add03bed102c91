#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AttemptRepository, CatalogRepository, InMemoryRepository, NewAttemptRecord, Storage,
    StorageError,
};
