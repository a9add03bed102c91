#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod config;
pub mod error;
pub mod results_service;
pub mod sessions;
pub mod timer;

pub use exam_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use catalog_service::TestCatalogService;
pub use config::{ConfigError, ExamConfig};
pub use error::{AppServicesError, CatalogError, ResultsError, SessionError};
pub use results_service::{ExamReport, ResultsService};
pub use timer::ExamTimer;

pub use sessions::{
    ActiveExam, ExamLoopService, ExamSession, Navigator, QuestionSetLoader, ResponseStore,
    SessionPhase, SubmitPreview,
};
