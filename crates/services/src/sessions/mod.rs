mod loader;
mod navigation;
mod progress;
mod responses;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use loader::QuestionSetLoader;
pub use navigation::Navigator;
pub use progress::SubmitPreview;
pub use responses::ResponseStore;
pub use service::{ExamSession, SessionPhase};
pub use workflow::{ActiveExam, ExamLoopService};
