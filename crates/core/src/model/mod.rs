mod attempt;
mod ids;
mod question;
mod response;
mod subject;
mod test_definition;

pub use ids::{ParseIdError, QuestionId, SessionId, TestId};

pub use attempt::{AttemptError, ExamAttempt, SubmitTrigger, Submission};
pub use question::{Question, QuestionDraft, QuestionError};
pub use response::{ResponseMap, ResponseState};
pub use subject::{AnswerOption, Difficulty, Subject, SubjectError};
pub use test_definition::{SubjectQuotas, TestDefinition, TestError};
