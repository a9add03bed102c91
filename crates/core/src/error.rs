use thiserror::Error;

use crate::model::{AttemptError, QuestionError, SubjectError, TestError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Test(#[from] TestError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Subject(#[from] SubjectError),
}
