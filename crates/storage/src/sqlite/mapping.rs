use exam_core::model::{
    AnswerOption, ExamAttempt, Question, QuestionDraft, QuestionId, ResponseState, SessionId,
    SubjectQuotas, SubmitTrigger, Submission, TestDefinition, TestId,
};
use exam_core::scoring::Score;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps write failures, turning foreign key violations into `NotFound`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u64_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn i32_from_i64(field: &'static str, v: i64) -> Result<i32, StorageError> {
    i32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u32_column(row: &SqliteRow, column: &'static str) -> Result<u32, StorageError> {
    u32_from_i64(column, row.try_get::<i64, _>(column).map_err(ser)?)
}

pub(crate) fn map_test_row(row: &SqliteRow) -> Result<TestDefinition, StorageError> {
    let quotas = SubjectQuotas::new(
        u32_column(row, "physics_questions")?,
        u32_column(row, "chemistry_questions")?,
        u32_column(row, "math_questions")?,
    );
    TestDefinition::from_persisted(
        TestId::new(u64_from_i64("id", row.try_get("id").map_err(ser)?)?),
        row.try_get("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        u32_column(row, "duration_minutes")?,
        u32_column(row, "total_questions")?,
        quotas,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let subject: String = row.try_get("subject").map_err(ser)?;
    let correct: String = row.try_get("correct_answer").map_err(ser)?;
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;

    let draft = QuestionDraft {
        subject: subject.parse().map_err(ser)?,
        topic: row.try_get("topic").map_err(ser)?,
        text: row.try_get("question_text").map_err(ser)?,
        options: [
            row.try_get("option_a").map_err(ser)?,
            row.try_get("option_b").map_err(ser)?,
            row.try_get("option_c").map_err(ser)?,
            row.try_get("option_d").map_err(ser)?,
        ],
        correct: correct.parse().map_err(ser)?,
        marks: i32_from_i64("marks", row.try_get("marks").map_err(ser)?)?,
        negative_marks: i32_from_i64(
            "negative_marks",
            row.try_get("negative_marks").map_err(ser)?,
        )?,
        difficulty: difficulty.parse().map_err(ser)?,
    };
    let id = QuestionId::new(u64_from_i64("id", row.try_get("id").map_err(ser)?)?);
    draft
        .validate(id, row.try_get("created_at").map_err(ser)?)
        .map_err(ser)
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<ExamAttempt, StorageError> {
    let id = SessionId::new(u64_from_i64("id", row.try_get("id").map_err(ser)?)?);
    let test_id = TestId::new(u64_from_i64("test_id", row.try_get("test_id").map_err(ser)?)?);
    let started_at = row.try_get("started_at").map_err(ser)?;

    let submitted_at: Option<chrono::DateTime<chrono::Utc>> =
        row.try_get("submitted_at").map_err(ser)?;
    let submission = match submitted_at {
        None => None,
        Some(submitted_at) => {
            let trigger: String = row.try_get("submit_trigger").map_err(ser)?;
            Some(Submission {
                submitted_at,
                time_taken_seconds: u64_from_i64(
                    "time_taken_seconds",
                    row.try_get("time_taken_seconds").map_err(ser)?,
                )?,
                score: Score {
                    total: i32_from_i64("score", row.try_get("score").map_err(ser)?)?,
                    correct: u32_column(row, "correct_answers")?,
                    incorrect: u32_column(row, "incorrect_answers")?,
                    unanswered: u32_column(row, "unanswered")?,
                },
                trigger: SubmitTrigger::parse(&trigger).map_err(ser)?,
            })
        }
    };

    ExamAttempt::from_persisted(id, test_id, started_at, submission).map_err(ser)
}

pub(crate) fn map_response_row(row: &SqliteRow) -> Result<ResponseState, StorageError> {
    let selected: Option<String> = row.try_get("selected_answer").map_err(ser)?;
    let selected = selected
        .map(|s| s.parse::<AnswerOption>())
        .transpose()
        .map_err(ser)?;

    Ok(ResponseState {
        question_id: QuestionId::new(u64_from_i64(
            "question_id",
            row.try_get("question_id").map_err(ser)?,
        )?),
        selected,
        marked_for_review: row.try_get("is_marked_for_review").map_err(ser)?,
        time_spent_seconds: u32_column(row, "time_spent_seconds")?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}
