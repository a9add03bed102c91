use exam_core::model::{ExamAttempt, ResponseState, SessionId, Submission};

use super::SqliteRepository;
use super::mapping::{
    conn_err, id_to_i64, map_attempt_row, map_response_row, write_err,
};
use crate::repository::{AttemptRepository, NewAttemptRecord, StorageError};

const RESPONSE_COLUMNS: &str =
    "question_id, selected_answer, is_marked_for_review, time_spent_seconds, updated_at";

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn create_attempt(&self, attempt: NewAttemptRecord) -> Result<SessionId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO test_attempts (test_id, started_at)
            VALUES (?1, ?2)
            ",
        )
        .bind(id_to_i64("test id", attempt.test_id.value())?)
        .bind(attempt.started_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("invalid attempt id".into()))?;
        Ok(SessionId::new(id))
    }

    async fn get_attempt(&self, id: SessionId) -> Result<ExamAttempt, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, test_id, started_at, submitted_at, time_taken_seconds, score,
                   correct_answers, incorrect_answers, unanswered, submit_trigger
            FROM test_attempts WHERE id = ?1
            ",
        )
        .bind(id_to_i64("attempt id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        match row {
            Some(row) => map_attempt_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_responses(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ResponseState>, StorageError> {
        let sql = format!(
            "SELECT {RESPONSE_COLUMNS} FROM test_responses WHERE attempt_id = ?1 ORDER BY question_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("attempt id", session_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn_err)?;

        rows.iter().map(map_response_row).collect()
    }

    async fn init_response(
        &self,
        session_id: SessionId,
        state: &ResponseState,
    ) -> Result<ResponseState, StorageError> {
        let attempt_id = id_to_i64("attempt id", session_id.value())?;
        let question_id = id_to_i64("question id", state.question_id.value())?;

        sqlx::query(
            r"
            INSERT INTO test_responses (attempt_id, question_id, selected_answer,
                                        is_marked_for_review, time_spent_seconds, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(attempt_id, question_id) DO NOTHING
            ",
        )
        .bind(attempt_id)
        .bind(question_id)
        .bind(state.selected.map(|o| o.as_str()))
        .bind(state.marked_for_review)
        .bind(i64::from(state.time_spent_seconds))
        .bind(state.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        let sql = format!(
            "SELECT {RESPONSE_COLUMNS} FROM test_responses WHERE attempt_id = ?1 AND question_id = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(attempt_id)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn_err)?;

        match row {
            Some(row) => map_response_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn upsert_response(
        &self,
        session_id: SessionId,
        state: &ResponseState,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO test_responses (attempt_id, question_id, selected_answer,
                                        is_marked_for_review, time_spent_seconds, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(attempt_id, question_id) DO UPDATE SET
                selected_answer = excluded.selected_answer,
                is_marked_for_review = excluded.is_marked_for_review,
                time_spent_seconds = excluded.time_spent_seconds,
                updated_at = excluded.updated_at
            ",
        )
        .bind(id_to_i64("attempt id", session_id.value())?)
        .bind(id_to_i64("question id", state.question_id.value())?)
        .bind(state.selected.map(|o| o.as_str()))
        .bind(state.marked_for_review)
        .bind(i64::from(state.time_spent_seconds))
        .bind(state.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn submit_attempt(
        &self,
        id: SessionId,
        submission: &Submission,
    ) -> Result<(), StorageError> {
        let attempt_id = id_to_i64("attempt id", id.value())?;
        let time_taken = i64::try_from(submission.time_taken_seconds)
            .map_err(|_| StorageError::Serialization("time taken overflow".into()))?;

        let res = sqlx::query(
            r"
            UPDATE test_attempts SET
                submitted_at = ?2,
                time_taken_seconds = ?3,
                score = ?4,
                correct_answers = ?5,
                incorrect_answers = ?6,
                unanswered = ?7,
                submit_trigger = ?8
            WHERE id = ?1 AND submitted_at IS NULL
            ",
        )
        .bind(attempt_id)
        .bind(submission.submitted_at)
        .bind(time_taken)
        .bind(i64::from(submission.score.total))
        .bind(i64::from(submission.score.correct))
        .bind(i64::from(submission.score.incorrect))
        .bind(i64::from(submission.score.unanswered))
        .bind(submission.trigger.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        if res.rows_affected() > 0 {
            return Ok(());
        }

        let exists = sqlx::query("SELECT 1 FROM test_attempts WHERE id = ?1")
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn_err)?;
        if exists.is_some() {
            Err(StorageError::Conflict)
        } else {
            Err(StorageError::NotFound)
        }
    }
}
