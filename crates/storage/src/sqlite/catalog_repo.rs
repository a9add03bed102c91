use exam_core::model::{Question, QuestionId, Subject, TestDefinition, TestId};

use super::SqliteRepository;
use super::mapping::{conn_err, id_to_i64, map_question_row, map_test_row};
use crate::repository::{CatalogRepository, StorageError};

const QUESTION_COLUMNS: &str = "id, subject, topic, question_text, option_a, option_b, option_c, \
     option_d, correct_answer, marks, negative_marks, difficulty, created_at";

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_test(&self, test: &TestDefinition) -> Result<(), StorageError> {
        let quotas = test.quotas();
        sqlx::query(
            r"
            INSERT INTO tests (id, title, description, duration_minutes, total_questions,
                               physics_questions, chemistry_questions, math_questions, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                duration_minutes = excluded.duration_minutes,
                total_questions = excluded.total_questions,
                physics_questions = excluded.physics_questions,
                chemistry_questions = excluded.chemistry_questions,
                math_questions = excluded.math_questions
            ",
        )
        .bind(id_to_i64("test id", test.id().value())?)
        .bind(test.title())
        .bind(test.description())
        .bind(i64::from(test.duration_minutes()))
        .bind(i64::from(test.total_questions()))
        .bind(i64::from(quotas.physics))
        .bind(i64::from(quotas.chemistry))
        .bind(i64::from(quotas.mathematics))
        .bind(test.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        Ok(())
    }

    async fn get_test(&self, id: TestId) -> Result<TestDefinition, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, duration_minutes, total_questions,
                   physics_questions, chemistry_questions, math_questions, created_at
            FROM tests WHERE id = ?1
            ",
        )
        .bind(id_to_i64("test id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        match row {
            Some(row) => map_test_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_tests(&self) -> Result<Vec<TestDefinition>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, duration_minutes, total_questions,
                   physics_questions, chemistry_questions, math_questions, created_at
            FROM tests
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn_err)?;

        rows.iter().map(map_test_row).collect()
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let [a, b, c, d] = question.options();
        sqlx::query(
            r"
            INSERT INTO questions (id, subject, topic, question_text, option_a, option_b,
                                   option_c, option_d, correct_answer, marks, negative_marks,
                                   difficulty, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(id) DO UPDATE SET
                subject = excluded.subject,
                topic = excluded.topic,
                question_text = excluded.question_text,
                option_a = excluded.option_a,
                option_b = excluded.option_b,
                option_c = excluded.option_c,
                option_d = excluded.option_d,
                correct_answer = excluded.correct_answer,
                marks = excluded.marks,
                negative_marks = excluded.negative_marks,
                difficulty = excluded.difficulty
            ",
        )
        .bind(id_to_i64("question id", question.id().value())?)
        .bind(question.subject().as_str())
        .bind(question.topic())
        .bind(question.text())
        .bind(a.as_str())
        .bind(b.as_str())
        .bind(c.as_str())
        .bind(d.as_str())
        .bind(question.correct().as_str())
        .bind(i64::from(question.marks()))
        .bind(i64::from(question.negative_marks()))
        .bind(question.difficulty().as_str())
        .bind(question.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        Ok(())
    }

    async fn questions_by_subject(
        &self,
        subject: Subject,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE subject = ?1 ORDER BY id ASC LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(subject.as_str())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn_err)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1");
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let row = sqlx::query(&sql)
                .bind(id_to_i64("question id", id.value())?)
                .fetch_optional(&self.pool)
                .await
                .map_err(conn_err)?;
            match row {
                Some(row) => found.push(map_question_row(&row)?),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(found)
    }
}
