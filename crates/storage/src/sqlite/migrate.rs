use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates the catalog (tests, questions) and attempt
/// (test_attempts, test_responses) tables with their indexes.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if is_applied(pool, 1).await? {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS tests (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
                total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                physics_questions INTEGER NOT NULL CHECK (physics_questions >= 0),
                chemistry_questions INTEGER NOT NULL CHECK (chemistry_questions >= 0),
                math_questions INTEGER NOT NULL CHECK (math_questions >= 0),
                created_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY,
                subject TEXT NOT NULL
                    CHECK (subject IN ('Physics', 'Chemistry', 'Mathematics')),
                topic TEXT NOT NULL,
                question_text TEXT NOT NULL,
                option_a TEXT NOT NULL,
                option_b TEXT NOT NULL,
                option_c TEXT NOT NULL,
                option_d TEXT NOT NULL,
                correct_answer TEXT NOT NULL CHECK (correct_answer IN ('A', 'B', 'C', 'D')),
                marks INTEGER NOT NULL CHECK (marks > 0),
                negative_marks INTEGER NOT NULL CHECK (negative_marks <= 0),
                difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
                created_at TEXT NOT NULL
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS test_attempts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                test_id INTEGER NOT NULL,
                started_at TEXT NOT NULL,
                submitted_at TEXT,
                time_taken_seconds INTEGER CHECK (time_taken_seconds >= 0),
                score INTEGER,
                correct_answers INTEGER CHECK (correct_answers >= 0),
                incorrect_answers INTEGER CHECK (incorrect_answers >= 0),
                unanswered INTEGER CHECK (unanswered >= 0),
                submit_trigger TEXT CHECK (submit_trigger IN ('manual', 'expired')),
                FOREIGN KEY (test_id) REFERENCES tests(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS test_responses (
                attempt_id INTEGER NOT NULL,
                question_id INTEGER NOT NULL,
                selected_answer TEXT CHECK (selected_answer IN ('A', 'B', 'C', 'D')),
                is_marked_for_review INTEGER NOT NULL DEFAULT 0,
                time_spent_seconds INTEGER NOT NULL DEFAULT 0 CHECK (time_spent_seconds >= 0),
                updated_at TEXT NOT NULL,
                PRIMARY KEY (attempt_id, question_id),
                FOREIGN KEY (attempt_id) REFERENCES test_attempts(id) ON DELETE CASCADE,
                FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
            );
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_questions_subject_id
                ON questions (subject, id);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            CREATE INDEX IF NOT EXISTS idx_tests_created
                ON tests (created_at DESC, id DESC);
        ",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(1_i64)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(version = 1, "applied schema migration");

    Ok(())
}
