use chrono::Duration;
use exam_core::model::{
    AnswerOption, Difficulty, Question, QuestionDraft, QuestionId, ResponseState, Subject,
    SubjectQuotas, SubmitTrigger, Submission, TestDefinition, TestId,
};
use exam_core::scoring::Score;
use exam_core::time::fixed_now;
use storage::repository::{AttemptRepository, CatalogRepository, NewAttemptRecord, StorageError};
use storage::sqlite::SqliteRepository;

fn build_question(id: u64, subject: Subject) -> Question {
    QuestionDraft {
        subject,
        topic: "Mechanics".into(),
        text: format!("Question {id}"),
        options: ["1".into(), "2".into(), "3".into(), "4".into()],
        correct: AnswerOption::C,
        marks: 4,
        negative_marks: -1,
        difficulty: Difficulty::Medium,
    }
    .validate(QuestionId::new(id), fixed_now())
    .unwrap()
}

fn build_test(id: u64, offset_days: i64) -> TestDefinition {
    TestDefinition::new(
        TestId::new(id),
        format!("Mock {id}"),
        Some("Full syllabus".into()),
        180,
        SubjectQuotas::new(2, 1, 1),
        fixed_now() + Duration::days(offset_days),
    )
    .unwrap()
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn catalog_roundtrip_and_ordering() {
    let repo = connect("memdb_catalog").await;
    repo.upsert_test(&build_test(1, 0)).await.unwrap();
    repo.upsert_test(&build_test(2, 3)).await.unwrap();

    let listed: Vec<u64> = repo
        .list_tests()
        .await
        .unwrap()
        .iter()
        .map(|t| t.id().value())
        .collect();
    assert_eq!(listed, vec![2, 1]);

    let fetched = repo.get_test(TestId::new(1)).await.unwrap();
    assert_eq!(fetched, build_test(1, 0));
    assert!(matches!(
        repo.get_test(TestId::new(9)).await,
        Err(StorageError::NotFound)
    ));

    for (id, subject) in [
        (7, Subject::Physics),
        (3, Subject::Physics),
        (5, Subject::Chemistry),
        (4, Subject::Physics),
    ] {
        repo.upsert_question(&build_question(id, subject))
            .await
            .unwrap();
    }
    let physics: Vec<u64> = repo
        .questions_by_subject(Subject::Physics, 2)
        .await
        .unwrap()
        .iter()
        .map(|q| q.id().value())
        .collect();
    assert_eq!(physics, vec![3, 4]);

    let by_id = repo
        .get_questions(&[QuestionId::new(5), QuestionId::new(3)])
        .await
        .unwrap();
    assert_eq!(by_id[0], build_question(5, Subject::Chemistry));
    assert_eq!(by_id[1].id(), QuestionId::new(3));
    assert!(matches!(
        repo.get_questions(&[QuestionId::new(99)]).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn responses_and_submission_persist() {
    let repo = connect("memdb_attempts").await;
    repo.upsert_test(&build_test(1, 0)).await.unwrap();
    repo.upsert_question(&build_question(1, Subject::Physics))
        .await
        .unwrap();
    repo.upsert_question(&build_question(2, Subject::Physics))
        .await
        .unwrap();

    let started = fixed_now();
    let session = repo
        .create_attempt(NewAttemptRecord {
            test_id: TestId::new(1),
            started_at: started,
        })
        .await
        .unwrap();

    let fresh = ResponseState::new(QuestionId::new(1), started);
    let stored = repo.init_response(session, &fresh).await.unwrap();
    assert_eq!(stored, fresh);

    let answered = fresh
        .with_selection(AnswerOption::C, started + Duration::seconds(5))
        .with_review_toggled(started + Duration::seconds(6))
        .with_time_added(40, started + Duration::seconds(40));
    repo.upsert_response(session, &answered).await.unwrap();

    let again = repo.init_response(session, &fresh).await.unwrap();
    assert_eq!(again, answered);

    repo.init_response(session, &ResponseState::new(QuestionId::new(2), started))
        .await
        .unwrap();
    let all = repo.list_responses(session).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0], answered);

    let score = Score {
        total: 4,
        correct: 1,
        incorrect: 0,
        unanswered: 1,
    };
    let submission = Submission::new(
        started,
        started + Duration::minutes(12),
        score,
        SubmitTrigger::Expired,
    );
    repo.submit_attempt(session, &submission).await.unwrap();

    let attempt = repo.get_attempt(session).await.unwrap();
    assert_eq!(attempt.submission(), Some(&submission));
    assert_eq!(attempt.submission().map(|s| s.time_taken_seconds), Some(720));

    let err = repo.submit_attempt(session, &submission).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn writes_against_unknown_rows_are_not_found() {
    let repo = connect("memdb_missing").await;
    repo.upsert_question(&build_question(1, Subject::Physics))
        .await
        .unwrap();

    let err = repo
        .create_attempt(NewAttemptRecord {
            test_id: TestId::new(42),
            started_at: fixed_now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let submission = Submission::new(
        fixed_now(),
        fixed_now(),
        Score::default(),
        SubmitTrigger::Manual,
    );
    let err = repo
        .submit_attempt(exam_core::model::SessionId::new(77), &submission)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    repo.upsert_test(&build_test(1, 0)).await.unwrap();
    assert_eq!(repo.list_tests().await.unwrap().len(), 1);
}
