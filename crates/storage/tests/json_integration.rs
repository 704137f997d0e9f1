use quiz_core::model::{BookStatus, QuestionId, RecentScores};
use storage::Storage;
use storage::question_bank::{load_question_bank, parse_question_bank};
use storage::repository::StorageError;
use tempfile::TempDir;

#[tokio::test]
async fn json_store_reports_first_run_as_none() {
    let dir = TempDir::new().unwrap();
    let storage = Storage::json(dir.path());

    assert!(storage.books.load_statuses().await.unwrap().is_none());
    assert!(storage.scores.load_scores().await.unwrap().is_none());
}

#[tokio::test]
async fn json_store_persists_documents_wholesale() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("nested").join("data");
    let storage = Storage::json(&data_dir);

    storage
        .books
        .save_statuses(&[BookStatus::Enabled, BookStatus::Disabled, BookStatus::Locked])
        .await
        .unwrap();
    storage
        .books
        .save_statuses(&[BookStatus::Disabled])
        .await
        .unwrap();
    storage
        .scores
        .save_scores(&RecentScores::new([7, 10, 0]))
        .await
        .unwrap();

    let store_json = std::fs::read_to_string(data_dir.join("store.json")).unwrap();
    assert_eq!(store_json, r#"["disabled"]"#);
    let scores_json = std::fs::read_to_string(data_dir.join("scores.json")).unwrap();
    assert_eq!(scores_json, "[7,10,0]");

    let reopened = Storage::json(&data_dir);
    assert_eq!(
        reopened.books.load_statuses().await.unwrap(),
        Some(vec![BookStatus::Disabled])
    );
    assert_eq!(
        reopened.scores.load_scores().await.unwrap(),
        Some(RecentScores::new([7, 10, 0]))
    );
}

#[tokio::test]
async fn json_store_rejects_corrupt_documents() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("store.json"), "{oops").unwrap();
    std::fs::write(dir.path().join("scores.json"), r#"["a"]"#).unwrap();
    let storage = Storage::json(dir.path());

    assert!(matches!(
        storage.books.load_statuses().await,
        Err(StorageError::Serialization(_))
    ));
    assert!(matches!(
        storage.scores.load_scores().await,
        Err(StorageError::Serialization(_))
    ));
}

#[tokio::test]
async fn question_bank_loads_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trivia.json");
    std::fs::write(
        &path,
        r#"[{"id": 11, "book": 1, "question": "Q", "hint": "H", "answers": {"yes": true, "no": false}}]"#,
    )
    .unwrap();

    let bank = load_question_bank(&path).await.unwrap();
    assert_eq!(bank.len(), 1);
    assert_eq!(bank.questions()[0].id(), QuestionId::new(11));
}

#[tokio::test]
async fn question_bank_reports_missing_file_and_bad_content() {
    let dir = TempDir::new().unwrap();
    let err = load_question_bank(dir.path().join("absent.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Io(_)));

    let err = parse_question_bank(r#"[{"id": 1, "book": 1, "question": "Q", "answers": {}}]"#)
        .unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
}
