//! Tests for the payload store and the failure log.

use serde_json::json;
use uuid::Uuid;

use paperflow_rs::failures::{FailureLog, FailureRecord};
use paperflow_rs::model::WorkItem;
use paperflow_rs::sink::{PayloadStore, payload_path};

#[tokio::test]
async fn write_persists_one_json_file_per_identifier() {
    let dir = tempfile::tempdir().unwrap();
    let store = PayloadStore::new(dir.path());
    store.ensure_dir().await.unwrap();

    let id = Uuid::new_v4();
    let payload = json!({"sections": ["abstract", "body"], "pages": 12});
    let path = store.write(id, &payload).await.unwrap();

    assert_eq!(path, payload_path(dir.path(), id));
    let raw = std::fs::read_to_string(&path).unwrap();
    let read_back: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(read_back, payload);
}

#[tokio::test]
async fn persisted_ids_finds_only_payload_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = PayloadStore::new(dir.path());
    store.ensure_dir().await.unwrap();

    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    store.write(a, &json!(1)).await.unwrap();
    store.write(b, &json!(2)).await.unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
    std::fs::write(dir.path().join("not-a-uuid.json"), "{}").unwrap();

    let mut ids = store.persisted_ids().unwrap();
    ids.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(ids, expected);
}

#[test]
fn persisted_ids_on_missing_dir_is_empty() {
    let store = PayloadStore::new("/nonexistent/processed");
    assert!(store.persisted_ids().unwrap().is_empty());
}

#[test]
fn failure_log_appends_jsonl_records() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("failures.jsonl");
    let log = FailureLog::new(&log_path);

    let item = WorkItem::new(Uuid::new_v4(), "10.1234/abcd", "/tmp/abcd.pdf");
    log.append(&FailureRecord::new(&item, "pending timeout after 800.0s", 3))
        .unwrap();
    log.append(&FailureRecord::new(&item, "submit failed", 3))
        .unwrap();

    let raw = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = raw.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: FailureRecord = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first.id, item.id);
    assert_eq!(first.doi, "10.1234/abcd");
    assert_eq!(first.attempts, 3);
    assert!(first.reason.contains("timeout"));
}
