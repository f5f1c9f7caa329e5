//! Tests for checkpoint persistence and the startup discard rule.

use uuid::Uuid;

use paperflow_rs::run::checkpoint::{self, Checkpoint};
use paperflow_rs::run::resolve_checkpoint;

#[test]
fn save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.checkpoint");

    let saved = Checkpoint {
        last_id: Some(Uuid::new_v4()),
        total: 12345,
    };
    checkpoint::save(&path, &saved).unwrap();

    assert_eq!(checkpoint::load(&path), Some(saved));
    // The temp file was renamed away, not left behind.
    assert!(!dir.path().join("run.checkpoint.tmp").exists());
}

#[test]
fn absent_file_means_start_from_the_beginning() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(checkpoint::load(&dir.path().join("nope")), None);
}

#[test]
fn malformed_content_is_treated_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.checkpoint");
    std::fs::write(&path, "42").unwrap();
    assert_eq!(checkpoint::load(&path), None);

    std::fs::write(&path, "{\"last_id\": \"not-a-uuid\"}").unwrap();
    assert_eq!(checkpoint::load(&path), None);
}

#[test]
fn save_overwrites_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.checkpoint");

    let first = Checkpoint {
        last_id: Some(Uuid::new_v4()),
        total: 10,
    };
    checkpoint::save(&path, &first).unwrap();
    let second = Checkpoint {
        last_id: Some(Uuid::new_v4()),
        total: 20,
    };
    checkpoint::save(&path, &second).unwrap();

    assert_eq!(checkpoint::load(&path), Some(second));
}

#[test]
fn checkpoint_without_output_dir_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.checkpoint");
    checkpoint::save(
        &path,
        &Checkpoint {
            last_id: Some(Uuid::new_v4()),
            total: 5,
        },
    )
    .unwrap();

    let missing_output = dir.path().join("processed");
    assert_eq!(resolve_checkpoint(&path, &missing_output), None);

    std::fs::create_dir_all(&missing_output).unwrap();
    assert!(resolve_checkpoint(&path, &missing_output).is_some());
}

#[test]
fn empty_checkpoint_survives_a_missing_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.checkpoint");
    checkpoint::save(&path, &Checkpoint::empty()).unwrap();

    // Nothing was emitted yet, so there is nothing to corroborate.
    let missing_output = dir.path().join("processed");
    assert_eq!(
        resolve_checkpoint(&path, &missing_output),
        Some(Checkpoint::empty())
    );
}
