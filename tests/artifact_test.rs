//! Tests for the artifact index.

use paperflow_rs::artifact::ArtifactIndex;

#[test]
fn index_keys_by_parent_dir_and_stem() {
    let root = tempfile::tempdir().unwrap();
    let prefix = root.path().join("10.1234");
    std::fs::create_dir_all(&prefix).unwrap();
    std::fs::write(prefix.join("abcd.pdf"), b"pdf").unwrap();
    std::fs::write(prefix.join("efgh.pdf"), b"pdf").unwrap();

    let index = ArtifactIndex::build(root.path());
    assert_eq!(index.len(), 2);
    assert_eq!(
        index.resolve("10.1234/abcd").unwrap(),
        prefix.join("abcd.pdf")
    );
    assert!(index.resolve("10.1234/missing").is_none());
}

#[test]
fn index_recurses_and_ignores_other_extensions() {
    let root = tempfile::tempdir().unwrap();
    let deep = root.path().join("journals").join("10.5555");
    std::fs::create_dir_all(&deep).unwrap();
    std::fs::write(deep.join("paper.pdf"), b"pdf").unwrap();
    std::fs::write(deep.join("paper.txt"), b"not a pdf").unwrap();
    std::fs::write(deep.join("SHOUTY.PDF"), b"pdf").unwrap();

    let index = ArtifactIndex::build(root.path());
    assert_eq!(index.len(), 2);
    assert!(index.resolve("10.5555/paper").is_some());
    assert!(index.resolve("10.5555/SHOUTY").is_some());
}

#[test]
fn duplicate_keys_keep_the_first_entry() {
    let root = tempfile::tempdir().unwrap();
    for shelf in ["a", "b"] {
        let dir = root.path().join(shelf).join("10.9999");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("dup.pdf"), b"pdf").unwrap();
    }

    let index = ArtifactIndex::build(root.path());
    // Both files share the key "10.9999/dup"; only one entry survives.
    assert_eq!(index.len(), 1);
    assert!(index.resolve("10.9999/dup").is_some());
}

#[test]
fn missing_root_yields_an_empty_index() {
    let index = ArtifactIndex::build(std::path::Path::new("/nonexistent/artifacts"));
    assert!(index.is_empty());
}
