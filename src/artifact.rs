//! Artifact discovery: one filesystem scan per run, indexed for lookup.
//!
//! Documents are located by DOI. A DOI like `10.1234/abcd` maps onto the
//! layout `{root}/10.1234/abcd.pdf`, so the index key is the normalized
//! `"{parent_dir}/{file_stem}"` of each file found under the root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

/// Index of on-disk artifacts keyed by their logical name.
pub struct ArtifactIndex {
    entries: HashMap<String, PathBuf>,
}

impl ArtifactIndex {
    /// Recursively scan `root` for `.pdf` files and build the index.
    ///
    /// A missing root yields an empty index (the reader logs and stops).
    /// Duplicate keys keep the first path seen and log the collision.
    pub fn build(root: &Path) -> Self {
        let mut entries: HashMap<String, PathBuf> = HashMap::new();
        if !root.exists() {
            return Self { entries };
        }

        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file()
                || !path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
            {
                continue;
            }
            let Some(key) = index_key(path) else {
                continue;
            };
            match entries.entry(key) {
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(path.to_path_buf());
                }
                std::collections::hash_map::Entry::Occupied(slot) => {
                    warn!(key = %slot.key(), path = %path.display(), "duplicate artifact key");
                }
            }
        }

        debug!(count = entries.len(), root = %root.display(), "artifact index built");
        Self { entries }
    }

    /// Resolve a locator (DOI) to an artifact path.
    pub fn resolve(&self, doi: &str) -> Option<&Path> {
        self.entries.get(doi).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `"{parent_dir}/{file_stem}"`: the normalized logical name of an
/// artifact, matching how a DOI's prefix/suffix splits across the tree.
fn index_key(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let parent = path.parent()?.file_name()?.to_str()?;
    Some(format!("{parent}/{stem}"))
}
