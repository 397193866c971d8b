use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::constants::{CONFIG_FILE_NAME, DEFINITION_EXT};

/// Collect candidate definition files under `root`, recursively.
///
/// Only `*.yaml` files qualify and the base config is excluded. Symlinked
/// folders are not followed. Paths are returned sorted so every run sees
/// definitions in the same order. Unreadable entries are logged and skipped.
pub fn get_definition_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_definition_candidate(path))
        .collect();

    files.sort();
    debug!("found {} definition candidates under {}", files.len(), root.display());
    files
}

fn is_definition_candidate(path: &Path) -> bool {
    let is_yaml = path.extension().and_then(|e| e.to_str()) == Some(DEFINITION_EXT);
    let is_config = path.file_name().and_then(|n| n.to_str()) == Some(CONFIG_FILE_NAME);
    is_yaml && !is_config
}
