//! Assertion helpers for on-disk results

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Every file below `root`, relative to it, sorted
pub fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    files
}

/// Assert no extraction directory or frame archive survived under `root`
pub fn assert_no_scratch_left(root: &Path) {
    let leftovers: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            name.starts_with(".ugoira-") || name.ends_with(".zip")
        })
        .collect();
    assert!(leftovers.is_empty(), "scratch files left behind: {leftovers:?}");
}
