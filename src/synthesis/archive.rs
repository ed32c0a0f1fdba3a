//! Frame archive extraction

use crate::error::{Error, Result, SynthesisError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

fn extraction_failed(archive: &Path, reason: String) -> Error {
    Error::Synthesis(SynthesisError::ExtractionFailed {
        archive: archive.to_path_buf(),
        reason,
    })
}

/// Extract a single ZIP entry to disk, creating directories as needed
///
/// Entries whose names would escape `dest_path` are skipped.
fn extract_entry(
    mut file: zip::read::ZipFile,
    dest_path: &Path,
    archive_path: &Path,
) -> Result<Option<PathBuf>> {
    let file_path = match file.enclosed_name() {
        Some(path) => dest_path.join(path),
        None => {
            warn!(entry = file.name(), "skipping entry with unsafe path");
            return Ok(None);
        }
    };

    if file.is_dir() {
        std::fs::create_dir_all(&file_path)?;
        return Ok(None);
    }

    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut outfile = std::fs::File::create(&file_path)?;
    std::io::copy(&mut file, &mut outfile)
        .map_err(|e| extraction_failed(archive_path, format!("failed to extract entry: {}", e)))?;

    Ok(Some(file_path))
}

/// Extract every entry of a ZIP archive into `dest_path` (blocking)
pub fn extract_zip(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
    debug!(?archive_path, ?dest_path, "extracting frame archive");

    std::fs::create_dir_all(dest_path)?;

    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        extraction_failed(archive_path, format!("failed to read ZIP archive: {}", e))
    })?;

    let mut extracted = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| {
            extraction_failed(archive_path, format!("failed to read ZIP entry: {}", e))
        })?;

        if let Some(path) = extract_entry(entry, dest_path, archive_path)? {
            extracted.push(path);
        }
    }

    debug!(
        ?archive_path,
        extracted_count = extracted.len(),
        "frame archive extracted"
    );
    Ok(extracted)
}

/// Extract a frame archive on the blocking thread pool
pub async fn extract_frames(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
    let archive = archive_path.to_path_buf();
    let dest = dest_path.to_path_buf();

    tokio::task::spawn_blocking(move || extract_zip(&archive, &dest))
        .await
        .map_err(|e| extraction_failed(archive_path, format!("extraction task failed: {}", e)))?
}
