//! Frame timing manifest for ffmpeg's concat demuxer

use crate::error::Result;
use crate::types::FrameDescriptor;
use std::path::{Path, PathBuf};

/// File name of the manifest inside the extraction directory
pub const MANIFEST_FILE: &str = "frames.txt";

/// Quote a file name for a concat `file` directive
///
/// Inside single quotes the demuxer has no escapes, so an embedded quote
/// closes the string, adds an escaped quote and reopens it.
fn quote(name: &str) -> String {
    format!("'{}'", name.replace('\'', r"'\''"))
}

/// Base name of a frame file; metadata names are relative to the archive root
pub(crate) fn frame_file_name(frame: &FrameDescriptor) -> &str {
    Path::new(&frame.file)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&frame.file)
}

/// Render the manifest, one `file`/`duration` pair per frame, in playback order
pub fn render_manifest(frames: &[FrameDescriptor]) -> String {
    let mut out = String::new();
    for frame in frames {
        out.push_str(&format!("file {}\n", quote(frame_file_name(frame))));
        out.push_str(&format!("duration {}\n", frame.duration_secs()));
    }
    out
}

/// Write the manifest into `dir`, returning its path
pub async fn write_manifest(dir: &Path, frames: &[FrameDescriptor]) -> Result<PathBuf> {
    let path = dir.join(MANIFEST_FILE);
    tokio::fs::write(&path, render_manifest(frames)).await?;
    tracing::debug!(path = %path.display(), frames = frames.len(), "wrote frame manifest");
    Ok(path)
}
