//! Shared helpers for synthesis tests

use super::{EncoderCapabilities, FrameEncoder};
use crate::error::{Error, Result, SynthesisError};
use crate::types::ArtworkId;
use async_trait::async_trait;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use zip::write::FileOptions;

/// Build a ZIP archive in memory
pub(crate) fn zip_bytes<D: AsRef<[u8]>>(entries: &[(&str, D)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(data.as_ref()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Write a ZIP archive to `path`
pub(crate) fn write_zip<D: AsRef<[u8]>>(path: &Path, entries: &[(&str, D)]) {
    std::fs::write(path, zip_bytes(entries)).unwrap();
}

/// Archive holding `count` frames named like [`ugoira_metadata`](crate::remote::fake::ugoira_metadata)
pub(crate) fn frame_archive(count: usize) -> Vec<u8> {
    let entries: Vec<(String, Vec<u8>)> = (0..count)
        .map(|i| (format!("{i:06}.jpg"), format!("frame {i}").into_bytes()))
        .collect();
    let borrowed: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, data)| (name.as_str(), data.as_slice()))
        .collect();
    zip_bytes(&borrowed)
}

/// What a [`MockEncoder`] does when invoked
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EncoderBehavior {
    /// Write a placeholder GIF at the output path
    WriteOutput,
    /// Fail like a non-zero exit
    Fail,
    /// Succeed without producing output
    NoOutput,
}

/// Encoder double recording what it saw
pub(crate) struct MockEncoder {
    behavior: EncoderBehavior,
    pub calls: AtomicU32,
    /// Manifest contents seen by the last call
    pub last_manifest: Mutex<Option<String>>,
}

impl MockEncoder {
    pub fn new(behavior: EncoderBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicU32::new(0),
            last_manifest: Mutex::new(None),
        }
    }
}

#[async_trait]
impl FrameEncoder for MockEncoder {
    async fn encode(
        &self,
        id: ArtworkId,
        work_dir: &Path,
        manifest: &Path,
        output: &Path,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(output.is_absolute(), "output must be absolute: {output:?}");

        let contents = tokio::fs::read_to_string(work_dir.join(manifest)).await?;
        *self.last_manifest.lock().unwrap() = Some(contents);

        match self.behavior {
            EncoderBehavior::WriteOutput => {
                tokio::fs::write(output, b"GIF89a").await?;
                Ok(())
            }
            EncoderBehavior::Fail => Err(Error::Synthesis(SynthesisError::EncoderFailed {
                id,
                status: Some(1),
                stderr: "frames.txt: Invalid data found when processing input".to_string(),
            })),
            EncoderBehavior::NoOutput => Ok(()),
        }
    }

    fn capabilities(&self) -> EncoderCapabilities {
        EncoderCapabilities { can_encode: true }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
