//! Frame encoders (ffmpeg CLI and no-op fallback)

use crate::error::{Error, Result, SynthesisError};
use crate::types::ArtworkId;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Filter graph producing a per-frame palette for clean GIF colors
const GIF_FILTER: &str = "split[s0][s1];[s0]palettegen=stats_mode=single[p];[s1][p]paletteuse=new=1";

/// Keep the encoder from opening a console window on Windows
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Capabilities of a frame encoder implementation
#[derive(Debug, Clone, Copy)]
pub struct EncoderCapabilities {
    /// Can turn a frame manifest into an animated GIF
    pub can_encode: bool,
}

/// Trait for turning extracted frames into an animated GIF
///
/// The encoder is a black box: it receives a working directory holding the
/// frames and a manifest, and must write the GIF to `output`.
///
/// # Examples
///
/// ```no_run
/// use pixiv_dl::synthesis::{CliFrameEncoder, FrameEncoder};
/// use pixiv_dl::types::ArtworkId;
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let encoder = CliFrameEncoder::from_path().expect("ffmpeg not found in PATH");
///
/// encoder
///     .encode(
///         ArtworkId(44298467),
///         Path::new("downloads/44298467 - Loop/.ugoira-44298467"),
///         Path::new("frames.txt"),
///         Path::new("/abs/downloads/44298467 - Loop/Loop.gif"),
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait FrameEncoder: Send + Sync {
    /// Encode the frames listed in `manifest` into `output`
    ///
    /// # Arguments
    ///
    /// * `id` - Artwork being encoded (for errors and logs)
    /// * `work_dir` - Directory holding the frames; the encoder runs inside it
    /// * `manifest` - Manifest path, relative to `work_dir` or absolute
    /// * `output` - Absolute destination of the GIF
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::EncoderFailed`] on a non-zero exit,
    /// [`Error::ExternalTool`] if the encoder cannot be started, and
    /// [`SynthesisError::EncoderUnavailable`] for the no-op implementation.
    async fn encode(
        &self,
        id: ArtworkId,
        work_dir: &Path,
        manifest: &Path,
        output: &Path,
    ) -> Result<()>;

    /// Query capabilities of this encoder
    fn capabilities(&self) -> EncoderCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Encoder that runs an external `ffmpeg` binary
pub struct CliFrameEncoder {
    binary_path: PathBuf,
}

impl CliFrameEncoder {
    /// Create a new CLI encoder with an explicit binary path
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Attempt to find ffmpeg in PATH
    ///
    /// Returns `None` if the binary is not found.
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    /// Path of the binary this encoder runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Argument list passed to ffmpeg
    pub fn build_args(manifest: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-hide_banner",
            "-f",
            "concat",
            "-safe",
            "0",
            "-i",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(manifest.as_os_str().to_owned());
        args.push("-vf".into());
        args.push(GIF_FILTER.into());
        args.push("-y".into());
        args.push(output.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl FrameEncoder for CliFrameEncoder {
    async fn encode(
        &self,
        id: ArtworkId,
        work_dir: &Path,
        manifest: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut command = Command::new(&self.binary_path);
        command
            .args(Self::build_args(manifest, output))
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        tracing::debug!(
            artwork_id = id.0,
            binary = %self.binary_path.display(),
            work_dir = %work_dir.display(),
            "running frame encoder"
        );

        let output_status = command
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr).trim().to_string();
            tracing::error!(
                artwork_id = id.0,
                exit_code = ?output_status.status.code(),
                stderr = %stderr,
                "frame encoder failed"
            );
            return Err(Error::Synthesis(SynthesisError::EncoderFailed {
                id,
                status: output_status.status.code(),
                stderr,
            }));
        }

        Ok(())
    }

    fn capabilities(&self) -> EncoderCapabilities {
        EncoderCapabilities { can_encode: true }
    }

    fn name(&self) -> &'static str {
        "cli-ffmpeg"
    }
}

/// Encoder used when no ffmpeg binary is available
///
/// Every encode fails with [`SynthesisError::EncoderUnavailable`]; callers
/// check [`capabilities`](FrameEncoder::capabilities) first and skip animated
/// works instead.
pub struct NoOpFrameEncoder;

#[async_trait]
impl FrameEncoder for NoOpFrameEncoder {
    async fn encode(
        &self,
        _id: ArtworkId,
        _work_dir: &Path,
        _manifest: &Path,
        _output: &Path,
    ) -> Result<()> {
        Err(Error::Synthesis(SynthesisError::EncoderUnavailable))
    }

    fn capabilities(&self) -> EncoderCapabilities {
        EncoderCapabilities { can_encode: false }
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
