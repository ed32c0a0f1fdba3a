//! Core types for pixiv-dl

use crate::planner::FilenameTemplate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unique identifier for an artwork on the platform
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtworkId(pub u64);

impl ArtworkId {
    /// Create a new ArtworkId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ArtworkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ArtworkId> for u64 {
    fn from(id: ArtworkId) -> Self {
        id.0
    }
}

impl PartialEq<u64> for ArtworkId {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for ArtworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ArtworkId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Artwork type as reported by the platform
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtworkKind {
    /// Still illustration (one or more pages)
    #[default]
    Illust,
    /// Manga (usually multiple pages)
    Manga,
    /// Animated frame sequence
    Ugoira,
}

/// How an artwork must be downloaded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtworkShape {
    /// One image, stored directly in the download root
    SingleImage,
    /// Several pages, stored in a per-artwork subdirectory
    MultiImage,
    /// Animated frames, synthesized into one GIF in a per-artwork subdirectory
    FrameSequence,
}

/// Author of an artwork
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Numeric user id
    #[serde(default)]
    pub id: u64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Account handle
    #[serde(default)]
    pub account: String,
}

/// Original-size URL for a single-page artwork
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinglePageMeta {
    /// Original image URL, absent for multi-page works
    #[serde(default)]
    pub original_image_url: Option<String>,
}

/// Image URLs for one page of a multi-page artwork
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImageUrls {
    /// Original image URL
    #[serde(default)]
    pub original: Option<String>,
}

/// One page of a multi-page artwork
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// URLs for this page
    #[serde(default)]
    pub image_urls: PageImageUrls,
}

/// Artwork metadata returned by the detail and recommendation endpoints
///
/// Immutable for the lifetime of one download.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    /// Artwork identifier
    pub id: ArtworkId,
    /// Title
    #[serde(default)]
    pub title: String,
    /// Platform type
    #[serde(rename = "type", default)]
    pub kind: ArtworkKind,
    /// Author
    #[serde(default)]
    pub user: Author,
    /// Number of pages (1 for single images and frame sequences)
    #[serde(default = "default_page_count")]
    pub page_count: u32,
    /// Single-page original URL
    #[serde(default)]
    pub meta_single_page: SinglePageMeta,
    /// Per-page URLs for multi-page works
    #[serde(default)]
    pub meta_pages: Vec<PageMeta>,
}

impl Artwork {
    /// Classify the artwork by how it must be downloaded
    ///
    /// Frame sequences take precedence over page count.
    pub fn shape(&self) -> ArtworkShape {
        if self.kind == ArtworkKind::Ugoira {
            ArtworkShape::FrameSequence
        } else if self.page_count > 1 {
            ArtworkShape::MultiImage
        } else {
            ArtworkShape::SingleImage
        }
    }
}

fn default_page_count() -> u32 {
    1
}

/// One frame of an animated artwork
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    /// File name inside the frame archive
    pub file: String,
    /// Display duration in milliseconds
    pub delay: u32,
}

impl FrameDescriptor {
    /// Display duration in seconds
    pub fn duration_secs(&self) -> f64 {
        f64::from(self.delay) / 1000.0
    }
}

/// Archive URLs for a frame sequence
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZipUrls {
    /// Medium-resolution frame archive
    #[serde(default)]
    pub medium: Option<String>,
}

/// Frame-sequence metadata: where the frames live and how long each is shown
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UgoiraMetadata {
    /// Archive locations
    #[serde(default)]
    pub zip_urls: ZipUrls,
    /// Frames in playback order
    #[serde(default)]
    pub frames: Vec<FrameDescriptor>,
}

/// Acknowledgement returned by the coordinator when work is dispatched
///
/// Carries no per-item outcome; results are only visible in logs and on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DispatchReceipt {
    /// Number of distinct artworks dispatched
    pub dispatched: usize,
    /// The distinct artwork ids, ascending
    pub ids: Vec<ArtworkId>,
}

impl DispatchReceipt {
    /// Human-readable acknowledgement for a tool host
    pub fn message(&self) -> String {
        format!(
            "Dispatched {} artwork download(s) in the background",
            self.dispatched
        )
    }
}

/// One unit of background work, owned exclusively by its task
#[derive(Clone, Debug)]
pub struct DownloadTask {
    /// Artwork to download
    pub id: ArtworkId,
    /// Download root captured at dispatch time
    pub root: PathBuf,
    /// File name template captured at dispatch time
    pub template: FilenameTemplate,
}

/// Capabilities of the running coordinator
#[derive(Clone, Debug, Serialize)]
pub struct Capabilities {
    /// Whether animated artworks can be converted to GIF
    pub frame_sequences: bool,
    /// Name of the active frame encoder
    pub encoder: &'static str,
}
