//! Artwork classification and on-disk layout
//!
//! Decides where an artwork's files go and what they are called:
//!
//! - single-page images land directly in the download root;
//! - multi-page works and animated works get a `<id> - <title>` subdirectory;
//! - file names come from a [`FilenameTemplate`], with `_p<N>` appended per
//!   page for multi-page works.
//!
//! Every path segment derived from remote or user input goes through
//! [`sanitize_filename`].

use crate::error::{Error, Result};
use crate::types::{Artwork, ArtworkShape};
use std::path::{Path, PathBuf};

/// Characters replaced by [`sanitize_filename`]
const FORBIDDEN_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Author name used when the platform sends none
const UNKNOWN_AUTHOR: &str = "UnknownAuthor";

/// Title used when the platform sends none
const UNTITLED: &str = "Untitled";

/// Replace characters that are invalid in file names with `_`
///
/// Idempotent: sanitizing an already-sanitized name returns it unchanged.
///
/// # Examples
///
/// ```
/// use pixiv_dl::planner::sanitize_filename;
///
/// assert_eq!(sanitize_filename("a/b:c?"), "a_b_c_");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// File name template with `{author}`, `{title}` and `{id}` placeholders
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilenameTemplate(String);

impl Default for FilenameTemplate {
    fn default() -> Self {
        Self("{author} - {title}_{id}".to_string())
    }
}

impl FilenameTemplate {
    /// Wrap a template string
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// The raw template
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the base file name (no page suffix, no extension) for an artwork
    ///
    /// Placeholders are substituted in a single pass; braces inside the
    /// substituted values are kept literally.
    pub fn render(&self, artwork: &Artwork) -> String {
        let mut rendered = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();

        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let tail = &rest[start..];
            let (value, consumed) = if tail.starts_with("{author}") {
                (sanitize_filename(author_name(artwork)), "{author}".len())
            } else if tail.starts_with("{title}") {
                (sanitize_filename(title(artwork)), "{title}".len())
            } else if tail.starts_with("{id}") {
                (artwork.id.to_string(), "{id}".len())
            } else {
                ("{".to_string(), 1)
            };
            rendered.push_str(&value);
            rest = &tail[consumed..];
        }
        rendered.push_str(rest);

        sanitize_filename(&rendered)
    }
}

fn author_name(artwork: &Artwork) -> &str {
    if artwork.user.name.is_empty() {
        UNKNOWN_AUTHOR
    } else {
        &artwork.user.name
    }
}

fn title(artwork: &Artwork) -> &str {
    if artwork.title.is_empty() {
        UNTITLED
    } else {
        &artwork.title
    }
}

/// One image to fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedImage {
    /// Remote URL of the original image
    pub url: String,
    /// Destination path
    pub path: PathBuf,
}

/// Where and how an artwork will be stored
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadPlan {
    /// One or more still images
    Images {
        /// Directory the images are written into
        target_dir: PathBuf,
        /// Images in page order
        files: Vec<PlannedImage>,
    },
    /// An animated work converted to a single GIF
    FrameSequence {
        /// Directory holding the GIF (and, transiently, the frame archive)
        target_dir: PathBuf,
        /// Destination of the GIF
        output: PathBuf,
    },
}

impl DownloadPlan {
    /// Directory the artwork is written into
    pub fn target_dir(&self) -> &Path {
        match self {
            DownloadPlan::Images { target_dir, .. } => target_dir,
            DownloadPlan::FrameSequence { target_dir, .. } => target_dir,
        }
    }
}

/// Name of the per-artwork subdirectory: `<id> - <title>`, sanitized
pub fn artwork_dir_name(artwork: &Artwork) -> String {
    sanitize_filename(&format!("{} - {}", artwork.id, title(artwork)))
}

/// Last path segment of a URL, ignoring any query string
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// File extension of a URL's path including the dot, or empty if none
fn extension_from_url(url: &str) -> String {
    file_name_from_url(url)
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Decide the layout for an artwork
///
/// # Errors
///
/// Returns [`Error::MalformedMetadata`] when an image URL needed by the plan
/// is missing.
pub fn plan_download(
    artwork: &Artwork,
    root: &Path,
    template: &FilenameTemplate,
) -> Result<DownloadPlan> {
    let base = template.render(artwork);

    match artwork.shape() {
        ArtworkShape::SingleImage => {
            let url = artwork
                .meta_single_page
                .original_image_url
                .clone()
                .ok_or_else(|| Error::MalformedMetadata {
                    id: artwork.id,
                    reason: "missing original image URL".to_string(),
                })?;
            let file_name = format!("{base}{}", extension_from_url(&url));

            Ok(DownloadPlan::Images {
                target_dir: root.to_path_buf(),
                files: vec![PlannedImage {
                    path: root.join(file_name),
                    url,
                }],
            })
        }
        ArtworkShape::MultiImage => {
            let target_dir = root.join(artwork_dir_name(artwork));

            if artwork.meta_pages.is_empty() {
                return Err(Error::MalformedMetadata {
                    id: artwork.id,
                    reason: format!("page_count is {} but no pages listed", artwork.page_count),
                });
            }

            let files = artwork
                .meta_pages
                .iter()
                .enumerate()
                .map(|(page, meta)| {
                    let url = meta.image_urls.original.clone().ok_or_else(|| {
                        Error::MalformedMetadata {
                            id: artwork.id,
                            reason: format!("missing original image URL for page {page}"),
                        }
                    })?;
                    let file_name = format!("{base}_p{page}{}", extension_from_url(&url));
                    Ok(PlannedImage {
                        path: target_dir.join(file_name),
                        url,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(DownloadPlan::Images { target_dir, files })
        }
        ArtworkShape::FrameSequence => {
            let target_dir = root.join(artwork_dir_name(artwork));
            Ok(DownloadPlan::FrameSequence {
                output: target_dir.join(format!("{base}.gif")),
                target_dir,
            })
        }
    }
}

/// Create a directory and its parents; succeeds if it already exists
pub async fn ensure_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        Error::Io(std::io::Error::other(format!(
            "failed to create directory {}: {}",
            path.display(),
            e
        )))
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArtworkId, ArtworkKind, Author, PageImageUrls, PageMeta, SinglePageMeta};

    fn artwork(id: u64, title: &str, kind: ArtworkKind, pages: u32) -> Artwork {
        let meta_pages = if pages > 1 {
            (0..pages)
                .map(|p| PageMeta {
                    image_urls: PageImageUrls {
                        original: Some(format!(
                            "https://i.pximg.net/img-original/img/2024/01/01/00/00/00/{id}_p{p}.png"
                        )),
                    },
                })
                .collect()
        } else {
            Vec::new()
        };
        Artwork {
            id: ArtworkId(id),
            title: title.to_string(),
            kind,
            user: Author {
                id: 9,
                name: "Painter".to_string(),
                account: "painter".to_string(),
            },
            page_count: pages,
            meta_single_page: SinglePageMeta {
                original_image_url: (pages == 1).then(|| {
                    format!("https://i.pximg.net/img-original/img/2024/01/01/00/00/00/{id}_p0.jpg")
                }),
            },
            meta_pages,
        }
    }

    #[test]
    fn sanitize_replaces_every_forbidden_char() {
        assert_eq!(sanitize_filename(r#"a\b/c*d?e:f"g<h>i|j"#), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("plain name"), "plain name");
        assert_eq!(sanitize_filename("夏の日"), "夏の日");
    }

    #[test]
    fn sanitize_is_idempotent_and_clean() {
        let inputs = [
            "",
            "////",
            "what? who: me|you",
            r#""quoted" <tag> \path\"#,
            "ok_already_clean",
            "混合/テキスト?",
        ];
        for input in inputs {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once, "not idempotent for {input:?}");
            assert!(
                !once.chars().any(|c| FORBIDDEN_CHARS.contains(&c)),
                "{once:?} still has forbidden characters"
            );
            assert_eq!(once.chars().count(), input.chars().count());
        }
    }

    #[test]
    fn template_renders_and_sanitizes() {
        let mut art = artwork(101, "Sky/Sea?", ArtworkKind::Illust, 1);
        art.user.name = "A:B".into();

        let default = FilenameTemplate::default();
        assert_eq!(default.render(&art), "A_B - Sky_Sea__101");

        let custom = FilenameTemplate::new("{id}/{title}");
        assert_eq!(custom.render(&art), "101_Sky_Sea_");
    }

    #[test]
    fn placeholders_inside_remote_values_stay_literal() {
        let mut art = artwork(7, "Sky", ArtworkKind::Illust, 1);
        art.user.name = "{title}{id}".into();
        assert_eq!(
            FilenameTemplate::default().render(&art),
            "{title}{id} - Sky_7"
        );

        let mut art = artwork(8, "{author}", ArtworkKind::Illust, 1);
        art.user.name = "Painter".into();
        assert_eq!(
            FilenameTemplate::default().render(&art),
            "Painter - {author}_8"
        );
    }

    #[test]
    fn unknown_braces_in_template_are_kept() {
        let art = artwork(9, "Sky", ArtworkKind::Illust, 1);
        let template = FilenameTemplate::new("{{id}} {page} {");
        assert_eq!(template.render(&art), "{9} {page} {");
    }

    #[test]
    fn template_falls_back_for_missing_names() {
        let mut art = artwork(5, "", ArtworkKind::Illust, 1);
        art.user.name = String::new();
        assert_eq!(
            FilenameTemplate::default().render(&art),
            "UnknownAuthor - Untitled_5"
        );
    }

    #[test]
    fn single_page_lands_in_root() {
        let art = artwork(101, "One", ArtworkKind::Illust, 1);
        let root = Path::new("/downloads");
        let plan = plan_download(&art, root, &FilenameTemplate::default()).unwrap();

        assert_eq!(plan.target_dir(), root);
        match plan {
            DownloadPlan::Images { files, .. } => {
                assert_eq!(files.len(), 1);
                assert_eq!(files[0].path, root.join("Painter - One_101.jpg"));
                assert!(files[0].url.ends_with("101_p0.jpg"));
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn multi_page_gets_subdirectory_with_id_and_title() {
        let art = artwork(202, "Many: pages", ArtworkKind::Manga, 3);
        let root = Path::new("/downloads");
        let plan = plan_download(&art, root, &FilenameTemplate::default()).unwrap();

        let target = plan.target_dir().to_path_buf();
        assert_eq!(target.parent().unwrap(), root);
        let dir_name = target.file_name().unwrap().to_string_lossy().to_string();
        assert!(dir_name.contains("202"));
        assert!(dir_name.contains("Many_ pages"));

        match plan {
            DownloadPlan::Images { files, .. } => {
                let names: Vec<_> = files
                    .iter()
                    .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
                    .collect();
                assert_eq!(
                    names,
                    vec![
                        "Painter - Many_ pages_202_p0.png",
                        "Painter - Many_ pages_202_p1.png",
                        "Painter - Many_ pages_202_p2.png",
                    ]
                );
                assert!(files.iter().all(|f| f.path.parent().unwrap() == target.as_path()));
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn frame_sequence_gets_subdirectory_and_gif() {
        let art = artwork(44298467, "Loop", ArtworkKind::Ugoira, 1);
        let root = Path::new("/downloads");
        let plan = plan_download(&art, root, &FilenameTemplate::default()).unwrap();

        match plan {
            DownloadPlan::FrameSequence { target_dir, output } => {
                assert_eq!(target_dir, root.join("44298467 - Loop"));
                assert_eq!(output, target_dir.join("Painter - Loop_44298467.gif"));
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn missing_urls_are_malformed_metadata() {
        let mut single = artwork(1, "x", ArtworkKind::Illust, 1);
        single.meta_single_page.original_image_url = None;
        assert!(matches!(
            plan_download(&single, Path::new("/d"), &FilenameTemplate::default()),
            Err(Error::MalformedMetadata { .. })
        ));

        let mut multi = artwork(2, "y", ArtworkKind::Illust, 2);
        multi.meta_pages[1].image_urls.original = None;
        assert!(matches!(
            plan_download(&multi, Path::new("/d"), &FilenameTemplate::default()),
            Err(Error::MalformedMetadata { .. })
        ));

        let mut empty = artwork(3, "z", ArtworkKind::Manga, 2);
        empty.meta_pages.clear();
        assert!(matches!(
            plan_download(&empty, Path::new("/d"), &FilenameTemplate::default()),
            Err(Error::MalformedMetadata { .. })
        ));
    }

    #[test]
    fn url_helpers_ignore_query() {
        assert_eq!(
            file_name_from_url("https://i.pximg.net/img-zip-ugoira/img/1_ugoira600x600.zip?x=1")
                .as_deref(),
            Some("1_ugoira600x600.zip")
        );
        assert_eq!(extension_from_url("https://i.pximg.net/a/b.png"), ".png");
        assert_eq!(extension_from_url("https://i.pximg.net/a/noext"), "");
        assert_eq!(file_name_from_url("https://i.pximg.net/"), None);
        assert_eq!(file_name_from_url("not a url"), None);
    }

    #[tokio::test]
    async fn ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).await.unwrap();
        ensure_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
