//! App API payloads, frame archives and a test encoder

use async_trait::async_trait;
use pixiv_dl::ArtworkId;
use pixiv_dl::synthesis::{EncoderCapabilities, FrameEncoder};
use serde_json::json;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use wiremock::MockServer;

/// Illustration detail response for a single-page work hosted on `server`
pub fn single_page_detail(server: &MockServer, id: u64, title: &str) -> serde_json::Value {
    json!({
        "illust": {
            "id": id,
            "title": title,
            "type": "illust",
            "page_count": 1,
            "user": {"id": 2088434, "name": "Painter", "account": "painter"},
            "meta_single_page": {
                "original_image_url": format!("{}/img-original/img/{id}_p0.jpg", server.uri())
            },
            "meta_pages": []
        }
    })
}

/// Illustration detail response for a multi-page work hosted on `server`
pub fn multi_page_detail(server: &MockServer, id: u64, title: &str, pages: u32) -> serde_json::Value {
    let meta_pages: Vec<_> = (0..pages)
        .map(|p| {
            json!({
                "image_urls": {
                    "original": format!("{}/img-original/img/{id}_p{p}.png", server.uri())
                }
            })
        })
        .collect();
    json!({
        "illust": {
            "id": id,
            "title": title,
            "type": "manga",
            "page_count": pages,
            "user": {"id": 2088434, "name": "Painter", "account": "painter"},
            "meta_single_page": {},
            "meta_pages": meta_pages
        }
    })
}

/// Illustration detail response for an animated work
pub fn ugoira_detail(id: u64, title: &str) -> serde_json::Value {
    json!({
        "illust": {
            "id": id,
            "title": title,
            "type": "ugoira",
            "page_count": 1,
            "user": {"id": 2088434, "name": "Painter", "account": "painter"},
            "meta_single_page": {},
            "meta_pages": []
        }
    })
}

/// Ugoira metadata response with `frames` frames at 80ms each
pub fn ugoira_metadata_body(server: &MockServer, id: u64, frames: usize) -> serde_json::Value {
    let frames: Vec<_> = (0..frames)
        .map(|i| json!({"file": format!("{i:06}.jpg"), "delay": 80}))
        .collect();
    json!({
        "ugoira_metadata": {
            "zip_urls": {
                "medium": format!("{}/img-zip-ugoira/img/{id}_ugoira600x600.zip", server.uri())
            },
            "frames": frames
        }
    })
}

/// ZIP archive holding `count` frames named `000000.jpg`, `000001.jpg`, ...
pub fn frame_archive(count: usize) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for i in 0..count {
        writer
            .start_file(format!("{i:06}.jpg"), zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(format!("frame {i}").as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Encoder that checks the manifest exists and writes a stub GIF
#[derive(Default)]
pub struct StubGifEncoder {
    pub calls: AtomicU32,
}

#[async_trait]
impl FrameEncoder for StubGifEncoder {
    async fn encode(
        &self,
        _id: ArtworkId,
        work_dir: &Path,
        manifest: &Path,
        output: &Path,
    ) -> pixiv_dl::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(work_dir.join(manifest).is_file(), "manifest missing");
        tokio::fs::write(output, b"GIF89a").await?;
        Ok(())
    }

    fn capabilities(&self) -> EncoderCapabilities {
        EncoderCapabilities { can_encode: true }
    }

    fn name(&self) -> &'static str {
        "stub-gif"
    }
}
