//! In-memory [`PixivApi`] and [`SessionRefresher`] for unit tests

use super::PixivApi;
use crate::error::{ApiError, Error, Result};
use crate::session::SessionRefresher;
use crate::types::{
    Artwork, ArtworkId, ArtworkKind, Author, FrameDescriptor, PageImageUrls, PageMeta,
    SinglePageMeta, UgoiraMetadata, ZipUrls,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

pub(crate) const FAKE_HOST: &str = "https://i.pximg.net";

/// Scripted remote API
#[derive(Default)]
pub(crate) struct FakeApi {
    artworks: Mutex<HashMap<ArtworkId, Artwork>>,
    ugoira: Mutex<HashMap<ArtworkId, UgoiraMetadata>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    recommended: Mutex<Vec<Artwork>>,
    /// Number of upcoming calls that fail with an expired session
    expire_next: AtomicU32,
    /// Held closed until the test adds permits
    gate: Option<Semaphore>,
    detail_delay: Duration,
    pub detail_calls: AtomicU32,
    pub download_calls: AtomicU32,
    pub completed_details: AtomicU32,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every detail call waits until [`open_gate`](Self::open_gate)
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn with_detail_delay(mut self, delay: Duration) -> Self {
        self.detail_delay = delay;
        self
    }

    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn expire_next_calls(&self, n: u32) {
        self.expire_next.store(n, Ordering::SeqCst);
    }

    pub fn add_artwork(&self, artwork: Artwork) {
        self.artworks.lock().unwrap().insert(artwork.id, artwork);
    }

    pub fn add_file(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.files.lock().unwrap().insert(url.into(), body.into());
    }

    pub fn add_ugoira(&self, id: ArtworkId, metadata: UgoiraMetadata) {
        self.ugoira.lock().unwrap().insert(id, metadata);
    }

    pub fn set_recommended(&self, artworks: Vec<Artwork>) {
        *self.recommended.lock().unwrap() = artworks;
    }

    /// Register a single-page illustration and its image
    pub fn add_single(&self, id: u64, title: &str) -> String {
        let url = format!("{FAKE_HOST}/img-original/img/{id}_p0.jpg");
        self.add_artwork(artwork(id, title, ArtworkKind::Illust, 1));
        self.add_file(url.clone(), format!("image {id}"));
        url
    }

    /// Register a multi-page work and all its images
    pub fn add_multi(&self, id: u64, title: &str, pages: u32) {
        let art = artwork(id, title, ArtworkKind::Manga, pages);
        for page in &art.meta_pages {
            if let Some(url) = &page.image_urls.original {
                self.add_file(url.clone(), format!("page of {id}"));
            }
        }
        self.add_artwork(art);
    }

    fn take_expiry(&self) -> Result<()> {
        let expired = self
            .expire_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if expired {
            return Err(Error::Api(ApiError::SessionExpired {
                message: "Error occurred at the OAuth process. invalid_grant".to_string(),
                reason: String::new(),
            }));
        }
        Ok(())
    }
}

/// Build artwork metadata pointing at [`FAKE_HOST`]
pub(crate) fn artwork(id: u64, title: &str, kind: ArtworkKind, pages: u32) -> Artwork {
    let meta_pages = if pages > 1 {
        (0..pages)
            .map(|p| PageMeta {
                image_urls: PageImageUrls {
                    original: Some(format!("{FAKE_HOST}/img-original/img/{id}_p{p}.png")),
                },
            })
            .collect()
    } else {
        Vec::new()
    };
    let single = (pages == 1 && kind != ArtworkKind::Ugoira)
        .then(|| format!("{FAKE_HOST}/img-original/img/{id}_p0.jpg"));

    Artwork {
        id: ArtworkId(id),
        title: title.to_string(),
        kind,
        user: Author {
            id: 42,
            name: "Painter".to_string(),
            account: "painter".to_string(),
        },
        page_count: pages,
        meta_single_page: SinglePageMeta {
            original_image_url: single,
        },
        meta_pages,
    }
}

/// Frame metadata for `frames` JPEG frames at 100ms each
pub(crate) fn ugoira_metadata(id: u64, frames: usize) -> UgoiraMetadata {
    UgoiraMetadata {
        zip_urls: ZipUrls {
            medium: Some(ugoira_zip_url(id)),
        },
        frames: (0..frames)
            .map(|i| FrameDescriptor {
                file: format!("{i:06}.jpg"),
                delay: 100,
            })
            .collect(),
    }
}

pub(crate) fn ugoira_zip_url(id: u64) -> String {
    format!("{FAKE_HOST}/img-zip-ugoira/img/{id}_ugoira600x600.zip")
}

#[async_trait]
impl PixivApi for FakeApi {
    async fn illust_detail(&self, id: ArtworkId) -> Result<Artwork> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.take_expiry()?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            // Returning the permit lets the next waiter through
            let _permit = gate.acquire().await;
        }
        if !self.detail_delay.is_zero() {
            tokio::time::sleep(self.detail_delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed_details.fetch_add(1, Ordering::SeqCst);

        self.artworks
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| {
                Error::Api(ApiError::Rejected {
                    message: "Artwork not found".to_string(),
                    reason: String::new(),
                })
            })
    }

    async fn ugoira_metadata(&self, id: ArtworkId) -> Result<UgoiraMetadata> {
        self.take_expiry()?;
        self.ugoira.lock().unwrap().get(&id).cloned().ok_or_else(|| {
            Error::Api(ApiError::Rejected {
                message: "Artwork not found".to_string(),
                reason: String::new(),
            })
        })
    }

    async fn illust_recommended(&self) -> Result<Vec<Artwork>> {
        self.take_expiry()?;
        Ok(self.recommended.lock().unwrap().clone())
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.take_expiry()?;
        let body = self.files.lock().unwrap().get(url).cloned();
        match body {
            Some(body) => {
                tokio::fs::write(dest, &body).await?;
                Ok(body.len() as u64)
            }
            None => Err(Error::Api(ApiError::Status {
                status: 404,
                url: url.to_string(),
            })),
        }
    }
}

/// Refresher that counts calls and optionally fails
#[derive(Default)]
pub(crate) struct FakeRefresher {
    pub calls: AtomicU32,
    fail: AtomicBool,
}

impl FakeRefresher {
    pub fn failing() -> Self {
        let refresher = Self::default();
        refresher.fail.store(true, Ordering::SeqCst);
        refresher
    }
}

#[async_trait]
impl SessionRefresher for FakeRefresher {
    async fn refresh_session(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Other("refresh rejected".to_string()));
        }
        Ok(())
    }
}
