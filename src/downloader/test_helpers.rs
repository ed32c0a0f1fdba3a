//! Shared test helpers for creating ArtworkDownloader instances in tests.

use crate::config::Config;
use crate::downloader::ArtworkDownloader;
use crate::remote::fake::{FakeApi, FakeRefresher};
use crate::synthesis::FrameEncoder;
use std::sync::Arc;
use tempfile::tempdir;

/// Everything a downloader test needs to observe
pub(crate) struct TestDownloader {
    pub downloader: ArtworkDownloader,
    pub api: Arc<FakeApi>,
    pub refresher: Arc<FakeRefresher>,
    /// Keeps the download root alive
    pub temp_dir: tempfile::TempDir,
}

/// Helper to create a test ArtworkDownloader over an in-memory API.
pub(crate) fn create_test_downloader(
    api: FakeApi,
    encoder: Arc<dyn FrameEncoder>,
    max_concurrent_downloads: usize,
) -> TestDownloader {
    create_test_downloader_with_refresher(
        api,
        FakeRefresher::default(),
        encoder,
        max_concurrent_downloads,
    )
}

pub(crate) fn create_test_downloader_with_refresher(
    api: FakeApi,
    refresher: FakeRefresher,
    encoder: Arc<dyn FrameEncoder>,
    max_concurrent_downloads: usize,
) -> TestDownloader {
    let temp_dir = tempdir().unwrap();

    let mut config = Config::default();
    config.download.download_dir = temp_dir.path().join("downloads");
    config.download.max_concurrent_downloads = max_concurrent_downloads;
    std::fs::create_dir_all(&config.download.download_dir).unwrap();

    let api = Arc::new(api);
    let refresher = Arc::new(refresher);
    let downloader =
        ArtworkDownloader::with_components(config, api.clone(), refresher.clone(), encoder);

    TestDownloader {
        downloader,
        api,
        refresher,
        temp_dir,
    }
}
