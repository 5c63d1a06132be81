//! Mock feed implementation for testing.
//!
//! [`MockFeed`] implements [`ImageFeed`] over in-memory state so the
//! sync engine can be exercised without a network. It models the real
//! feed's retained-history cap, supports failure injection for the
//! metadata path, and treats an unregistered image URL as absent
//! (the same signal a 404 produces).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use time::Date;
use tokio::sync::RwLock;

use mural_types::FeedEntry;

use crate::client::ImageFeed;
use crate::error::{Error, Result};
use crate::window::HISTORY_DEPTH;

/// An in-memory feed for tests.
#[derive(Default)]
pub struct MockFeed {
    entries: RwLock<Vec<FeedEntry>>,
    images: RwLock<HashMap<String, Bytes>>,
    fail_metadata: AtomicBool,
    metadata_calls: AtomicU32,
    image_calls: AtomicU32,
}

impl MockFeed {
    /// Create an empty mock feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an entry, keeping the list newest-first.
    ///
    /// The real feed lists one entry per day, so an entry with the same
    /// date replaces the previous one (as happens when the feed
    /// re-encodes an asset under a new URL).
    pub async fn push_entry(&self, entry: FeedEntry) {
        let mut entries = self.entries.write().await;
        entries.retain(|existing| existing.date != entry.date);
        entries.push(entry);
        entries.sort_by(|a, b| b.date.cmp(&a.date));
    }

    /// Publish a minimal entry for `date` pointing at `image_url`.
    pub async fn push_entry_for(&self, date: Date, image_url: &str) -> FeedEntry {
        let entry = FeedEntry {
            date,
            image_url: image_url.to_string(),
            copyright: format!("© Mock ({date})"),
            copyright_link: "https://example.com/search".to_string(),
            headline: format!("Mock image of {date}"),
        };
        self.push_entry(entry.clone()).await;
        entry
    }

    /// Register the bytes served for an image URL.
    pub async fn set_image(&self, url: &str, bytes: impl Into<Bytes>) {
        self.images.write().await.insert(url.to_string(), bytes.into());
    }

    /// Remove an image, simulating a URL that no longer resolves.
    pub async fn remove_image(&self, url: &str) {
        self.images.write().await.remove(url);
    }

    /// Make subsequent metadata fetches fail.
    pub fn set_fail_metadata(&self, fail: bool) {
        self.fail_metadata.store(fail, Ordering::SeqCst);
    }

    /// Number of metadata fetches performed.
    pub fn metadata_calls(&self) -> u32 {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    /// Number of image fetches performed.
    pub fn image_calls(&self) -> u32 {
        self.image_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFeed for MockFeed {
    async fn fetch_metadata(
        &self,
        days_before_today: usize,
        count: usize,
    ) -> Result<Vec<FeedEntry>> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_metadata.load(Ordering::SeqCst) {
            return Err(Error::Status {
                status: 503,
                url: "mock://feed".to_string(),
            });
        }

        let entries = self.entries.read().await;
        let retained = &entries[..entries.len().min(HISTORY_DEPTH)];
        let start = days_before_today.min(retained.len());
        let end = (start + count).min(retained.len());
        Ok(retained[start..end].to_vec())
    }

    async fn fetch_image(&self, url: &str) -> Option<Bytes> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.images.read().await.get(url).cloned()
    }
}
