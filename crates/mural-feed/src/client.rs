//! Feed client trait and HTTP implementation.

use async_trait::async_trait;
use bytes::Bytes;
use time::Date;
use tracing::{debug, warn};

use mural_types::FeedEntry;

use crate::error::{Error, Result};
use crate::window::{HISTORY_DEPTH, Page, plan};
use crate::xml::parse_feed;

/// Default feed endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.bing.com/HPImageArchive.aspx";

/// Default host prefixed to the relative `urlBase` values.
pub const DEFAULT_IMAGE_HOST: &str = "https://www.bing.com";

/// Default feed market.
pub const DEFAULT_MARKET: &str = "en-US";

/// Trait abstracting the remote image-of-the-day feed.
///
/// Implemented by [`HttpImageFeed`] for production and
/// [`crate::MockFeed`] for tests, so the sync engine can be driven by
/// either.
#[async_trait]
pub trait ImageFeed: Send + Sync {
    /// Fetch metadata for `count` entries starting `days_before_today`
    /// back, newest first.
    ///
    /// The result is de-duplicated and gap-free; requesting more than
    /// the feed retains yields at most [`HISTORY_DEPTH`] entries.
    async fn fetch_metadata(
        &self,
        days_before_today: usize,
        count: usize,
    ) -> Result<Vec<FeedEntry>>;

    /// Fetch the raw bytes of an image.
    ///
    /// Returns `None` when the URL is unreachable, answers with a
    /// non-success status, or serves content that is not a decodable
    /// image. No retry is attempted.
    async fn fetch_image(&self, url: &str) -> Option<Bytes>;
}

/// Look up the feed entry published on an exact day.
///
/// Returns `None` when the day lies outside the feed's retained
/// history or the feed no longer lists it.
pub async fn entry_for_date<F: ImageFeed + ?Sized>(
    feed: &F,
    today: Date,
    date: Date,
) -> Result<Option<FeedEntry>> {
    let days_back = (today - date).whole_days();
    if days_back < 0 || days_back as usize >= HISTORY_DEPTH {
        return Ok(None);
    }

    let entries = feed.fetch_metadata(days_back as usize, 1).await?;
    Ok(entries.into_iter().find(|entry| entry.date == date))
}

/// HTTP feed client.
///
/// Stateless apart from the connection pool; construct once and share.
pub struct HttpImageFeed {
    client: reqwest::Client,
    base_url: String,
    image_host: String,
    market: String,
}

impl HttpImageFeed {
    /// Create a client against the default endpoint.
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_BASE_URL, DEFAULT_IMAGE_HOST, DEFAULT_MARKET)
    }

    /// Create a client against a custom endpoint, image host, and market.
    pub fn with_endpoint(
        base_url: impl Into<String>,
        image_host: impl Into<String>,
        market: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            image_host: image_host.into(),
            market: market.into(),
        }
    }

    fn page_url(&self, page: Page) -> String {
        format!(
            "{}?format=xml&idx={}&n={}&mkt={}",
            self.base_url, page.idx, page.n, self.market
        )
    }

    async fn fetch_page(&self, page: Page) -> Result<Vec<FeedEntry>> {
        let url = self.page_url(page);
        debug!("Fetching feed page {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let mut entries = parse_feed(&body, &self.image_host)?;

        // Drop the clamped overlap, then cap at what this page was
        // planned to contribute (the feed may over-serve near the
        // history boundary).
        if page.skip >= entries.len() {
            entries.clear();
        } else {
            entries.drain(..page.skip);
        }
        entries.truncate(page.take());

        Ok(entries)
    }
}

impl Default for HttpImageFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFeed for HttpImageFeed {
    async fn fetch_metadata(
        &self,
        days_before_today: usize,
        count: usize,
    ) -> Result<Vec<FeedEntry>> {
        let mut entries: Vec<FeedEntry> = Vec::new();

        for page in plan(days_before_today, count) {
            for entry in self.fetch_page(page).await? {
                if !entries.iter().any(|seen| seen.date == entry.date) {
                    entries.push(entry);
                }
            }
        }

        entries.truncate(HISTORY_DEPTH);
        Ok(entries)
    }

    async fn fetch_image(&self, url: &str) -> Option<Bytes> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Image fetch failed for {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("Image fetch for {} returned HTTP {}", url, response.status());
            return None;
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Image body read failed for {}: {}", url, e);
                return None;
            }
        };

        if image::guess_format(&bytes).is_err() {
            warn!("Content at {} is not a decodable image", url);
            return None;
        }

        Some(bytes)
    }
}
