//! Remote image-of-the-day feed client.
//!
//! This crate translates day-offset windows into feed metadata and
//! fetches raw image bytes by URL. The feed has three documented
//! constraints the windowing logic is built around:
//!
//! - at most [`PAGE_LIMIT`] entries per request,
//! - a retained trailing history of [`HISTORY_DEPTH`] entries,
//! - request offsets above [`IDX_CLAMP`] silently clamp to the clamp
//!   value, so deeper pages overlap and the caller must discard the
//!   duplicated head of each response.
//!
//! [`HttpImageFeed`] is the production client; [`MockFeed`] provides an
//! in-memory stand-in for tests. Both implement [`ImageFeed`], which is
//! the seam the sync engine is written against.
//!
//! No retry policy lives here: a failed request surfaces as an error
//! (metadata) or an absent image (bytes), and the caller decides.

mod client;
mod error;
mod mock;
mod window;
mod xml;

pub use client::{
    DEFAULT_BASE_URL, DEFAULT_IMAGE_HOST, DEFAULT_MARKET, HttpImageFeed, ImageFeed, entry_for_date,
};
pub use error::{Error, Result};
pub use mock::MockFeed;
pub use window::{HISTORY_DEPTH, IDX_CLAMP, PAGE_LIMIT, Page, plan};
