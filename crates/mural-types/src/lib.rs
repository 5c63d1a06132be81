//! Core types for the mural daily-wallpaper feed.
//!
//! This crate holds the domain types shared by the feed client, the
//! local store, and the sync engine: feed entries, wallpaper surfaces
//! and slots, calendar-date codecs, and the cache file naming rule.
//!
//! It deliberately knows nothing about HTTP, SQLite, or any wallpaper
//! backend; those live in the sibling crates.

pub mod dates;
mod error;
mod types;

pub use error::{ParseError, ParseResult};
pub use types::{FeedEntry, WallpaperId, WallpaperSlot, WallpaperSurface, image_file_name};
