//! Local persistence for mural wallpaper records.
//!
//! This crate provides SQLite-based storage for imported wallpaper
//! images and the persisted sync state: one record per `(date,
//! image_url)` identity with insert-or-replace semantics, plus a
//! single-row table holding the last sync date and daily-mode state.
//!
//! # Example
//!
//! ```no_run
//! use mural_store::Store;
//!
//! let store = Store::open_default()?;
//! if let Some(newest) = store.most_recent_image()? {
//!     println!("{}: {}", newest.date, newest.headline);
//! }
//! # Ok::<(), mural_store::Error>(())
//! ```

mod error;
mod models;
mod schema;
mod store;

pub use error::{Error, Result};
pub use models::{ImageKey, StoredImage, SyncState};
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/mural/mural.db`
/// - macOS: `~/Library/Application Support/mural/mural.db`
/// - Windows: `C:\Users\<user>\AppData\Local\mural\mural.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("mural")
        .join("mural.db")
}
