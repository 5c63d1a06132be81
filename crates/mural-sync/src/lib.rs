//! Background wallpaper sync engine and daily-mode daemon.
//!
//! This crate ties the feed client and the local store together:
//!
//! - [`SyncEngine`] brings the store up to date with the remote feed
//!   (`sync_latest`), repairs or removes records whose cached file went
//!   missing (`reconcile_existing_records`), and hands the newest image
//!   to the refresh policy.
//! - [`RefreshPolicy`] decides whether daily mode still owns the device
//!   wallpaper and applies the newest image when a new day starts.
//! - [`TriggerSource`] abstracts *when* cycles run; the engine assumes
//!   nothing about scheduling beyond at-most-one concurrent cycle
//!   (extra triggers are ignored while one is in flight).
//!
//! # Configuration
//!
//! The daemon reads `~/.config/mural/config.toml`:
//!
//! ```toml
//! [feed]
//! market = "en-US"
//!
//! [storage]
//! database = "~/.local/share/mural/mural.db"
//! image_dir = "~/.local/share/mural/images"
//!
//! [daemon]
//! sync_interval = 3600
//!
//! [wallpaper]
//! target = "home"
//! display_width = 1920
//! display_height = 1080
//! apply_command = "swaybg -i $MURAL_WALLPAPER"
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod policy;
pub mod state;
pub mod trigger;
pub mod wallpaper;

pub use cache::{CacheError, ImageCache};
pub use config::{Config, ConfigError, DaemonConfig, FeedConfig, StorageConfig, WallpaperConfig};
pub use engine::{CycleSummary, EngineError, RecordStatus, SyncEngine};
pub use policy::{RefreshOutcome, RefreshPolicy};
pub use state::{AppState, SyncEvent};
pub use trigger::{IntervalTrigger, Trigger, TriggerSource, run_triggered};
pub use wallpaper::{
    CommandWallpaper, CropRect, MockWallpaper, WallpaperBackend, WallpaperError,
};
