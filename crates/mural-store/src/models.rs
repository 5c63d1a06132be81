//! Data models for stored data.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use mural_types::WallpaperSurface;

/// One imported wallpaper record.
///
/// Identity is the `(date, image_url)` pair; storing a record with an
/// existing identity replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredImage {
    /// Publication day of the image.
    #[serde(with = "mural_types::dates::serde_iso")]
    pub date: Date,
    /// Canonical remote URL of the image.
    pub image_url: String,
    /// Locator of the locally cached copy.
    pub local_path: String,
    /// Copyright attribution text.
    pub copyright: String,
    /// Link backing the copyright attribution.
    pub copyright_link: String,
    /// Short human-readable headline.
    pub headline: String,
    /// When this record was imported.
    #[serde(with = "time::serde::rfc3339")]
    pub imported_at: OffsetDateTime,
}

/// The identity and file locator of a record, as used by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageKey {
    /// Publication day of the image.
    #[serde(with = "mural_types::dates::serde_iso")]
    pub date: Date,
    /// Canonical remote URL of the image.
    pub image_url: String,
    /// Locator of the locally cached copy.
    pub local_path: String,
}

/// Persisted synchronization and daily-mode state.
///
/// Stored as a single row; read at the start of every cycle and
/// written at the end, always behind the store lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncState {
    /// Day of the last successful sync.
    #[serde(with = "mural_types::dates::serde_iso::option")]
    pub last_sync_date: Option<Date>,
    /// Whether daily wallpaper mode is armed.
    pub daily_mode_on: bool,
    /// The surface(s) daily mode manages.
    pub target: WallpaperSurface,
    /// Identity of the last home wallpaper this app applied.
    pub recorded_home_id: Option<i32>,
    /// Identity of the last lock wallpaper this app applied.
    pub recorded_lock_id: Option<i32>,
    /// Day of the last daily-mode wallpaper application.
    #[serde(with = "mural_types::dates::serde_iso::option")]
    pub last_applied_date: Option<Date>,
}

impl Default for SyncState {
    fn default() -> Self {
        Self {
            last_sync_date: None,
            daily_mode_on: false,
            target: WallpaperSurface::Home,
            recorded_home_id: None,
            recorded_lock_id: None,
            last_applied_date: None,
        }
    }
}

impl SyncState {
    /// The recorded identity for the slot drift detection tracks.
    pub fn tracked_id(&self) -> Option<i32> {
        match self.target.tracking_slot() {
            mural_types::WallpaperSlot::Home => self.recorded_home_id,
            mural_types::WallpaperSlot::Lock => self.recorded_lock_id,
        }
    }

    /// Clear all daily-mode bookkeeping, leaving the sync date alone.
    pub fn clear_daily_mode(&mut self) {
        self.daily_mode_on = false;
        self.recorded_home_id = None;
        self.recorded_lock_id = None;
        self.last_applied_date = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    #[test]
    fn test_sync_state_default() {
        let state = SyncState::default();
        assert!(state.last_sync_date.is_none());
        assert!(!state.daily_mode_on);
        assert_eq!(state.target, WallpaperSurface::Home);
    }

    #[test]
    fn test_tracked_id_follows_target() {
        let mut state = SyncState {
            recorded_home_id: Some(11),
            recorded_lock_id: Some(22),
            ..SyncState::default()
        };

        state.target = WallpaperSurface::Home;
        assert_eq!(state.tracked_id(), Some(11));
        state.target = WallpaperSurface::Lock;
        assert_eq!(state.tracked_id(), Some(22));
        state.target = WallpaperSurface::Both;
        assert_eq!(state.tracked_id(), Some(11));
    }

    #[test]
    fn test_clear_daily_mode_keeps_sync_date() {
        let date = Date::from_calendar_date(2021, Month::May, 1).unwrap();
        let mut state = SyncState {
            last_sync_date: Some(date),
            daily_mode_on: true,
            recorded_home_id: Some(7),
            last_applied_date: Some(date),
            ..SyncState::default()
        };

        state.clear_daily_mode();
        assert!(!state.daily_mode_on);
        assert!(state.recorded_home_id.is_none());
        assert!(state.last_applied_date.is_none());
        assert_eq!(state.last_sync_date, Some(date));
    }

    #[test]
    fn test_sync_state_serde() {
        let state = SyncState {
            last_sync_date: Some(Date::from_calendar_date(2021, Month::May, 2).unwrap()),
            daily_mode_on: true,
            target: WallpaperSurface::Both,
            recorded_home_id: Some(3),
            recorded_lock_id: None,
            last_applied_date: None,
        };

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"2021-05-02\""));
        assert!(json.contains("\"both\""));
        let back: SyncState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
