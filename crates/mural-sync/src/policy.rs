//! Daily wallpaper refresh policy.
//!
//! The policy is a two-state machine over the persisted
//! [`SyncState`]: **Idle** (daily mode off, device changes ignored) and
//! **Armed** (daily mode on). While armed, each cycle first checks that
//! this app still owns the wallpaper: the device-reported identity of
//! the tracked slot must match the identity recorded at the last apply,
//! and the configured target surface must be unchanged. Any mismatch is
//! drift: the policy disarms itself and records the externally observed
//! identities. Only when ownership holds and today's image has not been
//! applied yet does it crop and apply the newest record.
//!
//! Idle → Armed happens only through [`RefreshPolicy::arm`], driven by
//! an explicit user action.

use std::path::Path;
use std::sync::Arc;

use image::GenericImageView;
use time::Date;
use tracing::{debug, info, warn};

use mural_store::{StoredImage, SyncState};
use mural_types::{WallpaperSlot, WallpaperSurface};

use crate::wallpaper::{WallpaperBackend, WallpaperError, crop_for_slot};

/// Outcome of one armed-cycle evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Daily mode is off; nothing was examined.
    Idle,
    /// Ownership was lost (manual change or target change); daily mode
    /// was disarmed.
    Drift,
    /// The device currently refuses wallpaper changes; state untouched.
    NotAllowed,
    /// Today's image is already on the device.
    AlreadyApplied,
    /// The store holds no image to apply yet.
    NoImage,
    /// The newest image was applied.
    Applied {
        /// Publication day of the applied image.
        date: Date,
        /// Identity the device assigned to the tracked slot.
        id: i32,
    },
}

/// The wallpaper refresh decision logic.
pub struct RefreshPolicy {
    backend: Arc<dyn WallpaperBackend>,
}

impl RefreshPolicy {
    /// Create a policy over a wallpaper backend.
    pub fn new(backend: Arc<dyn WallpaperBackend>) -> Self {
        Self { backend }
    }

    /// Arm daily mode for the configured surface.
    ///
    /// Clears all previous bookkeeping so the first armed cycle applies
    /// unconditionally (there is no recorded identity to drift from).
    pub fn arm(state: &mut SyncState, configured: WallpaperSurface) {
        state.clear_daily_mode();
        state.daily_mode_on = true;
        state.target = configured;
    }

    /// Disarm daily mode.
    pub fn disarm(state: &mut SyncState) {
        state.clear_daily_mode();
    }

    /// Run one cycle of the state machine.
    ///
    /// Mutates `state` only for the `Drift` and `Applied` outcomes; the
    /// caller persists it exactly then. An apply failure surfaces as an
    /// error with `state` untouched, so the next cycle retries.
    pub fn evaluate(
        &self,
        state: &mut SyncState,
        configured: WallpaperSurface,
        today: Date,
        newest: Option<&StoredImage>,
    ) -> Result<RefreshOutcome, WallpaperError> {
        if !state.daily_mode_on {
            return Ok(RefreshOutcome::Idle);
        }

        if self.detect_drift(state, configured) {
            info!("Wallpaper changed outside daily mode; disarming");
            state.clear_daily_mode();
            state.recorded_home_id = self.backend.current_id(WallpaperSlot::Home);
            state.recorded_lock_id = self.backend.current_id(WallpaperSlot::Lock);
            return Ok(RefreshOutcome::Drift);
        }

        if !self.backend.set_allowed() {
            debug!("Wallpaper changes not permitted; will retry next cycle");
            return Ok(RefreshOutcome::NotAllowed);
        }

        if state.last_applied_date == Some(today) {
            return Ok(RefreshOutcome::AlreadyApplied);
        }

        let Some(image) = newest else {
            debug!("No stored image to apply yet");
            return Ok(RefreshOutcome::NoImage);
        };

        let decoded = load_image(Path::new(&image.local_path))?;
        let (width, height) = decoded.dimensions();
        let display = self.backend.display_size();

        let mut home_id = None;
        let mut lock_id = None;
        for slot in configured.slots() {
            let crop = crop_for_slot(*slot, width, height, display);
            let id = self.backend.apply(&decoded, crop, *slot)?;
            match slot {
                WallpaperSlot::Home => home_id = Some(id),
                WallpaperSlot::Lock => lock_id = Some(id),
            }
        }

        state.target = configured;
        state.recorded_home_id = home_id;
        state.recorded_lock_id = lock_id;
        state.last_applied_date = Some(today);

        let id = state.tracked_id().unwrap_or_default();
        info!("Applied wallpaper of {} to {} (id {})", image.date, configured, id);
        Ok(RefreshOutcome::Applied { date: image.date, id })
    }

    /// Whether ownership of the wallpaper has been lost since the last
    /// apply. Never drifts before the first apply.
    fn detect_drift(&self, state: &SyncState, configured: WallpaperSurface) -> bool {
        let Some(recorded) = state.tracked_id() else {
            return false;
        };

        if configured != state.target {
            return true;
        }

        match self.backend.current_id(state.target.tracking_slot()) {
            Some(current) => current != recorded,
            // Backend cannot observe the live identity; assume ownership.
            None => false,
        }
    }
}

fn load_image(path: &Path) -> Result<image::DynamicImage, WallpaperError> {
    let bytes = std::fs::read(path).map_err(|e| {
        warn!("Cached wallpaper missing at {}", path.display());
        WallpaperError::ReadImage {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    Ok(image::load_from_memory(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallpaper::MockWallpaper;
    use std::sync::Arc;
    use time::{Date, Month};

    fn day(d: u8) -> Date {
        Date::from_calendar_date(2021, Month::June, d).unwrap()
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn stored_image(dir: &Path, d: u8) -> StoredImage {
        let path = dir.join(format!("2021060{d}.png"));
        std::fs::write(&path, png_bytes(192, 108)).unwrap();
        StoredImage {
            date: day(d),
            image_url: format!("mock://{d}"),
            local_path: path.to_string_lossy().into_owned(),
            copyright: "© Test".to_string(),
            copyright_link: "https://example.com".to_string(),
            headline: "Test".to_string(),
            imported_at: time::OffsetDateTime::now_utc(),
        }
    }

    fn armed_setup(
        target: WallpaperSurface,
    ) -> (Arc<MockWallpaper>, RefreshPolicy, SyncState) {
        let backend = Arc::new(MockWallpaper::new(1920, 1080));
        let policy = RefreshPolicy::new(backend.clone());
        let mut state = SyncState::default();
        RefreshPolicy::arm(&mut state, target);
        (backend, policy, state)
    }

    #[test]
    fn test_idle_does_nothing() {
        let backend = Arc::new(MockWallpaper::new(1920, 1080));
        let policy = RefreshPolicy::new(backend.clone());
        let mut state = SyncState::default();

        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Home, day(1), None)
            .unwrap();
        assert_eq!(outcome, RefreshOutcome::Idle);
        assert!(backend.applied().is_empty());
    }

    #[test]
    fn test_first_armed_cycle_applies() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, policy, mut state) = armed_setup(WallpaperSurface::Home);
        let image = stored_image(dir.path(), 1);

        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Home, day(1), Some(&image))
            .unwrap();

        let RefreshOutcome::Applied { date, id } = outcome else {
            panic!("expected Applied, got {outcome:?}");
        };
        assert_eq!(date, day(1));
        assert_eq!(state.recorded_home_id, Some(id));
        assert_eq!(state.last_applied_date, Some(day(1)));
        assert_eq!(backend.applied().len(), 1);
    }

    #[test]
    fn test_second_cycle_same_day_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, policy, mut state) = armed_setup(WallpaperSurface::Home);
        let image = stored_image(dir.path(), 1);

        policy
            .evaluate(&mut state, WallpaperSurface::Home, day(1), Some(&image))
            .unwrap();
        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Home, day(1), Some(&image))
            .unwrap();

        assert_eq!(outcome, RefreshOutcome::AlreadyApplied);
        assert_eq!(backend.applied().len(), 1);
    }

    #[test]
    fn test_new_day_reapplies() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, policy, mut state) = armed_setup(WallpaperSurface::Home);
        let image = stored_image(dir.path(), 1);

        policy
            .evaluate(&mut state, WallpaperSurface::Home, day(1), Some(&image))
            .unwrap();
        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Home, day(2), Some(&image))
            .unwrap();

        assert!(matches!(outcome, RefreshOutcome::Applied { .. }));
        assert_eq!(state.last_applied_date, Some(day(2)));
        assert_eq!(backend.applied().len(), 2);
    }

    #[test]
    fn test_manual_change_drifts_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, policy, mut state) = armed_setup(WallpaperSurface::Home);
        let image = stored_image(dir.path(), 1);

        policy
            .evaluate(&mut state, WallpaperSurface::Home, day(1), Some(&image))
            .unwrap();
        let foreign = backend.simulate_external_change(WallpaperSlot::Home);

        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Home, day(2), Some(&image))
            .unwrap();

        assert_eq!(outcome, RefreshOutcome::Drift);
        assert!(!state.daily_mode_on);
        // The foreign identity is recorded so it is not re-flagged.
        assert_eq!(state.recorded_home_id, Some(foreign));

        // Once idle, nothing is applied until re-armed.
        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Home, day(3), Some(&image))
            .unwrap();
        assert_eq!(outcome, RefreshOutcome::Idle);
        assert_eq!(backend.applied().len(), 1);
    }

    #[test]
    fn test_target_change_is_drift() {
        let dir = tempfile::tempdir().unwrap();
        let (_backend, policy, mut state) = armed_setup(WallpaperSurface::Home);
        let image = stored_image(dir.path(), 1);

        policy
            .evaluate(&mut state, WallpaperSurface::Home, day(1), Some(&image))
            .unwrap();

        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Lock, day(2), Some(&image))
            .unwrap();
        assert_eq!(outcome, RefreshOutcome::Drift);
        assert!(!state.daily_mode_on);
    }

    #[test]
    fn test_target_change_before_first_apply_is_not_drift() {
        let dir = tempfile::tempdir().unwrap();
        let (_backend, policy, mut state) = armed_setup(WallpaperSurface::Home);
        let image = stored_image(dir.path(), 1);

        // The user flipped the target between arming and the first cycle.
        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Lock, day(1), Some(&image))
            .unwrap();

        assert!(matches!(outcome, RefreshOutcome::Applied { .. }));
        assert_eq!(state.target, WallpaperSurface::Lock);
        assert!(state.recorded_lock_id.is_some());
        assert!(state.recorded_home_id.is_none());
    }

    #[test]
    fn test_both_surfaces_apply_two_crops() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, policy, mut state) = armed_setup(WallpaperSurface::Both);
        let image = stored_image(dir.path(), 1);

        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Both, day(1), Some(&image))
            .unwrap();

        let RefreshOutcome::Applied { id, .. } = outcome else {
            panic!("expected Applied");
        };
        let applied = backend.applied();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0].0, WallpaperSlot::Home);
        assert_eq!(applied[1].0, WallpaperSlot::Lock);
        // Identity tracked from the home application.
        assert_eq!(state.recorded_home_id, Some(id));
    }

    #[test]
    fn test_not_allowed_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, policy, mut state) = armed_setup(WallpaperSurface::Home);
        backend.set_permitted(false);
        let image = stored_image(dir.path(), 1);

        let before = state.clone();
        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Home, day(1), Some(&image))
            .unwrap();

        assert_eq!(outcome, RefreshOutcome::NotAllowed);
        assert_eq!(state, before);
    }

    #[test]
    fn test_apply_failure_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, policy, mut state) = armed_setup(WallpaperSurface::Home);
        backend.set_fail_apply(true);
        let image = stored_image(dir.path(), 1);

        let before = state.clone();
        let result = policy.evaluate(&mut state, WallpaperSurface::Home, day(1), Some(&image));

        assert!(result.is_err());
        assert_eq!(state, before);

        // Next cycle succeeds once the device cooperates again.
        backend.set_fail_apply(false);
        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Home, day(1), Some(&image))
            .unwrap();
        assert!(matches!(outcome, RefreshOutcome::Applied { .. }));
    }

    #[test]
    fn test_missing_image_file_is_an_error() {
        let (_backend, policy, mut state) = armed_setup(WallpaperSurface::Home);
        let image = StoredImage {
            date: day(1),
            image_url: "mock://missing".to_string(),
            local_path: "/nonexistent/missing.png".to_string(),
            copyright: String::new(),
            copyright_link: String::new(),
            headline: String::new(),
            imported_at: time::OffsetDateTime::now_utc(),
        };

        let result = policy.evaluate(&mut state, WallpaperSurface::Home, day(1), Some(&image));
        assert!(matches!(result, Err(WallpaperError::ReadImage { .. })));
    }

    #[test]
    fn test_no_image_outcome() {
        let (_backend, policy, mut state) = armed_setup(WallpaperSurface::Home);
        let outcome = policy
            .evaluate(&mut state, WallpaperSurface::Home, day(1), None)
            .unwrap();
        assert_eq!(outcome, RefreshOutcome::NoImage);
    }
}
