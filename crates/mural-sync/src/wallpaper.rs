//! Wallpaper backend seam and crop geometry.
//!
//! The policy decides *what* to apply; a [`WallpaperBackend`] is the
//! device-facing half: it reports the display size, applies a cropped
//! image to a slot, and hands back the device-assigned identity the
//! policy later compares to detect out-of-band changes.
//!
//! Two implementations ship here: [`MockWallpaper`] for tests (full
//! identity reporting, failure injection, external-change simulation)
//! and [`CommandWallpaper`], which crops the image, writes it to a
//! spool file, and runs a user-configured command against it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use image::DynamicImage;
use tracing::{debug, info};

use mural_types::{WallpaperId, WallpaperSlot};

/// A crop region within an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// The full frame of an image, uncropped.
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Centered square crop at the image's shorter dimension, used for the
/// home slot.
pub fn home_crop(width: u32, height: u32) -> CropRect {
    let half = width.min(height) / 2;
    let x = width / 2 - half;
    let y = height / 2 - half;
    CropRect {
        x,
        y,
        width: width - 2 * x,
        height: height - 2 * y,
    }
}

/// Centered crop matching the display's aspect ratio, used for the
/// lock slot.
pub fn lock_crop(width: u32, height: u32, display_width: u32, display_height: u32) -> CropRect {
    let ratio = (width as f32 / display_width as f32).min(height as f32 / display_height as f32);
    let crop_width = display_width as f32 * ratio;
    let crop_height = display_height as f32 * ratio;
    let x = (width as f32 / 2.0 - crop_width / 2.0).floor() as u32;
    let y = (height as f32 / 2.0 - crop_height / 2.0).floor() as u32;
    CropRect {
        x,
        y,
        width: width - 2 * x,
        height: height - 2 * y,
    }
}

/// The crop for a given slot and display size.
pub fn crop_for_slot(
    slot: WallpaperSlot,
    width: u32,
    height: u32,
    display: (u32, u32),
) -> CropRect {
    match slot {
        WallpaperSlot::Home => home_crop(width, height),
        WallpaperSlot::Lock => lock_crop(width, height, display.0, display.1),
    }
}

/// Errors that can occur when applying a wallpaper.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WallpaperError {
    /// The device refuses wallpaper changes right now.
    #[error("Setting the wallpaper is not permitted")]
    NotAllowed,

    /// Image decode or encode failure.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Failed to read the cached image file.
    #[error("Failed to read image {path}: {source}")]
    ReadImage {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the spool file.
    #[error("Failed to write spool file {path}: {source}")]
    Spool {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The apply command could not be started.
    #[error("Apply command failed to start: {0}")]
    CommandSpawn(std::io::Error),

    /// The apply command exited unsuccessfully.
    #[error("Apply command exited with {0}")]
    CommandStatus(std::process::ExitStatus),

    /// Injected failure from a mock backend.
    #[error("Apply failed: {0}")]
    Apply(String),
}

/// Device-facing wallpaper operations.
pub trait WallpaperBackend: Send + Sync {
    /// The display size in pixels, used for lock-slot crop geometry.
    fn display_size(&self) -> (u32, u32);

    /// Whether the device currently permits wallpaper changes.
    fn set_allowed(&self) -> bool {
        true
    }

    /// The device-reported identity of the current wallpaper in a slot,
    /// or `None` when the backend cannot observe it.
    fn current_id(&self, slot: WallpaperSlot) -> Option<WallpaperId>;

    /// Apply a crop of the image to a slot, returning the new identity.
    fn apply(
        &self,
        image: &DynamicImage,
        crop: CropRect,
        slot: WallpaperSlot,
    ) -> Result<WallpaperId, WallpaperError>;
}

/// A mock backend for testing the refresh policy.
pub struct MockWallpaper {
    display: (u32, u32),
    next_id: AtomicI32,
    ids: Mutex<HashMap<WallpaperSlot, WallpaperId>>,
    allowed: AtomicBool,
    fail_apply: AtomicBool,
    applied: Mutex<Vec<(WallpaperSlot, CropRect)>>,
}

impl MockWallpaper {
    /// Create a mock backend with the given display size.
    pub fn new(display_width: u32, display_height: u32) -> Self {
        Self {
            display: (display_width, display_height),
            next_id: AtomicI32::new(1),
            ids: Mutex::new(HashMap::new()),
            allowed: AtomicBool::new(true),
            fail_apply: AtomicBool::new(false),
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Allow or forbid wallpaper changes.
    pub fn set_permitted(&self, allowed: bool) {
        self.allowed.store(allowed, Ordering::SeqCst);
    }

    /// Make subsequent applies fail.
    pub fn set_fail_apply(&self, fail: bool) {
        self.fail_apply.store(fail, Ordering::SeqCst);
    }

    /// Simulate the user changing a slot's wallpaper out-of-band.
    pub fn simulate_external_change(&self, slot: WallpaperSlot) -> WallpaperId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.ids.lock().unwrap().insert(slot, id);
        id
    }

    /// Every apply performed, in order.
    pub fn applied(&self) -> Vec<(WallpaperSlot, CropRect)> {
        self.applied.lock().unwrap().clone()
    }
}

impl WallpaperBackend for MockWallpaper {
    fn display_size(&self) -> (u32, u32) {
        self.display
    }

    fn set_allowed(&self) -> bool {
        self.allowed.load(Ordering::SeqCst)
    }

    fn current_id(&self, slot: WallpaperSlot) -> Option<WallpaperId> {
        self.ids.lock().unwrap().get(&slot).copied()
    }

    fn apply(
        &self,
        _image: &DynamicImage,
        crop: CropRect,
        slot: WallpaperSlot,
    ) -> Result<WallpaperId, WallpaperError> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(WallpaperError::Apply("injected failure".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.ids.lock().unwrap().insert(slot, id);
        self.applied.lock().unwrap().push((slot, crop));
        Ok(id)
    }
}

/// A backend that spools the cropped image to disk and runs a command.
///
/// The command receives the spool path in `MURAL_WALLPAPER` and the
/// slot name in `MURAL_SURFACE`. Identities are assigned by this
/// backend itself, since an external command cannot report one; drift
/// caused outside the process is therefore not observable here (see
/// DESIGN.md).
pub struct CommandWallpaper {
    spool_dir: PathBuf,
    command: Option<String>,
    display: (u32, u32),
    next_id: AtomicI32,
    ids: Mutex<HashMap<WallpaperSlot, WallpaperId>>,
}

impl CommandWallpaper {
    /// Create a backend spooling into `spool_dir`.
    pub fn new(
        spool_dir: impl Into<PathBuf>,
        command: Option<String>,
        display: (u32, u32),
    ) -> Self {
        Self {
            spool_dir: spool_dir.into(),
            command,
            display,
            next_id: AtomicI32::new(1),
            ids: Mutex::new(HashMap::new()),
        }
    }

    fn slot_name(slot: WallpaperSlot) -> &'static str {
        match slot {
            WallpaperSlot::Home => "home",
            WallpaperSlot::Lock => "lock",
        }
    }
}

impl WallpaperBackend for CommandWallpaper {
    fn display_size(&self) -> (u32, u32) {
        self.display
    }

    fn current_id(&self, slot: WallpaperSlot) -> Option<WallpaperId> {
        self.ids.lock().unwrap().get(&slot).copied()
    }

    fn apply(
        &self,
        image: &DynamicImage,
        crop: CropRect,
        slot: WallpaperSlot,
    ) -> Result<WallpaperId, WallpaperError> {
        std::fs::create_dir_all(&self.spool_dir).map_err(|e| WallpaperError::Spool {
            path: self.spool_dir.clone(),
            source: e,
        })?;

        let cropped = image.crop_imm(crop.x, crop.y, crop.width, crop.height);
        let path = self.spool_dir.join(format!("{}.jpg", Self::slot_name(slot)));
        cropped.save(&path)?;
        debug!("Spooled {} wallpaper to {}", Self::slot_name(slot), path.display());

        if let Some(command) = &self.command {
            let status = Command::new("sh")
                .arg("-c")
                .arg(command)
                .env("MURAL_WALLPAPER", &path)
                .env("MURAL_SURFACE", Self::slot_name(slot))
                .status()
                .map_err(WallpaperError::CommandSpawn)?;

            if !status.success() {
                return Err(WallpaperError::CommandStatus(status));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.ids.lock().unwrap().insert(slot, id);
        info!("Applied {} wallpaper (id {})", Self::slot_name(slot), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn test_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
    }

    #[test]
    fn test_home_crop_is_centered_square() {
        let crop = home_crop(1920, 1080);
        assert_eq!(crop, CropRect { x: 420, y: 0, width: 1080, height: 1080 });
    }

    #[test]
    fn test_home_crop_portrait_source() {
        let crop = home_crop(1080, 1920);
        assert_eq!(crop, CropRect { x: 0, y: 420, width: 1080, height: 1080 });
    }

    #[test]
    fn test_home_crop_odd_dimensions_stay_in_bounds() {
        let crop = home_crop(101, 50);
        assert!(crop.x + crop.width <= 101);
        assert!(crop.y + crop.height <= 50);
        assert_eq!(crop.height, 50);
    }

    #[test]
    fn test_lock_crop_matching_aspect_is_full_frame() {
        let crop = lock_crop(1920, 1080, 1920, 1080);
        assert_eq!(crop, CropRect::full(1920, 1080));
    }

    #[test]
    fn test_lock_crop_portrait_display() {
        // 1080x1920 display against a 1920x1080 image: width shrinks.
        let crop = lock_crop(1920, 1080, 1080, 1920);
        assert_eq!(crop.height, 1080);
        assert!(crop.width < 1920);
        assert!(crop.x > 0);
        // Centered within the frame.
        assert_eq!(crop.x + crop.width, 1920 - crop.x);
    }

    #[test]
    fn test_mock_assigns_fresh_ids() {
        let backend = MockWallpaper::new(1920, 1080);
        let img = test_image(64, 64);

        assert!(backend.current_id(WallpaperSlot::Home).is_none());

        let first = backend
            .apply(&img, CropRect::full(64, 64), WallpaperSlot::Home)
            .unwrap();
        let second = backend
            .apply(&img, CropRect::full(64, 64), WallpaperSlot::Home)
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(backend.current_id(WallpaperSlot::Home), Some(second));
        assert!(backend.current_id(WallpaperSlot::Lock).is_none());
    }

    #[test]
    fn test_mock_failure_injection() {
        let backend = MockWallpaper::new(1920, 1080);
        backend.set_fail_apply(true);

        let img = test_image(64, 64);
        let result = backend.apply(&img, CropRect::full(64, 64), WallpaperSlot::Home);
        assert!(result.is_err());
        assert!(backend.current_id(WallpaperSlot::Home).is_none());
    }

    #[test]
    fn test_mock_external_change_is_observable() {
        let backend = MockWallpaper::new(1920, 1080);
        let img = test_image(64, 64);

        let applied = backend
            .apply(&img, CropRect::full(64, 64), WallpaperSlot::Home)
            .unwrap();
        let foreign = backend.simulate_external_change(WallpaperSlot::Home);

        assert_ne!(applied, foreign);
        assert_eq!(backend.current_id(WallpaperSlot::Home), Some(foreign));
    }

    #[test]
    fn test_command_wallpaper_spools_cropped_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = CommandWallpaper::new(dir.path().join("spool"), None, (1920, 1080));
        let img = test_image(100, 60);

        let id = backend
            .apply(&img, home_crop(100, 60), WallpaperSlot::Home)
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(backend.current_id(WallpaperSlot::Home), Some(1));

        let spooled = image::open(dir.path().join("spool").join("home.jpg")).unwrap();
        assert_eq!(spooled.dimensions(), (60, 60));
    }

    #[test]
    fn test_command_wallpaper_failing_command_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = CommandWallpaper::new(
            dir.path().join("spool"),
            Some("exit 3".to_string()),
            (1920, 1080),
        );
        let img = test_image(64, 64);

        let result = backend.apply(&img, CropRect::full(64, 64), WallpaperSlot::Lock);
        assert!(matches!(result, Err(WallpaperError::CommandStatus(_))));
        assert!(backend.current_id(WallpaperSlot::Lock).is_none());
    }
}
