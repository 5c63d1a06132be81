//! Daemon configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use mural_feed::{DEFAULT_BASE_URL, DEFAULT_IMAGE_HOST, DEFAULT_MARKET};
use mural_types::WallpaperSurface;

/// Daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote feed settings.
    pub feed: FeedConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Background daemon settings.
    pub daemon: DaemonConfig,
    /// Wallpaper target settings.
    pub wallpaper: WallpaperConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.feed.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.daemon.validate());
        errors.extend(self.wallpaper.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Remote feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Feed endpoint URL.
    pub base_url: String,
    /// Host prefixed to relative image paths.
    pub image_host: String,
    /// Feed market, e.g. "en-US".
    pub market: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            image_host: DEFAULT_IMAGE_HOST.to_string(),
            market: DEFAULT_MARKET.to_string(),
        }
    }
}

impl FeedConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [("feed.base_url", &self.base_url), ("feed.image_host", &self.image_host)] {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("'{}' is not an http(s) URL", value),
                });
            }
        }

        if self.market.is_empty() {
            errors.push(ValidationError {
                field: "feed.market".to_string(),
                message: "market cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub database: PathBuf,
    /// Directory holding cached images.
    pub image_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: mural_store::default_db_path(),
            image_dir: default_image_dir(),
        }
    }
}

impl StorageConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.database.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }
        if self.image_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.image_dir".to_string(),
                message: "image directory cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Background daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Seconds between sync cycles.
    pub sync_interval: u64,
}

/// Minimum sync interval in seconds (5 minutes).
pub const MIN_SYNC_INTERVAL: u64 = 300;
/// Maximum sync interval in seconds (24 hours).
pub const MAX_SYNC_INTERVAL: u64 = 86_400;

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { sync_interval: 3600 }
    }
}

impl DaemonConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.sync_interval < MIN_SYNC_INTERVAL {
            errors.push(ValidationError {
                field: "daemon.sync_interval".to_string(),
                message: format!(
                    "interval {} is too short (minimum {} seconds)",
                    self.sync_interval, MIN_SYNC_INTERVAL
                ),
            });
        } else if self.sync_interval > MAX_SYNC_INTERVAL {
            errors.push(ValidationError {
                field: "daemon.sync_interval".to_string(),
                message: format!(
                    "interval {} is too long (maximum {} seconds / 24 hours)",
                    self.sync_interval, MAX_SYNC_INTERVAL
                ),
            });
        }

        errors
    }
}

/// Wallpaper target settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WallpaperConfig {
    /// Which surface(s) daily mode manages.
    pub target: WallpaperSurface,
    /// Display width in pixels, used for the lock-slot crop.
    pub display_width: u32,
    /// Display height in pixels, used for the lock-slot crop.
    pub display_height: u32,
    /// Command run after spooling the cropped image. The spool path is
    /// exported as `MURAL_WALLPAPER`, the slot name as `MURAL_SURFACE`.
    pub apply_command: Option<String>,
    /// Directory the cropped images are spooled into.
    pub spool_dir: PathBuf,
}

impl Default for WallpaperConfig {
    fn default() -> Self {
        Self {
            target: WallpaperSurface::Home,
            display_width: 1920,
            display_height: 1080,
            apply_command: None,
            spool_dir: default_spool_dir(),
        }
    }
}

impl WallpaperConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.display_width == 0 || self.display_height == 0 {
            errors.push(ValidationError {
                field: "wallpaper.display_width".to_string(),
                message: "display dimensions must be non-zero".to_string(),
            });
        }

        if let Some(command) = &self.apply_command
            && command.trim().is_empty()
        {
            errors.push(ValidationError {
                field: "wallpaper.apply_command".to_string(),
                message: "apply command cannot be empty (use null/omit instead)".to_string(),
            });
        }

        errors
    }

    /// Display size as a pair.
    pub fn display_size(&self) -> (u32, u32) {
        (self.display_width, self.display_height)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `daemon.sync_interval`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mural")
        .join("config.toml")
}

/// Default directory for cached images.
pub fn default_image_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mural")
        .join("images")
}

/// Default directory for spooled wallpaper crops.
pub fn default_spool_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mural")
        .join("spool")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.daemon.sync_interval, 3600);
        assert_eq!(config.wallpaper.target, WallpaperSurface::Home);
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
            [feed]
            base_url = "https://feed.example/archive"
            image_host = "https://feed.example"
            market = "de-DE"

            [storage]
            database = "/data/mural.db"
            image_dir = "/data/images"

            [daemon]
            sync_interval = 1800

            [wallpaper]
            target = "both"
            display_width = 2560
            display_height = 1440
            apply_command = "feh --bg-fill $MURAL_WALLPAPER"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.feed.market, "de-DE");
        assert_eq!(config.storage.database, PathBuf::from("/data/mural.db"));
        assert_eq!(config.daemon.sync_interval, 1800);
        assert_eq!(config.wallpaper.target, WallpaperSurface::Both);
        assert_eq!(config.wallpaper.display_size(), (2560, 1440));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[daemon]\nsync_interval = 7200\n").unwrap();
        assert_eq!(config.daemon.sync_interval, 7200);
        assert_eq!(config.feed.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.wallpaper.target, WallpaperSurface::Home);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.feed.market = "ja-JP".to_string();
        config.wallpaper.target = WallpaperSurface::Lock;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.feed.market, "ja-JP");
        assert_eq!(loaded.wallpaper.target, WallpaperSurface::Lock);
    }

    #[test]
    fn test_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "this is not valid { toml").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_interval_bounds() {
        let mut config = Config::default();

        config.daemon.sync_interval = 10;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("too short"));

        config.daemon.sync_interval = 200_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn test_feed_url_validation() {
        let mut config = Config::default();
        config.feed.base_url = "ftp://feed.example".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("feed.base_url"));
    }

    #[test]
    fn test_zero_display_rejected() {
        let mut config = Config::default();
        config.wallpaper.display_width = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("display"));
    }

    #[test]
    fn test_empty_apply_command_rejected() {
        let mut config = Config::default();
        config.wallpaper.apply_command = Some("  ".to_string());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("apply_command"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("mural/config.toml"));
    }
}
