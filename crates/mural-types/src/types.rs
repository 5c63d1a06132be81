//! Shared domain types for the mural feed and wallpaper policy.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::error::ParseError;

/// One day's metadata entry from the image-of-the-day feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// Publication day of the image.
    #[serde(with = "crate::dates::serde_iso")]
    pub date: Date,
    /// Fully qualified URL of the image asset.
    pub image_url: String,
    /// Copyright attribution text.
    pub copyright: String,
    /// Link backing the copyright attribution.
    pub copyright_link: String,
    /// Short human-readable headline.
    pub headline: String,
}

/// Identity the device assigns to an applied wallpaper.
///
/// Values are opaque; the policy only ever compares them for equality
/// to detect out-of-band wallpaper changes.
pub type WallpaperId = i32;

/// A concrete device wallpaper slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperSlot {
    /// The home-screen (system) wallpaper.
    Home,
    /// The lock-screen wallpaper.
    Lock,
}

/// Which wallpaper slot(s) daily mode manages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperSurface {
    /// Manage the home-screen wallpaper only.
    #[default]
    Home,
    /// Manage the lock-screen wallpaper only.
    Lock,
    /// Manage both; identity is tracked from the home application.
    Both,
}

impl WallpaperSurface {
    /// Parse a surface name as used in config files and CLI arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use mural_types::WallpaperSurface;
    ///
    /// assert_eq!("lock".parse::<WallpaperSurface>().unwrap(), WallpaperSurface::Lock);
    /// assert!("desktop".parse::<WallpaperSurface>().is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        match value.to_ascii_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "lock" => Ok(Self::Lock),
            "both" => Ok(Self::Both),
            _ => Err(ParseError::InvalidSurface(value.to_string())),
        }
    }

    /// The canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Lock => "lock",
            Self::Both => "both",
        }
    }

    /// The concrete slots this surface covers, in application order.
    pub fn slots(&self) -> &'static [WallpaperSlot] {
        match self {
            Self::Home => &[WallpaperSlot::Home],
            Self::Lock => &[WallpaperSlot::Lock],
            Self::Both => &[WallpaperSlot::Home, WallpaperSlot::Lock],
        }
    }

    /// The slot whose identity is compared for drift detection.
    pub fn tracking_slot(&self) -> WallpaperSlot {
        match self {
            Self::Lock => WallpaperSlot::Lock,
            Self::Home | Self::Both => WallpaperSlot::Home,
        }
    }
}

impl std::str::FromStr for WallpaperSurface {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for WallpaperSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive the cache file name for a feed image.
///
/// The name is `<yyyyMMdd>_<asset id>`, where the asset id is mined
/// from the URL's `id=` query parameter when present (the feed encodes
/// a stable image identifier there) and falls back to the last path
/// segment otherwise. Characters that cannot appear in a file name are
/// replaced, and a `.jpg` extension is guaranteed.
///
/// # Examples
///
/// ```
/// use time::{Date, Month};
///
/// let date = Date::from_calendar_date(2021, Month::February, 7).unwrap();
/// let url = "https://www.bing.com/th?id=OHR.Snowshoe_1920x1080.jpg&rf=1";
/// assert_eq!(
///     mural_types::image_file_name(date, url),
///     "20210207_OHR.Snowshoe_1920x1080.jpg"
/// );
/// ```
pub fn image_file_name(date: Date, image_url: &str) -> String {
    let id = image_url
        .split_once("id=")
        .map(|(_, rest)| rest.split(['&', '#']).next().unwrap_or(rest))
        .or_else(|| {
            image_url
                .split(['?', '#'])
                .next()
                .and_then(|path| path.rsplit('/').next())
        })
        .filter(|id| !id.is_empty())
        .unwrap_or("image");

    let mut name = format!("{}_{}", crate::dates::format_compact(date), sanitize(id));
    if !name.ends_with(".jpg") {
        name.push_str(".jpg");
    }
    name
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn day(y: i32, m: Month, d: u8) -> Date {
        Date::from_calendar_date(y, m, d).unwrap()
    }

    #[test]
    fn test_surface_parse() {
        assert_eq!(
            WallpaperSurface::parse("Home").unwrap(),
            WallpaperSurface::Home
        );
        assert_eq!(
            WallpaperSurface::parse("BOTH").unwrap(),
            WallpaperSurface::Both
        );
        assert!(WallpaperSurface::parse("screen").is_err());
    }

    #[test]
    fn test_surface_slots() {
        assert_eq!(WallpaperSurface::Home.slots(), &[WallpaperSlot::Home]);
        assert_eq!(WallpaperSurface::Lock.slots(), &[WallpaperSlot::Lock]);
        assert_eq!(
            WallpaperSurface::Both.slots(),
            &[WallpaperSlot::Home, WallpaperSlot::Lock]
        );
    }

    #[test]
    fn test_tracking_slot() {
        assert_eq!(WallpaperSurface::Home.tracking_slot(), WallpaperSlot::Home);
        assert_eq!(WallpaperSurface::Lock.tracking_slot(), WallpaperSlot::Lock);
        assert_eq!(WallpaperSurface::Both.tracking_slot(), WallpaperSlot::Home);
    }

    #[test]
    fn test_surface_serde() {
        let json = serde_json::to_string(&WallpaperSurface::Both).unwrap();
        assert_eq!(json, "\"both\"");
        let parsed: WallpaperSurface = serde_json::from_str("\"lock\"").unwrap();
        assert_eq!(parsed, WallpaperSurface::Lock);
    }

    #[test]
    fn test_file_name_from_id_parameter() {
        let name = image_file_name(
            day(2021, Month::February, 7),
            "https://www.bing.com/th?id=OHR.Alps_1920x1080.jpg&pid=hp",
        );
        assert_eq!(name, "20210207_OHR.Alps_1920x1080.jpg");
    }

    #[test]
    fn test_file_name_falls_back_to_path_segment() {
        let name = image_file_name(
            day(2021, Month::March, 1),
            "https://img.example/daily/alps.jpg",
        );
        assert_eq!(name, "20210301_alps.jpg");
    }

    #[test]
    fn test_file_name_always_has_extension() {
        let name = image_file_name(day(2021, Month::March, 1), "https://img.example/daily/alps");
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_file_name_sanitizes_separators() {
        let name = image_file_name(
            day(2021, Month::March, 1),
            "https://img.example/th?id=a/b\\c.jpg",
        );
        assert!(!name.contains('/'));
        assert!(!name.contains('\\'));
    }

    #[test]
    fn test_feed_entry_serde_round_trip() {
        let entry = FeedEntry {
            date: day(2021, Month::February, 7),
            image_url: "https://www.bing.com/th?id=OHR.A_1920x1080.jpg".to_string(),
            copyright: "© Somebody".to_string(),
            copyright_link: "https://www.bing.com/search?q=a".to_string(),
            headline: "A headline".to_string(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"2021-02-07\""));
        let back: FeedEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
