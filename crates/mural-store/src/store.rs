//! Main store implementation.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use time::{Date, OffsetDateTime};
use tracing::{debug, info};

use mural_types::{WallpaperSurface, dates};

use crate::error::{Error, Result};
use crate::models::{ImageKey, StoredImage, SyncState};
use crate::schema;

/// SQLite-based store for wallpaper records and sync state.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

// Image record operations
impl Store {
    /// Insert a record, replacing any record with the same identity.
    pub fn upsert_image(&self, image: &StoredImage) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO images
             (date, image_url, local_path, copyright, copyright_link, headline, imported_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                dates::format_iso(image.date),
                image.image_url,
                image.local_path,
                image.copyright,
                image.copyright_link,
                image.headline,
                image.imported_at.unix_timestamp(),
            ],
        )?;

        debug!("Stored image record for {}", image.date);
        Ok(())
    }

    /// Check whether a record with this identity exists.
    pub fn contains_image(&self, date: Date, image_url: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM images WHERE date = ?1 AND image_url = ?2",
            rusqlite::params![dates::format_iso(date), image_url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Get a record by identity.
    pub fn get_image(&self, date: Date, image_url: &str) -> Result<Option<StoredImage>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, image_url, local_path, copyright, copyright_link, headline, imported_at
             FROM images WHERE date = ?1 AND image_url = ?2",
        )?;

        let image = stmt
            .query_row(
                rusqlite::params![dates::format_iso(date), image_url],
                row_to_image,
            )
            .optional()?;

        Ok(image)
    }

    /// Delete a record by identity. Returns true when a row was removed.
    pub fn delete_image(&self, date: Date, image_url: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM images WHERE date = ?1 AND image_url = ?2",
            rusqlite::params![dates::format_iso(date), image_url],
        )?;

        if deleted > 0 {
            info!("Deleted image record for {}", date);
        }
        Ok(deleted > 0)
    }

    /// The most recently published record, if any.
    pub fn most_recent_image(&self) -> Result<Option<StoredImage>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, image_url, local_path, copyright, copyright_link, headline, imported_at
             FROM images ORDER BY date DESC LIMIT 1",
        )?;

        let image = stmt.query_row([], row_to_image).optional()?;
        Ok(image)
    }

    /// All records, newest first.
    pub fn list_images(&self) -> Result<Vec<StoredImage>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, image_url, local_path, copyright, copyright_link, headline, imported_at
             FROM images ORDER BY date DESC",
        )?;

        let images = stmt
            .query_map([], row_to_image)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(images)
    }

    /// Identity and file locator of every record, newest first.
    pub fn list_keys(&self) -> Result<Vec<ImageKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, image_url, local_path FROM images ORDER BY date DESC",
        )?;

        let keys = stmt
            .query_map([], |row| {
                Ok(ImageKey {
                    date: date_from_sql(0, row.get(0)?)?,
                    image_url: row.get(1)?,
                    local_path: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(keys)
    }

    /// Number of stored records.
    pub fn count_images(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

// Sync state operations
impl Store {
    /// Read the persisted sync state, defaulting when none was written.
    pub fn sync_state(&self) -> Result<SyncState> {
        let mut stmt = self.conn.prepare(
            "SELECT last_sync_date, daily_mode_on, target,
                    recorded_home_id, recorded_lock_id, last_applied_date
             FROM sync_state WHERE id = 1",
        )?;

        let state = stmt
            .query_row([], |row| {
                Ok(SyncState {
                    last_sync_date: row
                        .get::<_, Option<String>>(0)?
                        .map(|v| date_from_sql(0, v))
                        .transpose()?,
                    daily_mode_on: row.get(1)?,
                    target: row
                        .get::<_, String>(2)?
                        .parse::<WallpaperSurface>()
                        .unwrap_or_default(),
                    recorded_home_id: row.get(3)?,
                    recorded_lock_id: row.get(4)?,
                    last_applied_date: row
                        .get::<_, Option<String>>(5)?
                        .map(|v| date_from_sql(5, v))
                        .transpose()?,
                })
            })
            .optional()?;

        Ok(state.unwrap_or_default())
    }

    /// Persist the sync state.
    pub fn put_sync_state(&self, state: &SyncState) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sync_state
             (id, last_sync_date, daily_mode_on, target,
              recorded_home_id, recorded_lock_id, last_applied_date)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                state.last_sync_date.map(dates::format_iso),
                state.daily_mode_on,
                state.target.as_str(),
                state.recorded_home_id,
                state.recorded_lock_id,
                state.last_applied_date.map(dates::format_iso),
            ],
        )?;

        debug!("Persisted sync state (last_sync={:?})", state.last_sync_date);
        Ok(())
    }
}

fn row_to_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredImage> {
    Ok(StoredImage {
        date: date_from_sql(0, row.get(0)?)?,
        image_url: row.get(1)?,
        local_path: row.get(2)?,
        copyright: row.get(3)?,
        copyright_link: row.get(4)?,
        headline: row.get(5)?,
        imported_at: OffsetDateTime::from_unix_timestamp(row.get(6)?).unwrap(),
    })
}

fn date_from_sql(idx: usize, value: String) -> rusqlite::Result<Date> {
    dates::parse_iso(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
