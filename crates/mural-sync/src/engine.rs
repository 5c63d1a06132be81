//! The synchronization engine.
//!
//! A cycle runs three phases in order, mirroring how records move
//! through the system: import newly published entries, reconcile
//! previously imported records against the cache, then hand the newest
//! record to the refresh policy. At most one cycle runs at a time;
//! triggers arriving while one is in flight are rejected with
//! [`EngineError::CycleInProgress`] and simply dropped by the trigger
//! loop.
//!
//! Failure philosophy: one bad entry never fails a batch. A failed
//! image download skips that entry, a failed wallpaper apply is logged
//! and retried next cycle, and only infrastructure failures (store,
//! cache directory) or cancellation abort a cycle.

use std::sync::Arc;

use serde::Serialize;
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

use mural_feed::{HISTORY_DEPTH, ImageFeed, entry_for_date};
use mural_store::{ImageKey, StoredImage};
use mural_types::image_file_name;

use crate::cache::{CacheError, ImageCache, write_file_atomic};
use crate::policy::{RefreshOutcome, RefreshPolicy};
use crate::state::{AppState, SyncEvent};
use crate::wallpaper::{WallpaperBackend, WallpaperError};

/// Errors that can abort an engine operation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Another cycle is already in flight.
    #[error("A sync cycle is already running")]
    CycleInProgress,

    /// Cancellation was requested mid-cycle.
    #[error("Sync cancelled")]
    Cancelled,

    /// Feed metadata could not be fetched.
    #[error("Feed error: {0}")]
    Feed(#[from] mural_feed::Error),

    /// Store failure.
    #[error("Store error: {0}")]
    Store(#[from] mural_store::Error),

    /// Image cache failure.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Wallpaper apply failure.
    #[error("Wallpaper error: {0}")]
    Wallpaper(#[from] WallpaperError),
}

/// What happened to one record during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// The cached file was present; nothing to do.
    Valid,
    /// The file was missing and was re-fetched to the same locator.
    Repaired,
    /// The file was missing and could not be recovered; record removed.
    Deleted,
}

impl RecordStatus {
    /// Whether the record still exists with a readable file.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Deleted)
    }
}

/// Counters describing one completed cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CycleSummary {
    /// Metadata entries returned by the feed.
    pub fetched: usize,
    /// New records inserted.
    pub inserted: usize,
    /// Entries skipped because their image could not be downloaded.
    pub skipped: usize,
    /// Records repaired in place during reconciliation.
    pub repaired: usize,
    /// Records deleted during reconciliation.
    pub deleted: usize,
    /// Whether the wallpaper was refreshed this cycle.
    pub refreshed: bool,
}

/// The synchronization engine.
pub struct SyncEngine {
    state: Arc<AppState>,
    feed: Arc<dyn ImageFeed>,
    cache: ImageCache,
    policy: RefreshPolicy,
}

/// Releases the cycle gate when a cycle ends, however it ends.
struct CycleGuard<'a>(&'a AppState);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.end_cycle();
    }
}

impl SyncEngine {
    /// Create an engine over shared state, a feed, and a wallpaper
    /// backend. Opens the image cache directory from the configuration.
    pub async fn new(
        state: Arc<AppState>,
        feed: Arc<dyn ImageFeed>,
        backend: Arc<dyn WallpaperBackend>,
    ) -> Result<Self, EngineError> {
        let image_dir = state.config.read().await.storage.image_dir.clone();
        let cache = ImageCache::open(image_dir)?;

        Ok(Self {
            state,
            feed,
            cache,
            policy: RefreshPolicy::new(backend),
        })
    }

    /// Run one full cycle against the current local date.
    pub async fn run_cycle(&self) -> Result<CycleSummary, EngineError> {
        self.run_cycle_at(local_today()).await
    }

    /// Run one full cycle with an explicit notion of "today".
    pub async fn run_cycle_at(&self, today: Date) -> Result<CycleSummary, EngineError> {
        if !self.state.try_begin_cycle() {
            return Err(EngineError::CycleInProgress);
        }
        let _guard = CycleGuard(&self.state);

        if self.state.stop_requested() {
            return Err(EngineError::Cancelled);
        }

        let mut summary = CycleSummary::default();

        match self.sync_latest(today, &mut summary).await {
            Ok(()) => {}
            Err(e @ EngineError::Cancelled) => return Err(e),
            Err(EngineError::Feed(e)) => {
                // Transient; existing records can still be reconciled.
                warn!("Feed sync failed: {}", e);
            }
            Err(e) => return Err(e),
        }

        for (_, status) in self.reconcile_existing_records(today).await? {
            match status {
                RecordStatus::Repaired => summary.repaired += 1,
                RecordStatus::Deleted => summary.deleted += 1,
                RecordStatus::Valid => {}
            }
        }

        self.refresh_wallpaper(today, &mut summary).await?;

        info!(
            "Cycle done: {} fetched, {} inserted, {} skipped, {} repaired, {} deleted",
            summary.fetched, summary.inserted, summary.skipped, summary.repaired, summary.deleted
        );
        let _ = self.state.events.send(SyncEvent::CycleCompleted(summary));

        Ok(summary)
    }

    /// Bring the store up to date with the remote feed.
    ///
    /// Fetches the window of entries published since the last sync (the
    /// full retained history when no sync has happened yet), imports
    /// each entry that is not already present, and advances the last
    /// sync date. An entry whose image cannot be downloaded is skipped
    /// without creating a record.
    pub async fn sync_latest(
        &self,
        today: Date,
        summary: &mut CycleSummary,
    ) -> Result<(), EngineError> {
        let last = {
            let store = self.state.store.lock().await;
            store.sync_state()?.last_sync_date
        };

        let window = match last {
            None => HISTORY_DEPTH,
            Some(prev) => {
                let days = (today - prev).whole_days();
                days.clamp(0, HISTORY_DEPTH as i64) as usize
            }
        };

        if window > 0 {
            debug!("Fetching {} day(s) of feed metadata", window);
            let entries = self.feed.fetch_metadata(0, window).await?;
            summary.fetched = entries.len();

            for entry in &entries {
                if self.state.stop_requested() {
                    return Err(EngineError::Cancelled);
                }

                let exists = {
                    let store = self.state.store.lock().await;
                    store.contains_image(entry.date, &entry.image_url)?
                };
                if exists {
                    continue;
                }

                let file_name = image_file_name(entry.date, &entry.image_url);
                let local_path = if self.cache.contains(&file_name) {
                    // A previous run already downloaded this image.
                    self.cache.path_of(&file_name)
                } else {
                    match self.feed.fetch_image(&entry.image_url).await {
                        Some(bytes) => self.cache.write(&file_name, &bytes)?,
                        None => {
                            warn!("Skipping {}: image download failed", entry.date);
                            summary.skipped += 1;
                            continue;
                        }
                    }
                };

                let record = StoredImage {
                    date: entry.date,
                    image_url: entry.image_url.clone(),
                    local_path: local_path.to_string_lossy().into_owned(),
                    copyright: entry.copyright.clone(),
                    copyright_link: entry.copyright_link.clone(),
                    headline: entry.headline.clone(),
                    imported_at: OffsetDateTime::now_utc(),
                };

                let store = self.state.store.lock().await;
                store.upsert_image(&record)?;
                summary.inserted += 1;
            }
        }

        let store = self.state.store.lock().await;
        let mut sync_state = store.sync_state()?;
        sync_state.last_sync_date = Some(today);
        store.put_sync_state(&sync_state)?;

        Ok(())
    }

    /// Validate every stored record's cached file, repairing or
    /// deleting records whose file has gone missing.
    ///
    /// Records are validated concurrently; store mutations serialize on
    /// the store lock. The result reports, per record, whether it
    /// remains valid.
    pub async fn reconcile_existing_records(
        &self,
        today: Date,
    ) -> Result<Vec<(ImageKey, RecordStatus)>, EngineError> {
        let keys = {
            let store = self.state.store.lock().await;
            store.list_keys()?
        };

        let checks = keys
            .into_iter()
            .map(|key| self.reconcile_record(today, key));

        let mut results = Vec::new();
        for result in futures::future::join_all(checks).await {
            results.push(result?);
        }
        Ok(results)
    }

    async fn reconcile_record(
        &self,
        today: Date,
        key: ImageKey,
    ) -> Result<(ImageKey, RecordStatus), EngineError> {
        match std::fs::File::open(&key.local_path) {
            Ok(_) => return Ok((key, RecordStatus::Valid)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                // Unreadable for another reason; leave the record alone.
                warn!("Could not check {}: {}", key.local_path, e);
                return Ok((key, RecordStatus::Valid));
            }
        }

        debug!("Cached file missing for {}, attempting repair", key.date);

        // First by the recorded URL, then by whatever URL the feed now
        // lists for that day (the asset may have been re-encoded).
        let mut bytes = self.feed.fetch_image(&key.image_url).await;
        if bytes.is_none() {
            bytes = match entry_for_date(self.feed.as_ref(), today, key.date).await {
                Ok(Some(entry)) => self.feed.fetch_image(&entry.image_url).await,
                Ok(None) => None,
                Err(e) => {
                    debug!("Feed lookup for {} failed: {}", key.date, e);
                    None
                }
            };
        }

        match bytes {
            Some(bytes) => {
                // Repair in place: same locator, record unchanged.
                write_file_atomic(std::path::Path::new(&key.local_path), &bytes)?;
                info!("Repaired cached file for {}", key.date);
                Ok((key, RecordStatus::Repaired))
            }
            None => {
                let store = self.state.store.lock().await;
                store.delete_image(key.date, &key.image_url)?;
                warn!("Record for {} is unrecoverable; deleted", key.date);
                Ok((key, RecordStatus::Deleted))
            }
        }
    }

    async fn refresh_wallpaper(
        &self,
        today: Date,
        summary: &mut CycleSummary,
    ) -> Result<(), EngineError> {
        match self.try_refresh(today).await {
            Ok(RefreshOutcome::Applied { .. }) => {
                summary.refreshed = true;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(EngineError::Wallpaper(e)) => {
                // State was left untouched; the next cycle retries.
                warn!("Wallpaper refresh failed: {}", e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Evaluate the refresh policy once and persist any transition.
    async fn try_refresh(&self, today: Date) -> Result<RefreshOutcome, EngineError> {
        let configured = self.state.config.read().await.wallpaper.target;

        let store = self.state.store.lock().await;
        let mut sync_state = store.sync_state()?;
        let newest = store.most_recent_image()?;

        let outcome = self
            .policy
            .evaluate(&mut sync_state, configured, today, newest.as_ref())?;

        match outcome {
            RefreshOutcome::Drift | RefreshOutcome::Applied { .. } => {
                store.put_sync_state(&sync_state)?;
            }
            _ => {}
        }

        if let RefreshOutcome::Applied { date, .. } = outcome {
            let _ = self.state.events.send(SyncEvent::WallpaperRefreshed {
                date,
                surface: configured,
            });
        }

        Ok(outcome)
    }

    /// Arm daily mode and immediately attempt a refresh.
    ///
    /// This is the explicit user action behind the Idle → Armed
    /// transition.
    pub async fn enable_daily_mode(&self) -> Result<RefreshOutcome, EngineError> {
        let configured = self.state.config.read().await.wallpaper.target;
        {
            let store = self.state.store.lock().await;
            let mut sync_state = store.sync_state()?;
            RefreshPolicy::arm(&mut sync_state, configured);
            store.put_sync_state(&sync_state)?;
        }
        info!("Daily mode armed for {}", configured);

        self.try_refresh(local_today()).await
    }

    /// Disarm daily mode.
    pub async fn disable_daily_mode(&self) -> Result<(), EngineError> {
        let store = self.state.store.lock().await;
        let mut sync_state = store.sync_state()?;
        RefreshPolicy::disarm(&mut sync_state);
        store.put_sync_state(&sync_state)?;
        info!("Daily mode disarmed");
        Ok(())
    }
}

/// The current local calendar day (UTC when the local offset cannot be
/// determined).
pub fn local_today() -> Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}
