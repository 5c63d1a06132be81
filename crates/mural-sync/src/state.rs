//! Shared application state.
//!
//! One [`AppState`] is built at startup and shared by the engine, the
//! trigger loop, and any subscriber interested in sync events. The
//! store sits behind a `Mutex` so every mutation (record writes and
//! the read-modify-write of the persisted sync state) is serialized;
//! the stop channel carries the cooperative cancellation signal; and
//! the cycle gate guarantees at most one sync cycle runs at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use time::Date;
use tokio::sync::{Mutex, RwLock, broadcast, watch};

use mural_store::Store;
use mural_types::WallpaperSurface;

use crate::config::Config;
use crate::engine::CycleSummary;

/// Buffer size of the event broadcast channel.
const EVENT_BUFFER: usize = 16;

/// Shared application state.
pub struct AppState {
    /// The data store (wrapped in Mutex for serialized access).
    pub store: Mutex<Store>,
    /// Configuration (RwLock for runtime updates).
    pub config: RwLock<Config>,
    /// Broadcast channel for sync events.
    pub events: broadcast::Sender<SyncEvent>,
    /// Gate ensuring a single in-flight cycle.
    cycle_running: AtomicBool,
    /// Channel signalling cooperative cancellation.
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: Store, config: Config) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (stop_tx, stop_rx) = watch::channel(false);
        Arc::new(Self {
            store: Mutex::new(store),
            config: RwLock::new(config),
            events,
            cycle_running: AtomicBool::new(false),
            stop_tx,
            stop_rx,
        })
    }

    /// Try to claim the cycle gate. Returns false when a cycle is
    /// already in flight; the caller must not run one.
    pub fn try_begin_cycle(&self) -> bool {
        self.cycle_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the cycle gate.
    pub fn end_cycle(&self) {
        self.cycle_running.store(false, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Get a receiver for the stop signal.
    pub fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Signal the engine and trigger loop to stop.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

/// An event published after engine activity.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A sync cycle finished.
    CycleCompleted(CycleSummary),
    /// Daily mode pushed a new wallpaper to the device.
    WallpaperRefreshed {
        /// Publication day of the applied image.
        #[serde(with = "mural_types::dates::serde_iso")]
        date: Date,
        /// The surface(s) refreshed.
        surface: WallpaperSurface,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> Arc<AppState> {
        let store = Store::open_in_memory().unwrap();
        AppState::new(store, Config::default())
    }

    #[tokio::test]
    async fn test_cycle_gate_is_exclusive() {
        let state = test_state();

        assert!(state.try_begin_cycle());
        assert!(!state.try_begin_cycle());

        state.end_cycle();
        assert!(state.try_begin_cycle());
        state.end_cycle();
    }

    #[tokio::test]
    async fn test_stop_signal() {
        let state = test_state();
        assert!(!state.stop_requested());

        let rx = state.subscribe_stop();
        state.signal_stop();
        assert!(state.stop_requested());
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_events_reach_subscribers() {
        let state = test_state();
        let mut rx = state.events.subscribe();

        state
            .events
            .send(SyncEvent::CycleCompleted(CycleSummary::default()))
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SyncEvent::CycleCompleted(_)));
    }

    #[tokio::test]
    async fn test_event_serialization() {
        let event = SyncEvent::WallpaperRefreshed {
            date: Date::from_calendar_date(2021, time::Month::June, 1).unwrap(),
            surface: WallpaperSurface::Both,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("wallpaper_refreshed"));
        assert!(json.contains("2021-06-01"));
        assert!(json.contains("both"));
    }

    #[tokio::test]
    async fn test_store_access_through_state() {
        let state = test_state();
        let store = state.store.lock().await;
        assert_eq!(store.count_images().unwrap(), 0);
    }
}
