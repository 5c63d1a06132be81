//! Trigger sources driving the engine.
//!
//! The engine never decides *when* to run; something external feeds it
//! triggers. [`TriggerSource`] is that seam; the host's alarms, boot
//! events, or anything else can sit behind it. The engine's only
//! assumption is that it enforces its own single-cycle gate, so a
//! trigger source is free to fire whenever it likes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::{EngineError, SyncEngine};

/// Why a sync cycle was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The trigger source just started.
    Startup,
    /// The periodic interval elapsed.
    Interval,
}

/// A source of sync triggers.
#[async_trait]
pub trait TriggerSource: Send {
    /// Wait for the next trigger; `None` means shut down.
    async fn next(&mut self) -> Option<Trigger>;
}

/// Fires once at startup, then on a fixed interval, until stopped.
pub struct IntervalTrigger {
    timer: tokio::time::Interval,
    started: bool,
    stop: watch::Receiver<bool>,
}

impl IntervalTrigger {
    /// Create a trigger firing every `period`, honoring `stop`.
    pub fn new(period: Duration, stop: watch::Receiver<bool>) -> Self {
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            timer,
            started: false,
            stop,
        }
    }
}

#[async_trait]
impl TriggerSource for IntervalTrigger {
    async fn next(&mut self) -> Option<Trigger> {
        loop {
            if *self.stop.borrow() {
                return None;
            }

            tokio::select! {
                _ = self.timer.tick() => {
                    return Some(if self.started {
                        Trigger::Interval
                    } else {
                        self.started = true;
                        Trigger::Startup
                    });
                }
                changed = self.stop.changed() => {
                    if changed.is_err() || *self.stop.borrow() {
                        return None;
                    }
                }
            }
        }
    }
}

/// Drive the engine from a trigger source until it runs dry.
///
/// Triggers arriving while a cycle is in flight are dropped;
/// cancellation ends the loop.
pub async fn run_triggered<T: TriggerSource>(engine: Arc<SyncEngine>, mut triggers: T) {
    while let Some(trigger) = triggers.next().await {
        debug!("Sync triggered ({:?})", trigger);

        match engine.run_cycle().await {
            Ok(summary) => {
                if summary.inserted > 0 || summary.refreshed {
                    info!(
                        "Synced: {} new image(s){}",
                        summary.inserted,
                        if summary.refreshed { ", wallpaper refreshed" } else { "" }
                    );
                }
            }
            Err(EngineError::CycleInProgress) => {
                debug!("Trigger coalesced; a cycle is already running");
            }
            Err(EngineError::Cancelled) => {
                info!("Sync cancelled");
                break;
            }
            Err(e) => warn!("Sync cycle failed: {}", e),
        }
    }

    info!("Trigger loop stopped");
}
