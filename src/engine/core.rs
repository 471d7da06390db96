//! EngineHandle: orchestration layer between feeds and presentation.
//!
//! The handle owns the single ingest path (`FeedState` behind a mutex),
//! the latest `PresentationSnapshot` behind an `RwLock`, the broadcast
//! channels presentation code subscribes to, and the time source that
//! stamps every message. CLI, replay and the debug HTTP server all share
//! one handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::analysis::{FeatureEngine, HistorySnapshot, IngestOutcome};
use crate::api::{InboundMessage, PresentationSnapshot};
use crate::config::AppConfig;
use crate::engine::backend::{Frame, MessageSource, SystemTimeSource, TimeSource};
use crate::engine::feed::FeedState;
use crate::error::{log_ingest_error, ConnectionError, IngestError};
use crate::managers::BroadcastChannelManager;
use crate::telemetry::{self, TelemetryHub};

#[path = "core_subscriptions.rs"]
mod core_subscriptions;

/// Counters for one `run_source` pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub frames_received: u64,
    pub messages_processed: u64,
    pub messages_dropped: u64,
    pub onsets: u64,
    pub mood_changes: u64,
}

impl IngestStats {
    fn record(&mut self, result: &Result<IngestOutcome, IngestError>) {
        self.frames_received += 1;
        match result {
            Ok(outcome) => {
                self.messages_processed += 1;
                if outcome.onset.is_some() {
                    self.onsets += 1;
                }
                if outcome.mood_changed_from.is_some() {
                    self.mood_changes += 1;
                }
            }
            Err(_) => self.messages_dropped += 1,
        }
    }
}

/// EngineHandle orchestrates the ingest path and shared channels.
pub struct EngineHandle {
    config: AppConfig,
    feed: Mutex<FeedState>,
    latest: RwLock<PresentationSnapshot>,
    pub(crate) broadcasts: BroadcastChannelManager,
    telemetry: Arc<TelemetryHub>,
    time_source: Arc<dyn TimeSource>,
    start_instant: Instant,
}

impl EngineHandle {
    /// Create a handle from the default config file and the wall clock.
    pub fn new() -> Self {
        Self::from_config(AppConfig::load())
    }

    pub fn from_config(config: AppConfig) -> Self {
        Self::with_time_source(config, Arc::new(SystemTimeSource::default()))
    }

    /// Create a handle stamped by `time_source`.
    ///
    /// Message timestamps are milliseconds since construction as seen by
    /// this source, so a manual clock yields fully deterministic runs.
    pub fn with_time_source(config: AppConfig, time_source: Arc<dyn TimeSource>) -> Self {
        let engine = FeatureEngine::from_config(&config);
        let broadcasts = BroadcastChannelManager::new();
        broadcasts.init_snapshots();
        let start_instant = time_source.now();

        Self {
            config,
            feed: Mutex::new(FeedState::new(engine)),
            latest: RwLock::new(PresentationSnapshot::default()),
            broadcasts,
            telemetry: telemetry::hub(),
            time_source,
            start_instant,
        }
    }

    /// Report telemetry to `hub` instead of the global one.
    pub fn with_telemetry(mut self, hub: Arc<TelemetryHub>) -> Self {
        self.telemetry = hub;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &Arc<TelemetryHub> {
        &self.telemetry
    }

    /// Milliseconds since the handle was created, as seen by the time source.
    pub fn now_ms(&self) -> f64 {
        self.time_source
            .now()
            .saturating_duration_since(self.start_instant)
            .as_micros() as f64
            / 1000.0
    }

    fn lock_feed(&self) -> Result<MutexGuard<'_, FeedState>, IngestError> {
        self.feed.lock().map_err(|_| IngestError::LockPoisoned {
            component: "feed".to_string(),
        })
    }

    // ========================================================================
    // INGEST
    // ========================================================================

    /// Process one raw frame from a source.
    pub fn handle_frame(&self, frame: &Frame) -> Result<IngestOutcome, IngestError> {
        match frame.as_text() {
            Ok(text) => self.handle_message(text),
            Err(err) => {
                self.reject(&err);
                Err(err)
            }
        }
    }

    /// Parse and apply one JSON text message.
    ///
    /// Malformed messages are logged, counted and dropped; engine state is
    /// left exactly as it was.
    pub fn handle_message(&self, text: &str) -> Result<IngestOutcome, IngestError> {
        match InboundMessage::parse(text) {
            Ok(message) => self.apply(&message),
            Err(err) => {
                self.reject(&err);
                Err(err)
            }
        }
    }

    /// Apply an already parsed message.
    pub fn apply(&self, message: &InboundMessage) -> Result<IngestOutcome, IngestError> {
        let now_ms = self.now_ms();
        let (outcome, snapshot) = {
            let mut feed = self.lock_feed()?;
            let outcome = feed.apply_message(message, now_ms);
            (outcome, feed.presentation())
        };

        if let Some(event) = outcome.onset {
            self.telemetry.record_onset(&event);
            self.broadcasts.publish_onset(event);
        }
        if let Some(previous) = outcome.mood_changed_from {
            self.telemetry
                .record_mood_change(previous, snapshot.features.mood);
        }
        self.telemetry.record_message(now_ms);
        self.publish(snapshot);

        Ok(outcome)
    }

    fn reject(&self, err: &IngestError) {
        log_ingest_error(err, "EngineHandle::handle_message");
        self.telemetry.record_dropped(err);

        let snapshot = match self.lock_feed() {
            Ok(mut feed) => {
                feed.record_drop();
                feed.presentation()
            }
            Err(_) => return,
        };
        self.store(snapshot);
    }

    fn store(&self, snapshot: PresentationSnapshot) {
        match self.latest.write() {
            Ok(mut latest) => *latest = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    fn publish(&self, snapshot: PresentationSnapshot) {
        self.store(snapshot.clone());
        self.broadcasts.publish_snapshot(snapshot);
    }

    /// Drive `source` until it ends, fails, or `shutdown` is set.
    ///
    /// Frames are processed one at a time to completion. Malformed frames
    /// are dropped without stopping the loop; transport errors end it and
    /// are returned so the caller can decide whether to reconnect.
    pub fn run_source(
        &self,
        source: &mut dyn MessageSource,
        shutdown: &AtomicBool,
    ) -> Result<IngestStats, ConnectionError> {
        let origin = source.describe();
        let mut stats = IngestStats::default();
        tracing::info!(source = %origin, "[Ingest] Feed started");

        while !shutdown.load(Ordering::SeqCst) {
            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!(source = %origin, "[Ingest] Feed ended");
                    break;
                }
                Err(err) => {
                    tracing::warn!(
                        source = %origin,
                        processed = stats.messages_processed,
                        "[Ingest] Feed failed: {}",
                        err
                    );
                    return Err(err);
                }
            };

            let result = self.handle_frame(&frame);
            stats.record(&result);
            if let Ok(outcome) = &result {
                if let Some(onset) = &outcome.onset {
                    tracing::debug!(
                        count = onset.onset_count,
                        tempo_bpm = onset.tempo_bpm,
                        "[Ingest] Onset"
                    );
                }
            }
        }

        tracing::info!(
            source = %origin,
            processed = stats.messages_processed,
            dropped = stats.messages_dropped,
            onsets = stats.onsets,
            "[Ingest] Feed stopped"
        );
        Ok(stats)
    }

    // ========================================================================
    // READ SIDE
    // ========================================================================

    /// Latest presentation snapshot (default until the first message).
    pub fn snapshot(&self) -> PresentationSnapshot {
        match self.latest.read() {
            Ok(latest) => latest.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Copies of both rolling histories, oldest first.
    pub fn history(&self) -> Result<HistorySnapshot, IngestError> {
        Ok(self.lock_feed()?.history())
    }
}


impl Default for EngineHandle {
    fn default() -> Self {
        Self::new()
    }
}
