//! Diagnostics telemetry collector and helpers.
//!
//! The collector multiplexes mood transitions, onsets, dropped messages and
//! connection lifecycle events into a bounded history plus an async
//! broadcast stream.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

use crate::analysis::classifier::Mood;
use crate::analysis::onset::OnsetEvent;
use crate::error::{ErrorCode, IngestError};

pub mod events;

pub use events::{LifecyclePhase, MetricEvent};

/// Global telemetry hub shared across the crate.
static HUB: Lazy<Arc<TelemetryHub>> = Lazy::new(|| Arc::new(TelemetryHub::default()));

/// Access the global telemetry hub.
pub fn hub() -> Arc<TelemetryHub> {
    Arc::clone(&HUB)
}

/// Snapshot of collector state for HTTP/CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity: history_capacity.max(1),
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = lock_recovering(&self.history);
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = lock_recovering(&self.history);
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Counts messages over fixed windows to derive an ingest rate.
struct RateTracker {
    window_ms: f64,
    window_start_ms: Option<f64>,
    count: u64,
}

impl RateTracker {
    fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            window_start_ms: None,
            count: 0,
        }
    }

    /// Returns messages/sec once a full window has elapsed.
    fn observe(&mut self, now_ms: f64) -> Option<f64> {
        let start = *self.window_start_ms.get_or_insert(now_ms);
        self.count += 1;

        let elapsed = now_ms - start;
        if elapsed >= self.window_ms && elapsed > 0.0 {
            let rate = self.count as f64 * 1000.0 / elapsed;
            self.window_start_ms = Some(now_ms);
            self.count = 0;
            Some(rate)
        } else {
            None
        }
    }
}

/// Top-level hub wrapping the collector plus derived gauges.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    rate: Mutex<RateTracker>,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize, rate_window_ms: f64) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            rate: Mutex::new(RateTracker::new(rate_window_ms)),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.collector.snapshot()
    }

    pub fn record_mood_change(&self, from: Mood, to: Mood) {
        self.collector.publish(MetricEvent::MoodChanged { from, to });
    }

    pub fn record_onset(&self, event: &OnsetEvent) {
        self.collector.publish(MetricEvent::Onset {
            tempo_bpm: event.tempo_bpm,
            onset_count: event.onset_count,
        });
    }

    pub fn record_dropped(&self, err: &IngestError) {
        self.collector.publish(MetricEvent::MessageDropped {
            code: err.code(),
            reason: err.message(),
        });
    }

    pub fn record_connection_phase(&self, phase: LifecyclePhase) {
        self.collector.publish(MetricEvent::ConnectionLifecycle {
            phase,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    /// Count one processed message; emits `IngestRate` once per window.
    pub fn record_message(&self, now_ms: f64) {
        let rate = lock_recovering(&self.rate).observe(now_ms);
        if let Some(messages_per_sec) = rate {
            self.collector
                .publish(MetricEvent::IngestRate { messages_per_sec });
        }
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64, 1000.0)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
