//! Telemetry event types exposed to the CLI and the debug HTTP surface.

use serde::{Deserialize, Serialize};

use crate::analysis::classifier::Mood;

/// Connection stages reported by the feed driver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
    GaveUp,
}

/// Metric events covering mood transitions, onsets, drops and connection state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    MoodChanged {
        from: Mood,
        to: Mood,
    },
    Onset {
        tempo_bpm: f64,
        onset_count: u64,
    },
    MessageDropped {
        code: i32,
        reason: String,
    },
    ConnectionLifecycle {
        phase: LifecyclePhase,
        timestamp_ms: u64,
    },
    IngestRate {
        messages_per_sec: f64,
    },
}
