//! Configuration management for dynamic parameter tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling fast iteration without recompilation. The onset detector's
//! thresholds, the feature window, the mood rule constants and the
//! connection settings can all be adjusted via the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::history::MAX_HISTORY;

/// Default location of the JSON config file on desktop
pub const DEFAULT_CONFIG_PATH: &str = "assets/moodscope_config.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub onset_detection: OnsetDetectionConfig,
    pub features: FeatureConfig,
    pub mood: MoodThresholds,
    pub connection: ConnectionConfig,
    pub replay: ReplayConfig,
    pub presentation: PresentationConfig,
}

/// Onset detection parameters
///
/// The defaults are hand-tuned against the producer's RMS scale and kept
/// as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetDetectionConfig {
    /// Current loudness must exceed this floor for a candidate
    pub loudness_floor: f64,
    /// Newest loudness must exceed this multiple of the previous one
    pub spike_ratio: f64,
    /// Minimum spacing between accepted onsets in milliseconds
    pub debounce_ms: f64,
    /// Loudness history entries required before candidates are considered
    pub min_history: usize,
}

impl Default for OnsetDetectionConfig {
    fn default() -> Self {
        Self {
            loudness_floor: 0.05,
            spike_ratio: 1.5,
            debounce_ms: 100.0,
            min_history: 3,
        }
    }
}

/// Rolling window and recomputation cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Capacity of the pitch and loudness histories
    pub history_capacity: usize,
    /// Statistics are only refreshed once a history holds more entries than this
    pub min_samples_for_stats: usize,
    /// Minimum time between recomputations in milliseconds
    pub update_interval_ms: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            history_capacity: MAX_HISTORY,
            min_samples_for_stats: 10,
            update_interval_ms: 500.0,
        }
    }
}

/// Constants used by the ordered mood rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodThresholds {
    pub energetic_min_pitch_variance: f64,
    pub energetic_min_loudness: f64,
    pub melancholic_max_pitch_mean: f64,
    pub melancholic_max_loudness: f64,
    pub happy_min_tempo_bpm: f64,
    pub happy_min_loudness: f64,
    pub dreamy_max_pitch_variance: f64,
    pub dreamy_min_pitch_mean: f64,
}

impl Default for MoodThresholds {
    fn default() -> Self {
        Self {
            energetic_min_pitch_variance: 10_000.0,
            energetic_min_loudness: 0.07,
            melancholic_max_pitch_mean: 200.0,
            melancholic_max_loudness: 0.03,
            happy_min_tempo_bpm: 120.0,
            happy_min_loudness: 0.05,
            dreamy_max_pitch_variance: 2_000.0,
            dreamy_min_pitch_mean: 400.0,
        }
    }
}

/// Feed connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// WebSocket endpoint broadcasting pitch/rms frames
    pub url: String,
    /// Delay before reconnecting after the feed drops
    pub reconnect_delay_ms: u64,
    /// Reconnect attempts before giving up (0 disables reconnecting)
    pub max_reconnect_attempts: u32,
    /// Capacity of the frame queue between the socket reader and ingest
    pub frame_queue_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8000/ws".to_string(),
            reconnect_delay_ms: 2_000,
            max_reconnect_attempts: 5,
            frame_queue_capacity: 256,
        }
    }
}

/// Deterministic replay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Simulated spacing between recorded messages
    ///
    /// 23 ms matches one 1024-sample block at 44.1 kHz.
    pub message_interval_ms: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            message_interval_ms: 23,
        }
    }
}

/// Read-only presentation surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Interval between overlay refreshes in the CLI
    pub redraw_interval_ms: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            redraw_interval_ms: 100,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults when the file is missing
    /// or its JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset path
    pub fn load() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.onset_detection.loudness_floor, 0.05);
        assert_eq!(config.onset_detection.spike_ratio, 1.5);
        assert_eq!(config.onset_detection.debounce_ms, 100.0);
        assert_eq!(config.features.history_capacity, 100);
        assert_eq!(config.features.update_interval_ms, 500.0);
        assert_eq!(config.mood.energetic_min_pitch_variance, 10_000.0);
        assert_eq!(config.connection.url, "ws://localhost:8000/ws");
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.mood, config.mood);
        assert_eq!(
            parsed.features.min_samples_for_stats,
            config.features.min_samples_for_stats
        );
    }

    #[test]
    fn test_partial_file_falls_back_per_field() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{ "onset_detection": { "debounce_ms": 250.0 } }"#).unwrap();

        assert_eq!(parsed.onset_detection.debounce_ms, 250.0);
        assert_eq!(parsed.onset_detection.spike_ratio, 1.5);
        assert_eq!(parsed.features.history_capacity, 100);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_file("definitely/not/here.json");
        assert_eq!(config.replay.message_interval_ms, 23);
    }
}
