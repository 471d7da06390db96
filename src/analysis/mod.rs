// Analysis module - streaming feature extraction and mood classification
//
// This module owns all state derived from the inbound pitch/loudness feed.
//
// Architecture:
// - FeatureEngine: single owner of histories, tempo and feature state
// - Pipeline per sample: RollingHistory push → OnsetDetector → FeatureExtractor
// - Output: FeatureSnapshot + TempoState read by presentation code
//
// The engine never fails on input. Non-finite values are stored as-is and
// propagate into the statistics.

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

pub mod classifier;
pub mod features;
pub mod history;
pub mod onset;

use classifier::Mood;
use features::{FeatureExtractor, FeatureSnapshot};
use history::RollingHistory;
use onset::{OnsetDetector, OnsetEvent, TempoState};

/// One pitch/loudness measurement from the feed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Fundamental frequency in Hz
    pub pitch: f64,
    /// Normalized RMS amplitude, typically 0.0-0.1
    pub loudness: f64,
    /// Pitch tracker confidence 0.0-1.0
    pub confidence: f64,
}

/// Copy of both rolling windows, oldest value first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub pitch: Vec<f64>,
    pub loudness: Vec<f64>,
    pub capacity: usize,
}

/// What a single ingest step changed
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IngestOutcome {
    /// Accepted onset, if the sample produced one
    pub onset: Option<OnsetEvent>,
    /// Whether the feature snapshot was recomputed
    pub features_updated: bool,
    /// Previous mood when a recomputation changed it
    pub mood_changed_from: Option<Mood>,
}

/// FeatureEngine ties the histories, onset detector and feature extractor
/// together behind a single `ingest` entry point
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    pitch_history: RollingHistory<f64>,
    loudness_history: RollingHistory<f64>,
    onset_detector: OnsetDetector,
    feature_extractor: FeatureExtractor,
    samples_ingested: u64,
}

impl FeatureEngine {
    pub fn new() -> Self {
        Self::from_config(&AppConfig::default())
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let capacity = config.features.history_capacity;
        Self {
            pitch_history: RollingHistory::with_capacity(capacity),
            loudness_history: RollingHistory::with_capacity(capacity),
            onset_detector: OnsetDetector::with_config(config.onset_detection.clone()),
            feature_extractor: FeatureExtractor::with_config(
                config.features.clone(),
                config.mood.clone(),
            ),
            samples_ingested: 0,
        }
    }

    /// Push a sample through the pipeline
    ///
    /// Order is fixed: histories first, then onset detection, then the
    /// (possibly rate-limited) feature update.
    pub fn ingest(&mut self, sample: Sample, now_ms: f64) -> IngestOutcome {
        self.pitch_history.push(sample.pitch);
        self.loudness_history.push(sample.loudness);
        self.samples_ingested += 1;

        let onset = self.onset_detector.process(&self.loudness_history, now_ms);
        if let Some(event) = &onset {
            log::debug!(
                "[FeatureEngine] Onset #{} at {:.1}ms (loudness={:.4}, tempo={:.1} BPM)",
                event.onset_count,
                event.timestamp_ms,
                event.loudness,
                event.tempo_bpm
            );
        }

        let previous_mood = self.feature_extractor.mood();
        let features_updated = self.update(now_ms);
        let current_mood = self.feature_extractor.mood();

        IngestOutcome {
            onset,
            features_updated,
            mood_changed_from: (current_mood != previous_mood).then_some(previous_mood),
        }
    }

    /// Rate-limited feature recomputation using the current tempo
    pub fn update(&mut self, now_ms: f64) -> bool {
        self.feature_extractor.update(
            &self.pitch_history,
            &self.loudness_history,
            self.onset_detector.tempo_bpm(),
            now_ms,
        )
    }

    pub fn features(&self) -> &FeatureSnapshot {
        self.feature_extractor.snapshot()
    }

    pub fn mood(&self) -> Mood {
        self.feature_extractor.mood()
    }

    pub fn tempo(&self) -> &TempoState {
        self.onset_detector.state()
    }

    pub fn pitch_history(&self) -> &RollingHistory<f64> {
        &self.pitch_history
    }

    pub fn loudness_history(&self) -> &RollingHistory<f64> {
        &self.loudness_history
    }

    pub fn history_snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            pitch: self.pitch_history.to_vec(),
            loudness: self.loudness_history.to_vec(),
            capacity: self.pitch_history.capacity(),
        }
    }

    pub fn samples_ingested(&self) -> u64 {
        self.samples_ingested
    }
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
