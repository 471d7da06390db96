// FeatureExtractor - rate-limited window statistics and mood classification
//
// Every call to `update` is cheap when rate limited; otherwise the full
// pitch/loudness windows are summarized and the mood is re-derived. The
// resulting FeatureSnapshot is immutable until the next recomputation.

use serde::{Deserialize, Serialize};

use crate::analysis::classifier::{Mood, MoodClassifier, MoodInputs};
use crate::analysis::history::RollingHistory;
use crate::config::{FeatureConfig, MoodThresholds};

/// Window statistics plus the mood derived from them
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub pitch_mean: f64,
    pub pitch_variance: f64,
    pub loudness_mean: f64,
    pub tempo_bpm: f64,
    pub mood: Mood,
    pub last_update_ms: f64,
}

impl FeatureSnapshot {
    fn mood_inputs(&self) -> MoodInputs {
        MoodInputs {
            pitch_mean: self.pitch_mean,
            pitch_variance: self.pitch_variance,
            loudness_mean: self.loudness_mean,
            tempo_bpm: self.tempo_bpm,
        }
    }
}

/// Arithmetic mean; NaN for an empty window
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    sum / count as f64
}

/// Population variance around a precomputed mean
pub fn population_variance<I>(values: I, mean: f64) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum_sq, count) = values.into_iter().fold((0.0, 0usize), |(acc, count), v| {
        let d = v - mean;
        (acc + d * d, count + 1)
    });
    sum_sq / count as f64
}

/// FeatureExtractor owns the current snapshot and the mood rules
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    classifier: MoodClassifier,
    snapshot: FeatureSnapshot,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::with_config(FeatureConfig::default(), MoodThresholds::default())
    }

    pub fn with_config(config: FeatureConfig, thresholds: MoodThresholds) -> Self {
        Self::with_classifier(config, MoodClassifier::new(thresholds))
    }

    pub fn with_classifier(config: FeatureConfig, classifier: MoodClassifier) -> Self {
        Self {
            config,
            classifier,
            snapshot: FeatureSnapshot::default(),
        }
    }

    pub fn snapshot(&self) -> &FeatureSnapshot {
        &self.snapshot
    }

    pub fn mood(&self) -> Mood {
        self.snapshot.mood
    }

    /// Recompute statistics and mood unless rate limited
    ///
    /// # Arguments
    /// * `pitch` - Pitch history window
    /// * `loudness` - Loudness history window
    /// * `tempo_bpm` - Current tempo estimate from the onset detector
    /// * `now_ms` - Current timestamp in milliseconds
    ///
    /// # Returns
    /// `true` when the snapshot was recomputed
    pub fn update(
        &mut self,
        pitch: &RollingHistory<f64>,
        loudness: &RollingHistory<f64>,
        tempo_bpm: f64,
        now_ms: f64,
    ) -> bool {
        if now_ms - self.snapshot.last_update_ms < self.config.update_interval_ms {
            return false;
        }

        let mut next = self.snapshot;

        if pitch.len() > self.config.min_samples_for_stats {
            next.pitch_mean = mean(pitch.iter());
            next.pitch_variance = population_variance(pitch.iter(), next.pitch_mean);
        }

        if loudness.len() > self.config.min_samples_for_stats {
            next.loudness_mean = mean(loudness.iter());
        }

        next.tempo_bpm = tempo_bpm;
        next.mood = self.classifier.classify(&next.mood_inputs());
        next.last_update_ms = now_ms;

        if next.mood != self.snapshot.mood {
            log::debug!(
                "[FeatureExtractor] Mood {} -> {} (pitch μ={:.1} σ²={:.1}, loudness μ={:.4}, tempo={:.1})",
                self.snapshot.mood,
                next.mood,
                next.pitch_mean,
                next.pitch_variance,
                next.loudness_mean,
                next.tempo_bpm
            );
        }

        self.snapshot = next;
        true
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
