// OnsetDetector - loudness spike detection and tempo estimation
//
// A note onset is inferred from a sudden jump in the loudness history:
// 1. Current loudness must clear an absolute floor
// 2. The loudness history must hold enough entries to compare against
// 3. The newest value must exceed the previous one by the spike ratio
// 4. Accepted onsets are debounced so one transient cannot trigger twice
//
// Tempo is derived from the interval between the last two accepted onsets
// and is not clamped.

use serde::{Deserialize, Serialize};

use crate::analysis::history::RollingHistory;
use crate::config::OnsetDetectionConfig;

/// Onset bookkeeping and running tempo estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TempoState {
    /// Timestamp of the last accepted onset (ms); `None` before the first onset
    pub last_onset_ms: Option<f64>,
    /// Interval between the last two accepted onsets (ms)
    pub inter_onset_interval_ms: f64,
    /// `60000 / inter_onset_interval_ms`, unclamped
    pub tempo_bpm: f64,
    /// Total accepted onsets
    pub onset_count: u64,
}

/// Detected note onset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetEvent {
    pub timestamp_ms: f64,
    pub loudness: f64,
    pub tempo_bpm: f64,
    pub onset_count: u64,
}

/// OnsetDetector watches the loudness history for note onsets
#[derive(Debug, Clone)]
pub struct OnsetDetector {
    config: OnsetDetectionConfig,
    state: TempoState,
}

impl OnsetDetector {
    pub fn new() -> Self {
        Self::with_config(OnsetDetectionConfig::default())
    }

    /// Create a detector with explicit thresholds
    pub fn with_config(config: OnsetDetectionConfig) -> Self {
        Self {
            config,
            state: TempoState::default(),
        }
    }

    pub fn state(&self) -> &TempoState {
        &self.state
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.state.tempo_bpm
    }

    /// Inspect the newest loudness value and record an onset if one occurred
    ///
    /// # Arguments
    /// * `loudness` - Loudness history, newest value last
    /// * `now_ms` - Current timestamp in milliseconds
    ///
    /// # Returns
    /// The accepted onset, or `None` when there was no candidate or it was
    /// debounced
    pub fn process(&mut self, loudness: &RollingHistory<f64>, now_ms: f64) -> Option<OnsetEvent> {
        if !self.is_candidate(loudness) {
            return None;
        }

        if let Some(last) = self.state.last_onset_ms {
            if now_ms - last < self.config.debounce_ms {
                log::trace!(
                    "[OnsetDetector] Candidate at {:.1}ms debounced ({:.1}ms since last onset)",
                    now_ms,
                    now_ms - last
                );
                return None;
            }
            // Only a second onset gives an interval to derive tempo from
            self.state.inter_onset_interval_ms = now_ms - last;
            self.state.tempo_bpm = 60_000.0 / self.state.inter_onset_interval_ms;
        }

        self.state.last_onset_ms = Some(now_ms);
        self.state.onset_count += 1;

        Some(OnsetEvent {
            timestamp_ms: now_ms,
            loudness: loudness.latest().unwrap_or_default(),
            tempo_bpm: self.state.tempo_bpm,
            onset_count: self.state.onset_count,
        })
    }

    fn is_candidate(&self, loudness: &RollingHistory<f64>) -> bool {
        if loudness.len() < self.config.min_history {
            return false;
        }

        match (loudness.nth_latest(0), loudness.nth_latest(1)) {
            (Some(current), Some(previous)) => {
                current > self.config.loudness_floor
                    && current > self.config.spike_ratio * previous
            }
            _ => false,
        }
    }
}

impl Default for OnsetDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(values: &[f64]) -> RollingHistory<f64> {
        let mut history = RollingHistory::with_capacity(100);
        for &value in values {
            history.push(value);
        }
        history
    }

    #[test]
    fn test_spike_is_detected() {
        let mut detector = OnsetDetector::new();
        let onset = detector.process(&history(&[0.01, 0.02, 0.08]), 0.0);

        let onset = onset.expect("spike above floor should be an onset");
        assert_eq!(onset.onset_count, 1);
        assert_eq!(onset.loudness, 0.08);
        assert_eq!(detector.state().last_onset_ms, Some(0.0));
        // First onset has no interval yet
        assert_eq!(detector.tempo_bpm(), 0.0);
    }

    #[test]
    fn test_requires_three_history_entries() {
        let mut detector = OnsetDetector::new();
        assert!(detector.process(&history(&[0.01, 0.09]), 0.0).is_none());
        assert_eq!(detector.state().onset_count, 0);
    }

    #[test]
    fn test_quiet_spike_below_floor_is_ignored() {
        let mut detector = OnsetDetector::new();
        // 0.04 is 4x the previous value but under the 0.05 floor
        assert!(detector.process(&history(&[0.01, 0.01, 0.04]), 0.0).is_none());
    }

    #[test]
    fn test_gradual_rise_is_not_a_spike() {
        let mut detector = OnsetDetector::new();
        // 0.09 is only 1.2x of 0.075
        assert!(detector
            .process(&history(&[0.06, 0.075, 0.09]), 0.0)
            .is_none());
    }

    #[test]
    fn test_ratio_boundary_is_exclusive() {
        let mut detector = OnsetDetector::new();
        // 0.375 is exactly 1.5x of 0.25
        assert!(detector
            .process(&history(&[0.01, 0.25, 0.375]), 0.0)
            .is_none());
    }

    #[test]
    fn test_debounce_and_tempo() {
        let mut detector = OnsetDetector::new();
        let mut loudness = history(&[0.01, 0.01, 0.08]);
        assert!(detector.process(&loudness, 0.0).is_some());

        loudness.push(0.01);
        loudness.push(0.08);
        assert!(
            detector.process(&loudness, 50.0).is_none(),
            "second spike within 100ms must be debounced"
        );
        assert_eq!(detector.state().onset_count, 1);

        loudness.push(0.01);
        loudness.push(0.08);
        let onset = detector.process(&loudness, 150.0).expect("onset after debounce");
        assert_eq!(onset.onset_count, 2);
        assert_eq!(detector.state().inter_onset_interval_ms, 150.0);
        assert_eq!(detector.tempo_bpm(), 400.0);
    }

    #[test]
    fn test_debounce_window_is_inclusive_at_boundary() {
        let mut detector = OnsetDetector::new();
        let mut loudness = history(&[0.01, 0.01, 0.08]);
        detector.process(&loudness, 1_000.0);
        loudness.push(0.01);
        loudness.push(0.08);

        let onset = detector.process(&loudness, 1_100.0);
        assert!(onset.is_some(), "exactly debounce_ms apart is accepted");
        assert_eq!(detector.tempo_bpm(), 600.0);
    }

    #[test]
    fn test_custom_thresholds() {
        let config = OnsetDetectionConfig {
            loudness_floor: 0.2,
            spike_ratio: 3.0,
            debounce_ms: 10.0,
            min_history: 2,
        };
        let mut detector = OnsetDetector::with_config(config);
        assert!(detector.process(&history(&[0.1, 0.25]), 0.0).is_none());
        assert!(detector.process(&history(&[0.05, 0.25]), 0.0).is_some());
    }
}
