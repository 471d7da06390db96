// FeedState - per-message state layered on top of the FeatureEngine
//
// The feature engine only sees (pitch, loudness, confidence). Everything
// else a message carries is presentation state kept here:
// - current pitch/rms/confidence of the latest message
// - upstream mood override, valid for the current message only
// - upstream key and tempo, sticky until a message carries a new value

use crate::analysis::classifier::Mood;
use crate::analysis::{FeatureEngine, HistorySnapshot, IngestOutcome, Sample};
use crate::api::{InboundMessage, MoodSource, PresentationSnapshot, UNKNOWN_KEY};

#[derive(Debug, Clone)]
pub struct FeedState {
    engine: FeatureEngine,
    current: Sample,
    mood_override: Option<Mood>,
    detected_key: String,
    detected_tempo: f64,
    messages_received: u64,
    messages_dropped: u64,
    last_message_ms: f64,
}

impl FeedState {
    pub fn new(engine: FeatureEngine) -> Self {
        Self {
            engine,
            current: Sample {
                pitch: 0.0,
                loudness: 0.0,
                confidence: 0.0,
            },
            mood_override: None,
            detected_key: UNKNOWN_KEY.to_string(),
            detected_tempo: 0.0,
            messages_received: 0,
            messages_dropped: 0,
            last_message_ms: 0.0,
        }
    }

    /// Apply one parsed message at `now_ms`
    pub fn apply_message(&mut self, message: &InboundMessage, now_ms: f64) -> IngestOutcome {
        let sample = message.to_sample();
        let outcome = self.engine.ingest(sample, now_ms);

        self.current = sample;
        self.mood_override = message.mood_override();
        if let Some(key) = message.key_override() {
            self.detected_key = key.to_string();
        }
        if let Some(tempo) = message.tempo_override() {
            self.detected_tempo = tempo;
        }

        self.messages_received += 1;
        self.last_message_ms = now_ms;
        outcome
    }

    /// Count a frame that was rejected before reaching the engine
    pub fn record_drop(&mut self) {
        self.messages_dropped += 1;
    }

    /// Mood presentation should show: upstream override, else local
    pub fn effective_mood(&self) -> (Mood, MoodSource) {
        match self.mood_override {
            Some(mood) => (mood, MoodSource::Upstream),
            None => (self.engine.mood(), MoodSource::Local),
        }
    }

    pub fn presentation(&self) -> PresentationSnapshot {
        let (mood, mood_source) = self.effective_mood();
        PresentationSnapshot {
            pitch: self.current.pitch,
            rms: self.current.loudness,
            confidence: self.current.confidence,
            mood,
            mood_source,
            detected_key: self.detected_key.clone(),
            detected_tempo: self.detected_tempo,
            features: *self.engine.features(),
            tempo: *self.engine.tempo(),
            messages_received: self.messages_received,
            messages_dropped: self.messages_dropped,
            timestamp_ms: self.last_message_ms,
        }
    }

    pub fn history(&self) -> HistorySnapshot {
        self.engine.history_snapshot()
    }

    pub fn engine(&self) -> &FeatureEngine {
        &self.engine
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received
    }

    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped
    }
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new(FeatureEngine::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(raw: &str) -> InboundMessage {
        InboundMessage::parse(raw).unwrap()
    }

    #[test]
    fn test_current_values_follow_latest_message() {
        let mut feed = FeedState::default();
        feed.apply_message(&msg(r#"{"pitch": 220, "rms": 0.02}"#), 10.0);

        let snapshot = feed.presentation();
        assert_eq!(snapshot.pitch, 220.0);
        assert_eq!(snapshot.rms, 0.02);
        assert_eq!(snapshot.confidence, 0.5);
        assert_eq!(snapshot.messages_received, 1);
        assert_eq!(snapshot.timestamp_ms, 10.0);
        assert_eq!(snapshot.detected_key, "Unknown");
        assert!(!snapshot.has_known_key());
    }

    #[test]
    fn test_mood_override_lasts_one_message() {
        let mut feed = FeedState::default();

        feed.apply_message(&msg(r#"{"pitch": 220, "rms": 0.02, "mood": "happy"}"#), 0.0);
        let snapshot = feed.presentation();
        assert_eq!(snapshot.mood, Mood::Happy);
        assert_eq!(snapshot.mood_source, MoodSource::Upstream);
        // Local classification is untouched by the override
        assert_eq!(snapshot.features.mood, Mood::Neutral);

        feed.apply_message(&msg(r#"{"pitch": 220, "rms": 0.02}"#), 23.0);
        let snapshot = feed.presentation();
        assert_eq!(snapshot.mood, Mood::Neutral);
        assert_eq!(snapshot.mood_source, MoodSource::Local);
    }

    #[test]
    fn test_unknown_mood_label_keeps_local_mood() {
        let mut feed = FeedState::default();
        feed.apply_message(&msg(r#"{"pitch": 220, "rms": 0.02, "mood": "furious"}"#), 0.0);
        assert_eq!(feed.effective_mood(), (Mood::Neutral, MoodSource::Local));
    }

    #[test]
    fn test_key_and_tempo_are_sticky() {
        let mut feed = FeedState::default();

        feed.apply_message(
            &msg(r#"{"pitch": 440, "rms": 0.05, "key": "C major", "tempo": 96}"#),
            0.0,
        );
        feed.apply_message(&msg(r#"{"pitch": 440, "rms": 0.05}"#), 23.0);
        feed.apply_message(&msg(r#"{"pitch": 440, "rms": 0.05, "key": "", "tempo": 0}"#), 46.0);

        let snapshot = feed.presentation();
        assert_eq!(snapshot.detected_key, "C major");
        assert_eq!(snapshot.detected_tempo, 96.0);
        assert!(snapshot.has_known_key());
    }

    #[test]
    fn test_drops_are_counted_without_touching_state() {
        let mut feed = FeedState::default();
        feed.apply_message(&msg(r#"{"pitch": 330, "rms": 0.04}"#), 0.0);
        feed.record_drop();

        let snapshot = feed.presentation();
        assert_eq!(snapshot.messages_dropped, 1);
        assert_eq!(snapshot.messages_received, 1);
        assert_eq!(snapshot.pitch, 330.0);
        assert_eq!(feed.history().pitch, vec![330.0]);
    }
}
