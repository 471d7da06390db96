use serde::{Deserialize, Serialize};

use crate::analysis::classifier::Mood;
use crate::analysis::features::FeatureSnapshot;
use crate::analysis::onset::TempoState;
use crate::analysis::Sample;
use crate::error::IngestError;

/// Confidence assumed when a message omits it or reports zero
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Key label shown until the feed reports one
pub const UNKNOWN_KEY: &str = "Unknown";

/// Message broadcast by the pitch/loudness producer
///
/// `pitch` and `rms` are required; every other field is optional and only
/// overwrites its local counterpart when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Fundamental frequency in Hz
    pub pitch: f64,
    /// RMS loudness of the analysed block
    pub rms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Mood computed upstream; takes precedence over the local mood
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    /// Musical key detected upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Tempo detected upstream in BPM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
}

impl InboundMessage {
    /// Parse a JSON text frame
    pub fn parse(text: &str) -> Result<Self, IngestError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_sample(&self) -> Sample {
        Sample {
            pitch: self.pitch,
            loudness: self.rms,
            confidence: self
                .confidence
                .filter(|c| *c != 0.0)
                .unwrap_or(DEFAULT_CONFIDENCE),
        }
    }

    /// Upstream mood, if present and recognised
    ///
    /// Empty labels count as absent. Unknown labels are logged and ignored
    /// so the local classification stays in effect.
    pub fn mood_override(&self) -> Option<Mood> {
        let label = self.mood.as_deref().filter(|s| !s.trim().is_empty())?;
        match label.parse::<Mood>() {
            Ok(mood) => Some(mood),
            Err(err) => {
                log::warn!("[Ingest] Ignoring upstream mood: {}", err);
                None
            }
        }
    }

    /// Upstream key, if present and non-empty
    pub fn key_override(&self) -> Option<&str> {
        self.key.as_deref().filter(|s| !s.is_empty())
    }

    /// Upstream tempo, if present and non-zero
    pub fn tempo_override(&self) -> Option<f64> {
        self.tempo.filter(|t| *t != 0.0)
    }
}

/// Where the effective mood came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodSource {
    #[default]
    Local,
    Upstream,
}

/// Everything presentation code may read, captured after one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationSnapshot {
    pub pitch: f64,
    pub rms: f64,
    pub confidence: f64,
    /// Effective mood: upstream override when present, otherwise local
    pub mood: Mood,
    pub mood_source: MoodSource,
    pub detected_key: String,
    pub detected_tempo: f64,
    /// Locally computed statistics and mood
    pub features: FeatureSnapshot,
    /// Local onset/tempo state
    pub tempo: TempoState,
    pub messages_received: u64,
    pub messages_dropped: u64,
    pub timestamp_ms: f64,
}

impl PresentationSnapshot {
    pub fn has_known_key(&self) -> bool {
        self.detected_key != UNKNOWN_KEY
    }
}

impl Default for PresentationSnapshot {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            rms: 0.0,
            confidence: 0.0,
            mood: Mood::Neutral,
            mood_source: MoodSource::Local,
            detected_key: UNKNOWN_KEY.to_string(),
            detected_tempo: 0.0,
            features: FeatureSnapshot::default(),
            tempo: TempoState::default(),
            messages_received: 0,
            messages_dropped: 0,
            timestamp_ms: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_confidence_defaults() {
        let msg = InboundMessage::parse(r#"{"pitch": 220.0, "rms": 0.03}"#).unwrap();
        let sample = msg.to_sample();
        assert_eq!(sample.confidence, 0.5);
        assert_eq!(sample.pitch, 220.0);
        assert_eq!(sample.loudness, 0.03);
        assert_eq!(msg.mood_override(), None);
    }

    #[test]
    fn test_zero_confidence_falls_back_to_default() {
        let msg =
            InboundMessage::parse(r#"{"pitch": 220.0, "rms": 0.03, "confidence": 0.0}"#).unwrap();
        assert_eq!(msg.to_sample().confidence, 0.5);

        let msg =
            InboundMessage::parse(r#"{"pitch": 220.0, "rms": 0.03, "confidence": 0.8}"#).unwrap();
        assert_eq!(msg.to_sample().confidence, 0.8);
    }

    #[test]
    fn test_optional_overrides() {
        let msg = InboundMessage::parse(
            r#"{"pitch": 440, "rms": 0.05, "mood": "happy", "key": "A minor", "tempo": 128}"#,
        )
        .unwrap();
        assert_eq!(msg.mood_override(), Some(Mood::Happy));
        assert_eq!(msg.key_override(), Some("A minor"));
        assert_eq!(msg.tempo_override(), Some(128.0));
    }

    #[test]
    fn test_falsy_overrides_count_as_absent() {
        let msg = InboundMessage::parse(
            r#"{"pitch": 440, "rms": 0.05, "mood": "", "key": "", "tempo": 0}"#,
        )
        .unwrap();
        assert_eq!(msg.mood_override(), None);
        assert_eq!(msg.key_override(), None);
        assert_eq!(msg.tempo_override(), None);
    }

    #[test]
    fn test_unknown_mood_is_ignored() {
        let msg = InboundMessage::parse(r#"{"pitch": 1, "rms": 0, "mood": "furious"}"#).unwrap();
        assert_eq!(msg.mood_override(), None);
    }

    #[test]
    fn test_null_optionals_are_absent() {
        let msg =
            InboundMessage::parse(r#"{"pitch": 1, "rms": 0, "confidence": null, "key": null}"#)
                .unwrap();
        assert_eq!(msg.confidence, None);
        assert_eq!(msg.key_override(), None);
    }

    #[test]
    fn test_malformed_messages_are_rejected() {
        let cases = [
            "",
            "not json",
            r#"{"pitch": 1}"#,
            r#"{"pitch": "high", "rms": 0.1}"#,
            r#"{"pitch": null, "rms": 0.1}"#,
        ];
        for raw in cases {
            match InboundMessage::parse(raw) {
                Err(IngestError::MalformedMessage { .. }) => {}
                other => panic!("Expected MalformedMessage for {:?}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_default_snapshot() {
        let snapshot = PresentationSnapshot::default();
        assert_eq!(snapshot.mood, Mood::Neutral);
        assert!(!snapshot.has_known_key());
    }
}
