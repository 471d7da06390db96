// Classifier - ordered rule-based mood classification
//
// Mood is derived from scratch on every recomputation from three window
// statistics and the current tempo. Rules are evaluated in priority order
// and the first match wins; there is no hysteresis, so any mood may follow
// any other.
//
// Default rule table:
// 1. pitch variance > 10000 AND loudness mean > 0.07 → Energetic
// 2. pitch mean < 200 AND loudness mean < 0.03       → Melancholic
// 3. tempo > 120 BPM AND loudness mean > 0.05        → Happy
// 4. pitch variance < 2000 AND pitch mean > 400      → Dreamy
// 5. otherwise                                       → Neutral

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::MoodThresholds;

/// Mood represents the coarse character of the incoming signal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// Wide pitch movement at high volume
    Energetic,
    /// Low and quiet
    Melancholic,
    /// Fast onsets at moderate volume
    Happy,
    /// Steady, high pitch
    Dreamy,
    /// Nothing stands out
    #[default]
    Neutral,
}

/// Visual parameters the mood visuals key off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoodPalette {
    /// Hue in degrees (HSL)
    pub hue: u16,
    /// Side count of the mood polygon
    pub polygon_sides: u8,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Mood::Energetic,
        Mood::Melancholic,
        Mood::Happy,
        Mood::Dreamy,
        Mood::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Energetic => "energetic",
            Mood::Melancholic => "melancholic",
            Mood::Happy => "happy",
            Mood::Dreamy => "dreamy",
            Mood::Neutral => "neutral",
        }
    }

    pub fn palette(&self) -> MoodPalette {
        let (hue, polygon_sides) = match self {
            Mood::Energetic => (0, 8),
            Mood::Melancholic => (240, 4),
            Mood::Happy => (60, 5),
            Mood::Dreamy => (280, 12),
            Mood::Neutral => (180, 3),
        };
        MoodPalette { hue, polygon_sides }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a mood label is not one of the known moods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMood(pub String);

impl fmt::Display for UnknownMood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mood label '{}'", self.0)
    }
}

impl std::error::Error for UnknownMood {}

impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str().eq_ignore_ascii_case(label))
            .ok_or_else(|| UnknownMood(s.to_string()))
    }
}

/// Statistics a mood decision is made from
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoodInputs {
    pub pitch_mean: f64,
    pub pitch_variance: f64,
    pub loudness_mean: f64,
    pub tempo_bpm: f64,
}

/// Single `(predicate, mood)` entry in the priority list
#[derive(Clone, Copy)]
pub struct MoodRule {
    pub mood: Mood,
    predicate: fn(&MoodInputs, &MoodThresholds) -> bool,
}

impl MoodRule {
    pub const fn new(mood: Mood, predicate: fn(&MoodInputs, &MoodThresholds) -> bool) -> Self {
        Self { mood, predicate }
    }

    pub fn matches(&self, inputs: &MoodInputs, thresholds: &MoodThresholds) -> bool {
        (self.predicate)(inputs, thresholds)
    }
}

impl fmt::Debug for MoodRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoodRule").field("mood", &self.mood).finish()
    }
}

fn is_energetic(i: &MoodInputs, t: &MoodThresholds) -> bool {
    i.pitch_variance > t.energetic_min_pitch_variance && i.loudness_mean > t.energetic_min_loudness
}

fn is_melancholic(i: &MoodInputs, t: &MoodThresholds) -> bool {
    i.pitch_mean < t.melancholic_max_pitch_mean && i.loudness_mean < t.melancholic_max_loudness
}

fn is_happy(i: &MoodInputs, t: &MoodThresholds) -> bool {
    i.tempo_bpm > t.happy_min_tempo_bpm && i.loudness_mean > t.happy_min_loudness
}

fn is_dreamy(i: &MoodInputs, t: &MoodThresholds) -> bool {
    i.pitch_variance < t.dreamy_max_pitch_variance && i.pitch_mean > t.dreamy_min_pitch_mean
}

/// Priority-ordered rule table; earlier entries win ties
pub const DEFAULT_RULES: [MoodRule; 4] = [
    MoodRule::new(Mood::Energetic, is_energetic),
    MoodRule::new(Mood::Melancholic, is_melancholic),
    MoodRule::new(Mood::Happy, is_happy),
    MoodRule::new(Mood::Dreamy, is_dreamy),
];

/// MoodClassifier evaluates the rule table against window statistics
#[derive(Debug, Clone)]
pub struct MoodClassifier {
    rules: Vec<MoodRule>,
    fallback: Mood,
    thresholds: MoodThresholds,
}

impl MoodClassifier {
    pub fn new(thresholds: MoodThresholds) -> Self {
        Self::with_rules(DEFAULT_RULES.to_vec(), thresholds)
    }

    /// Build a classifier from an explicit rule order
    pub fn with_rules(rules: Vec<MoodRule>, thresholds: MoodThresholds) -> Self {
        Self {
            rules,
            fallback: Mood::Neutral,
            thresholds,
        }
    }

    pub fn rules(&self) -> &[MoodRule] {
        &self.rules
    }

    pub fn thresholds(&self) -> &MoodThresholds {
        &self.thresholds
    }

    /// Classify using first-match-wins over the rule table
    ///
    /// NaN statistics fail every comparison and fall through to Neutral.
    pub fn classify(&self, inputs: &MoodInputs) -> Mood {
        self.rules
            .iter()
            .find(|rule| rule.matches(inputs, &self.thresholds))
            .map(|rule| rule.mood)
            .unwrap_or(self.fallback)
    }
}

impl Default for MoodClassifier {
    fn default() -> Self {
        Self::new(MoodThresholds::default())
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
