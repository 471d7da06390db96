use super::*;
use crate::config::AppConfig;

fn sample(pitch: f64, loudness: f64) -> Sample {
    Sample {
        pitch,
        loudness,
        confidence: 0.9,
    }
}

#[test]
fn test_histories_respect_capacity() {
    let mut engine = FeatureEngine::new();

    for i in 0..250 {
        engine.ingest(sample(100.0 + i as f64, 0.01), i as f64 * 23.0);
        assert!(engine.pitch_history().len() <= 100);
        assert!(engine.loudness_history().len() <= 100);
    }

    let snapshot = engine.history_snapshot();
    assert_eq!(snapshot.pitch.len(), 100);
    assert_eq!(snapshot.loudness.len(), 100);
    assert_eq!(snapshot.pitch.first(), Some(&250.0));
    assert_eq!(snapshot.pitch.last(), Some(&349.0));
    assert_eq!(engine.samples_ingested(), 250);
}

#[test]
fn test_eleven_identical_pitches() {
    let mut engine = FeatureEngine::new();
    for i in 0..11 {
        engine.ingest(sample(440.0, 0.02), i as f64);
    }
    assert!(engine.update(500.0));

    assert_eq!(engine.features().pitch_mean, 440.0);
    assert_eq!(engine.features().pitch_variance, 0.0);
}

#[test]
fn test_ingest_runs_onset_before_features() {
    let mut engine = FeatureEngine::new();
    engine.ingest(sample(300.0, 0.01), 0.0);
    engine.ingest(sample(300.0, 0.01), 10.0);
    let outcome = engine.ingest(sample(300.0, 0.08), 20.0);

    assert!(outcome.onset.is_some());
    assert_eq!(engine.tempo().onset_count, 1);
    assert!(!outcome.features_updated, "first 500ms are rate limited");
}

#[test]
fn test_onset_debounce_and_tempo_through_ingest() {
    let mut engine = FeatureEngine::new();
    engine.ingest(sample(300.0, 0.01), -20.0);
    engine.ingest(sample(300.0, 0.01), -10.0);

    assert!(engine.ingest(sample(300.0, 0.08), 0.0).onset.is_some());
    engine.ingest(sample(300.0, 0.01), 25.0);
    assert!(engine.ingest(sample(300.0, 0.08), 50.0).onset.is_none());
    assert_eq!(engine.tempo().onset_count, 1);

    engine.ingest(sample(300.0, 0.01), 100.0);
    let onset = engine
        .ingest(sample(300.0, 0.08), 150.0)
        .onset
        .expect("onset after debounce window");
    assert_eq!(onset.tempo_bpm, 400.0);
    assert_eq!(engine.tempo().tempo_bpm, 60_000.0 / 150.0);
}

#[test]
fn test_tempo_reaches_feature_snapshot_on_next_update() {
    let mut engine = FeatureEngine::new();
    let mut now = 0.0;
    // Alternate quiet and loud samples every 250ms → 240 BPM
    for i in 0..12 {
        let loudness = if i % 2 == 0 { 0.01 } else { 0.07 };
        engine.ingest(sample(300.0, loudness), now);
        now += 125.0;
    }

    assert_eq!(engine.tempo().tempo_bpm, 240.0);
    assert!(engine.update(now + 1_000.0));
    assert_eq!(engine.features().tempo_bpm, 240.0);
    assert_eq!(engine.mood(), Mood::Neutral);
}

#[test]
fn test_mood_change_is_reported() {
    let mut engine = FeatureEngine::new();
    let mut last = IngestOutcome::default();
    for i in 0..20 {
        last = engine.ingest(sample(440.0, 0.04), 30.0 * i as f64);
    }
    // First recomputation lands on the sample at 510ms
    assert_eq!(engine.mood(), Mood::Dreamy);
    assert!(!last.features_updated);

    let mut changed = None;
    for i in 0..20 {
        let outcome = engine.ingest(sample(440.0, 0.04), 600.0 + 30.0 * i as f64);
        changed = changed.or(outcome.mood_changed_from);
    }
    assert_eq!(changed, None, "steady signal keeps its mood");
}

#[test]
fn test_non_finite_samples_do_not_panic() {
    let mut engine = FeatureEngine::new();
    for i in 0..15 {
        engine.ingest(sample(f64::NAN, f64::INFINITY), i as f64);
    }
    assert!(engine.update(1_000.0));
    assert!(engine.features().pitch_mean.is_nan());
    assert_eq!(engine.mood(), Mood::Neutral);
}

#[test]
fn test_custom_history_capacity() {
    let mut config = AppConfig::default();
    config.features.history_capacity = 16;
    let mut engine = FeatureEngine::from_config(&config);

    for i in 0..40 {
        engine.ingest(sample(200.0, 0.02), i as f64);
    }
    assert_eq!(engine.history_snapshot().capacity, 16);
    assert_eq!(engine.pitch_history().len(), 16);
}

#[test]
fn test_independent_instances() {
    let mut a = FeatureEngine::new();
    let b = FeatureEngine::new();
    a.ingest(sample(200.0, 0.02), 0.0);
    assert_eq!(a.samples_ingested(), 1);
    assert_eq!(b.samples_ingested(), 0);
    assert!(b.pitch_history().is_empty());
}
