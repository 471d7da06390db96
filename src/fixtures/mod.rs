//! Recording utilities for the deterministic CLI harness.
//!
//! This module discovers NDJSON recordings of the pitch/loudness feed,
//! parses optional expectation JSON, and replays recordings through an
//! `EngineHandle` driven by a manual clock. Replays never sleep: the clock
//! advances by the configured message interval before each frame.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analysis::classifier::Mood;
use crate::api::PresentationSnapshot;
use crate::config::AppConfig;
use crate::engine::backend::{ManualTimeSource, PacedSource, ReplaySource};
use crate::engine::core::{EngineHandle, IngestStats};
use crate::telemetry::TelemetryHub;

/// Default location for bundled recordings and expectations.
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

const RECORDING_EXTENSION: &str = "ndjson";

/// Metadata describing an available recording.
#[derive(Clone, Debug)]
pub struct RecordingMetadata {
    pub name: String,
    pub path: PathBuf,
    pub expect_path: Option<PathBuf>,
}

/// Recording resolved on disk plus its parsed expectations.
#[derive(Debug)]
pub struct RecordingData {
    pub metadata: RecordingMetadata,
    pub expectations: Option<RecordingExpectations>,
}

/// Inclusive numeric range used by expectations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpectedRange {
    pub min: f64,
    pub max: f64,
}

impl ExpectedRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// JSON expectation schema for recording verification.
///
/// Every check is optional; absent fields are not verified.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordingExpectations {
    pub recording: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Effective mood of the final snapshot
    #[serde(default)]
    pub final_mood: Option<Mood>,
    /// Locally classified mood of the final snapshot
    #[serde(default)]
    pub local_mood: Option<Mood>,
    #[serde(default)]
    pub min_onsets: Option<u64>,
    #[serde(default)]
    pub max_onsets: Option<u64>,
    #[serde(default)]
    pub tempo_bpm: Option<ExpectedRange>,
    #[serde(default)]
    pub detected_key: Option<String>,
    #[serde(default)]
    pub messages_dropped: Option<u64>,
}

impl RecordingExpectations {
    pub fn verify(&self, report: &ReplayReport) -> std::result::Result<(), ExpectationDiff> {
        let snapshot = &report.final_snapshot;
        let mut failures = Vec::new();
        let mut check = |field: &'static str, ok: bool, expected: Value, actual: Value| {
            if !ok {
                failures.push(ExpectationFailure {
                    field,
                    expected,
                    actual,
                });
            }
        };

        if let Some(mood) = self.final_mood {
            check("final_mood", snapshot.mood == mood, json!(mood), json!(snapshot.mood));
        }
        if let Some(mood) = self.local_mood {
            let local = snapshot.features.mood;
            check("local_mood", local == mood, json!(mood), json!(local));
        }
        if let Some(min) = self.min_onsets {
            let onsets = report.stats.onsets;
            check("min_onsets", onsets >= min, json!(min), json!(onsets));
        }
        if let Some(max) = self.max_onsets {
            let onsets = report.stats.onsets;
            check("max_onsets", onsets <= max, json!(max), json!(onsets));
        }
        if let Some(range) = self.tempo_bpm {
            let tempo = snapshot.tempo.tempo_bpm;
            check("tempo_bpm", range.contains(tempo), json!(range), json!(tempo));
        }
        if let Some(key) = &self.detected_key {
            check(
                "detected_key",
                snapshot.detected_key == *key,
                json!(key),
                json!(snapshot.detected_key),
            );
        }
        if let Some(dropped) = self.messages_dropped {
            let actual = report.stats.messages_dropped;
            check("messages_dropped", actual == dropped, json!(dropped), json!(actual));
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExpectationDiff { failures })
        }
    }
}

/// Outcome of comparing a replay report with expectations.
#[derive(Debug)]
pub struct ExpectationDiff {
    pub failures: Vec<ExpectationFailure>,
}

impl ExpectationDiff {
    pub fn to_json(&self) -> Value {
        json!({ "failures": self.failures })
    }
}

/// Detailed diff entry for a single failed check.
#[derive(Debug, Serialize)]
pub struct ExpectationFailure {
    pub field: &'static str,
    pub expected: Value,
    pub actual: Value,
}

/// Result of replaying one recording.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub recording: String,
    pub message_interval_ms: u64,
    pub stats: IngestStats,
    pub final_snapshot: PresentationSnapshot,
}

/// Catalog responsible for discovering recordings on disk.
pub struct RecordingCatalog {
    root: PathBuf,
}

impl RecordingCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all recordings by their metadata, sorted by name.
    pub fn discover(&self) -> Result<Vec<RecordingMetadata>> {
        let mut recordings = Vec::new();
        if !self.root.exists() {
            return Ok(recordings);
        }

        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("listing {}", self.root.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) == Some(RECORDING_EXTENSION) {
                    recordings.push(metadata_for_path(&path)?);
                }
            }
        }

        recordings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(recordings)
    }

    /// Resolve a recording by name or path and load its expectations.
    pub fn load(&self, recording: &str, override_expect: Option<PathBuf>) -> Result<RecordingData> {
        let path = self.resolve_recording_path(recording)?;
        let metadata = metadata_for_path(&path)?;

        let expectation_path = override_expect.or(metadata.expect_path.clone());
        let expectations = match expectation_path {
            Some(path) => Some(read_expectations(&path)?),
            None => None,
        };

        Ok(RecordingData {
            metadata,
            expectations,
        })
    }

    fn resolve_recording_path(&self, recording: &str) -> Result<PathBuf> {
        let as_path = Path::new(recording);
        if as_path.is_file() {
            return Ok(as_path.to_path_buf());
        }

        let candidate = self
            .root
            .join(format!("{recording}.{RECORDING_EXTENSION}"));
        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(anyhow!(
                "Recording '{recording}' not found in {}",
                self.root.display()
            ))
        }
    }
}

impl Default for RecordingCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FIXTURE_ROOT)
    }
}

fn metadata_for_path(path: &Path) -> Result<RecordingMetadata> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("Invalid recording name for {}", path.display()))?
        .to_string();
    let expect_path = path.with_extension("expect.json");
    Ok(RecordingMetadata {
        name,
        path: path.to_path_buf(),
        expect_path: expect_path.exists().then_some(expect_path),
    })
}

fn read_expectations(path: &Path) -> Result<RecordingExpectations> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading expectation {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

/// Replays recordings through a fresh, manually clocked engine.
pub struct ReplayRunner {
    config: AppConfig,
}

impl ReplayRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn with_message_interval(mut self, interval_ms: u64) -> Self {
        if interval_ms > 0 {
            self.config.replay.message_interval_ms = interval_ms;
        }
        self
    }

    pub fn run(&self, data: &RecordingData) -> Result<ReplayReport> {
        let interval_ms = self.config.replay.message_interval_ms;
        let clock = Arc::new(ManualTimeSource::new());
        let handle = EngineHandle::with_time_source(self.config.clone(), clock.clone())
            .with_telemetry(Arc::new(TelemetryHub::default()));

        let replay = ReplaySource::open(&data.metadata.path)?;
        let mut source = PacedSource::new(replay, clock, Duration::from_millis(interval_ms));
        let shutdown = AtomicBool::new(false);
        let stats = handle
            .run_source(&mut source, &shutdown)
            .with_context(|| format!("replaying {}", data.metadata.path.display()))?;

        Ok(ReplayReport {
            recording: data.metadata.name.clone(),
            message_interval_ms: interval_ms,
            stats,
            final_snapshot: handle.snapshot(),
        })
    }
}
