use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_moodscope"))
}

fn fixture_file(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

#[test]
fn replay_recording_succeeds() {
    let output = cli()
        .args(["replay", "--recording", "pulsing_beat"])
        .output()
        .expect("failed to run moodscope replay");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("replay report JSON payload");
    assert_eq!(json["recording"], "pulsing_beat");
    assert_eq!(json["message_interval_ms"], 23);
    assert_eq!(json["stats"]["messages_processed"], 120);
    assert_eq!(json["final_snapshot"]["mood"], "happy");
}

#[test]
fn replay_recording_by_path() {
    let output = cli()
        .args([
            "replay",
            "--recording",
            &fixture_file("upstream_override.ndjson"),
        ])
        .output()
        .expect("failed to run replay by path");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("report JSON");
    assert_eq!(json["final_snapshot"]["mood"], "energetic");
    assert_eq!(json["final_snapshot"]["mood_source"], "upstream");
    assert_eq!(json["final_snapshot"]["detected_key"], "E minor");
    assert_eq!(json["stats"]["messages_dropped"], 1);
}

#[test]
fn replay_detects_mismatch() {
    let output = cli()
        .args([
            "replay",
            "--recording",
            "pulsing_beat",
            "--expect",
            &fixture_file("pulsing_beat_incorrect.expect.json"),
        ])
        .output()
        .expect("failed to run mismatch replay");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(
        stderr.contains("\"failures\""),
        "expected diff JSON in stderr, got {stderr}"
    );
    assert!(stderr.contains("final_mood"));
}

#[test]
fn replay_unknown_recording_fails() {
    let output = cli()
        .args(["replay", "--recording", "no_such_recording"])
        .output()
        .expect("failed to run replay");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn dump_recordings_lists_assets() {
    let output = cli()
        .arg("dump-recordings")
        .output()
        .expect("failed to run dump-recordings");
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert!(
        stdout.contains("pulsing_beat") && stdout.contains("steady_high_notes"),
        "expected recording listing, got {stdout}"
    );
}

#[test]
fn dump_config_prints_defaults() {
    let output = cli()
        .arg("dump-config")
        .output()
        .expect("failed to run dump-config");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("config JSON");
    assert_eq!(json["onset_detection"]["spike_ratio"], 1.5);
    assert_eq!(json["features"]["history_capacity"], 100);
    assert_eq!(json["connection"]["url"], "ws://localhost:8000/ws");
}
