//! Textual status overlay for terminal presentation.

use crate::api::PresentationSnapshot;

/// Status lines shown over the visuals, top to bottom.
///
/// The key line only appears once the feed has reported a key.
pub fn status_lines(snapshot: &PresentationSnapshot) -> Vec<String> {
    let mut lines = vec![
        format!("Mood: {}", snapshot.mood),
        format!("Pitch: {:.1} Hz", snapshot.pitch),
        format!("Volume: {:.1}%", snapshot.rms * 100.0),
    ];
    if snapshot.has_known_key() {
        lines.push(format!("Key: {}", snapshot.detected_key));
    }
    lines
}

/// Single-line form used when redrawing in place.
pub fn status_line(snapshot: &PresentationSnapshot) -> String {
    let palette = snapshot.mood.palette();
    format!(
        "{} | hue {:>3} | {:>2} sides | tempo {:.0} BPM",
        status_lines(snapshot).join(" | "),
        palette.hue,
        palette.polygon_sides,
        snapshot.tempo.tempo_bpm
    )
}
