// Wire and presentation types shared by the ingest loop, the CLI and the
// debug HTTP surface

pub mod types;

pub use types::{InboundMessage, MoodSource, PresentationSnapshot, DEFAULT_CONFIDENCE, UNKNOWN_KEY};
