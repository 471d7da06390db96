//! Backend abstractions for the engine core.
//!
//! Two seams live here: where frames come from (`MessageSource`) and what
//! time it is (`TimeSource`). Both are traits so the live WebSocket feed and
//! deterministic replays drive the same ingest loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::{ConnectionError, IngestError};

/// Raw frame received from a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    /// Borrow the frame as UTF-8 text
    pub fn as_text(&self) -> Result<&str, IngestError> {
        match self {
            Frame::Text(text) => Ok(text),
            Frame::Binary(bytes) => std::str::from_utf8(bytes)
                .map_err(|_| IngestError::NonTextFrame { bytes: bytes.len() }),
        }
    }
}

/// Trait implemented by feed transports.
///
/// `next_frame` blocks until a frame arrives. `Ok(None)` means the feed
/// ended cleanly and no further frames will follow.
pub trait MessageSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, ConnectionError>;

    /// Human-readable origin used in logs
    fn describe(&self) -> String;
}

/// Trait representing a monotonic time source used for ingest timestamps.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Instant;
}

/// Default time source backed by `Instant::now`.
#[derive(Default)]
pub struct SystemTimeSource {
    _unit: (),
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced time source for replays and tests.
///
/// Time only moves when `advance` is called, so rate limits and debounce
/// windows can be crossed deterministically.
pub struct ManualTimeSource {
    start: Instant,
    offset_us: AtomicU64,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset_us: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let micros = u64::try_from(by.as_micros()).unwrap_or(u64::MAX);
        self.offset_us.fetch_add(micros, Ordering::SeqCst);
    }

    /// Whole milliseconds advanced so far
    pub fn elapsed_ms(&self) -> u64 {
        self.offset_us.load(Ordering::SeqCst) / 1_000
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Instant {
        self.start + Duration::from_micros(self.offset_us.load(Ordering::SeqCst))
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

mod replay;
mod websocket;

pub use replay::{PacedSource, ReplaySource};
pub use websocket::WebSocketSource;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_time_source_only_moves_on_advance() {
        let clock = ManualTimeSource::new();
        let t0 = clock.now();
        assert_eq!(clock.now(), t0);

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now().duration_since(t0), Duration::from_millis(250));
        assert_eq!(clock.elapsed_ms(), 250);
    }

    #[test]
    fn test_manual_time_source_keeps_sub_millisecond_steps() {
        let clock = ManualTimeSource::new();
        let t0 = clock.now();

        clock.advance(Duration::from_micros(500));
        assert_eq!(clock.now().duration_since(t0), Duration::from_micros(500));
        assert_eq!(clock.elapsed_ms(), 0);

        clock.advance(Duration::from_micros(500));
        assert_eq!(clock.now().duration_since(t0), Duration::from_millis(1));
        assert_eq!(clock.elapsed_ms(), 1);
    }

    #[test]
    fn test_binary_frames_decode_as_text() {
        let frame = Frame::Binary(br#"{"pitch":1,"rms":0}"#.to_vec());
        assert_eq!(frame.as_text().unwrap(), r#"{"pitch":1,"rms":0}"#);

        let garbage = Frame::Binary(vec![0xff, 0xfe, 0x00]);
        assert_eq!(
            garbage.as_text(),
            Err(IngestError::NonTextFrame { bytes: 3 })
        );
    }
}
