use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ConnectionError;

use super::{Frame, ManualTimeSource, MessageSource};

/// Replays newline-delimited JSON messages, one frame per non-blank line.
pub struct ReplaySource {
    origin: String,
    lines: Lines<Box<dyn BufRead + Send>>,
}

impl ReplaySource {
    /// Open a recording on disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ConnectionError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| ConnectionError::ReplayRead {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::from_reader(path.display().to_string(), file))
    }

    /// Replay from any reader (in-memory recordings, stdin)
    pub fn from_reader<R: Read + Send + 'static>(origin: impl Into<String>, reader: R) -> Self {
        let buffered: Box<dyn BufRead + Send> = Box::new(BufReader::new(reader));
        Self {
            origin: origin.into(),
            lines: buffered.lines(),
        }
    }
}

impl MessageSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        for line in self.lines.by_ref() {
            let line = line.map_err(|err| ConnectionError::ReplayRead {
                path: self.origin.clone(),
                reason: err.to_string(),
            })?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                return Ok(Some(Frame::Text(trimmed.to_string())));
            }
        }
        Ok(None)
    }

    fn describe(&self) -> String {
        format!("replay:{}", self.origin)
    }
}

/// Advances a manual clock by a fixed step before yielding each frame
///
/// Gives recordings the producer's cadence without sleeping, so rate
/// limits and debounce windows behave as they would live.
pub struct PacedSource<S> {
    inner: S,
    clock: Arc<ManualTimeSource>,
    step: Duration,
}

impl<S: MessageSource> PacedSource<S> {
    pub fn new(inner: S, clock: Arc<ManualTimeSource>, step: Duration) -> Self {
        Self { inner, clock, step }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: MessageSource> MessageSource for PacedSource<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        let frame = self.inner.next_frame()?;
        if frame.is_some() {
            self.clock.advance(self.step);
        }
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("{} @ {}ms", self.inner.describe(), self.step.as_millis())
    }
}
