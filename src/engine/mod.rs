//! Engine module housing the ingest core.
//!
//! This module exposes trait-based sources and clocks (`backend`), the
//! per-message presentation state (`feed`) and the `EngineHandle`
//! orchestration layer (`core`) shared by the CLI and HTTP adapters.

pub mod backend;
pub mod core;
pub mod feed;

pub use backend::{
    Frame, ManualTimeSource, MessageSource, PacedSource, ReplaySource, SystemTimeSource,
    TimeSource, WebSocketSource,
};
pub use core::{EngineHandle, IngestStats};
pub use feed::FeedState;
