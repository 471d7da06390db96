use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};

use crate::engine::core::EngineHandle;

pub type SnapshotStream = Sse<Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>>;

/// Build a Server-Sent Events stream of presentation snapshots.
pub fn snapshots(handle: &Arc<EngineHandle>) -> SnapshotStream {
    let stream = handle.snapshot_stream().filter_map(|snapshot| async move {
        match serde_json::to_string(&snapshot) {
            Ok(payload) => Some(Ok(Event::default().event("snapshot").data(payload))),
            Err(_) => None,
        }
    });

    Sse::new(Box::pin(stream) as Pin<Box<_>>).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(5))
            .text("debug-keepalive"),
    )
}
