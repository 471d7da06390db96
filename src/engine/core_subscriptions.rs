use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::analysis::onset::OnsetEvent;
use crate::api::PresentationSnapshot;
use crate::telemetry::MetricEvent;

use super::EngineHandle;

impl EngineHandle {
    // ========================================================================
    // STREAM SUBSCRIPTIONS
    // ========================================================================

    /// Receive one snapshot per processed message.
    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<PresentationSnapshot> {
        self.broadcasts.init_snapshots().subscribe()
    }

    pub fn subscribe_onsets(&self) -> broadcast::Receiver<OnsetEvent> {
        self.broadcasts.init_onsets().subscribe()
    }

    pub fn telemetry_receiver(&self) -> broadcast::Receiver<MetricEvent> {
        self.telemetry.collector().subscribe()
    }

    // ========================================================================
    // ASYNC STREAM ADAPTERS
    // ========================================================================

    /// Snapshot stream that skips ahead when the subscriber lags.
    pub fn snapshot_stream(&self) -> impl Stream<Item = PresentationSnapshot> + Unpin {
        lossy_stream(self.subscribe_snapshots())
    }

    pub fn onset_stream(&self) -> impl Stream<Item = OnsetEvent> + Unpin {
        lossy_stream(self.subscribe_onsets())
    }

    pub fn telemetry_stream(&self) -> impl Stream<Item = MetricEvent> + Unpin {
        lossy_stream(self.telemetry_receiver())
    }

    /// Milliseconds elapsed since the handle was created (used for telemetry).
    pub fn uptime_ms(&self) -> u64 {
        self.now_ms().max(0.0) as u64
    }
}

fn lossy_stream<T: Clone + Send + 'static>(
    rx: broadcast::Receiver<T>,
) -> impl Stream<Item = T> + Unpin {
    BroadcastStream::new(rx).filter_map(|item| futures::future::ready(item.ok()))
}
