// BroadcastChannelManager: Centralized tokio broadcast channel management
// Single Responsibility: Broadcast channel lifecycle and subscription

use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::analysis::onset::OnsetEvent;
use crate::api::PresentationSnapshot;

/// Default buffer for each channel; lagging subscribers skip ahead
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

type Slot<T> = Mutex<Option<broadcast::Sender<T>>>;

fn lock_slot<T>(slot: &Slot<T>) -> MutexGuard<'_, Option<broadcast::Sender<T>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn init_slot<T: Clone>(slot: &Slot<T>, capacity: usize) -> broadcast::Sender<T> {
    let mut guard = lock_slot(slot);
    match guard.as_ref() {
        Some(tx) => tx.clone(),
        None => {
            let (tx, _) = broadcast::channel(capacity);
            *guard = Some(tx.clone());
            tx
        }
    }
}

fn publish_slot<T>(slot: &Slot<T>, value: T) -> usize {
    lock_slot(slot)
        .as_ref()
        .and_then(|tx| tx.send(value).ok())
        .unwrap_or(0)
}

/// Manages the tokio broadcast channels presentation code subscribes to
///
/// # Channel Types
/// - Snapshots: one `PresentationSnapshot` per processed message
/// - Onsets: accepted onsets with the tempo derived from them
///
/// Channels are created lazily. Publishing before a channel exists is a
/// no-op, so the ingest path never pays for channels nobody reads.
pub struct BroadcastChannelManager {
    snapshots: Slot<PresentationSnapshot>,
    onsets: Slot<OnsetEvent>,
    capacity: usize,
}

impl BroadcastChannelManager {
    /// Create a manager with all channels uninitialized
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: Mutex::new(None),
            onsets: Mutex::new(None),
            capacity: capacity.max(1),
        }
    }

    // ========================================================================
    // SNAPSHOT CHANNEL
    // ========================================================================

    /// Initialize the snapshot channel, or return the existing sender
    ///
    /// Re-initializing would orphan existing subscribers, so the first
    /// sender is kept for the lifetime of the manager.
    pub fn init_snapshots(&self) -> broadcast::Sender<PresentationSnapshot> {
        init_slot(&self.snapshots, self.capacity)
    }

    /// Subscribe to snapshots; `None` until `init_snapshots` has run
    pub fn subscribe_snapshots(&self) -> Option<broadcast::Receiver<PresentationSnapshot>> {
        lock_slot(&self.snapshots).as_ref().map(|tx| tx.subscribe())
    }

    /// Publish a snapshot, returning how many subscribers received it
    pub fn publish_snapshot(&self, snapshot: PresentationSnapshot) -> usize {
        publish_slot(&self.snapshots, snapshot)
    }

    // ========================================================================
    // ONSET CHANNEL
    // ========================================================================

    pub fn init_onsets(&self) -> broadcast::Sender<OnsetEvent> {
        init_slot(&self.onsets, self.capacity)
    }

    pub fn subscribe_onsets(&self) -> Option<broadcast::Receiver<OnsetEvent>> {
        lock_slot(&self.onsets).as_ref().map(|tx| tx.subscribe())
    }

    pub fn publish_onset(&self, event: OnsetEvent) -> usize {
        publish_slot(&self.onsets, event)
    }
}

impl Default for BroadcastChannelManager {
    fn default() -> Self {
        Self::new()
    }
}
