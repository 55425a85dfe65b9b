//! Publish-by-replacement handoff of path sets to the render thread.
//!
//! The simulation thread wraps every new [`PathSet`] in an immutable
//! [`RenderSnapshot`] and pushes it through a lock-free SPSC ring. The render
//! thread adopts the newest snapshot it finds and sends the one it replaced
//! back through a second ring, so snapshots are only ever freed on the
//! simulation thread.

use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::acoustics::PathSet;
use crate::math::Pose;
use crate::spatial::RenderParams;

/// Default number of snapshots that can be in flight toward the render thread.
pub const DEFAULT_SNAPSHOT_CAPACITY: usize = 4;

/// Everything the renderer needs for one simulation tick. Never modified
/// after publication.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    /// Strictly increasing per publisher, starting at 1
    pub version: u64,
    pub paths: PathSet,
    pub listener: Pose,
    pub params: RenderParams,
}

/// Creates a connected publisher/subscriber pair.
pub fn snapshot_channel(capacity: usize) -> (SnapshotPublisher, SnapshotSubscriber) {
    let capacity = capacity.max(1);
    let (publish_tx, publish_rx) = HeapRb::<Arc<RenderSnapshot>>::new(capacity).split();
    // Room for everything the subscriber can adopt between two drains
    let (retire_tx, retire_rx) = HeapRb::<Arc<RenderSnapshot>>::new(capacity * 2 + 1).split();

    (
        SnapshotPublisher {
            publish: publish_tx,
            retire: retire_rx,
            pending: None,
            latest: None,
            next_version: 1,
        },
        SnapshotSubscriber {
            publish: publish_rx,
            retire: retire_tx,
            current: None,
            retiring: None,
        },
    )
}

/// Simulation-thread end of the handoff.
pub struct SnapshotPublisher {
    publish: HeapProd<Arc<RenderSnapshot>>,
    retire: HeapCons<Arc<RenderSnapshot>>,
    /// Newest snapshot that did not fit into the ring yet
    pending: Option<Arc<RenderSnapshot>>,
    latest: Option<Arc<RenderSnapshot>>,
    next_version: u64,
}

impl SnapshotPublisher {
    /// Publishes a new snapshot and returns its version.
    ///
    /// Never blocks. When the ring is full the snapshot waits in a pending
    /// slot, replacing any older pending one, and goes out on a later call.
    pub fn publish(&mut self, paths: PathSet, listener: Pose, params: RenderParams) -> u64 {
        self.collect_garbage();
        self.flush_pending();

        let version = self.next_version;
        self.next_version += 1;
        let snapshot = Arc::new(RenderSnapshot {
            version,
            paths,
            listener,
            params,
        });
        self.latest = Some(snapshot.clone());

        if self.pending.is_some() {
            log::warn!("Snapshot ring full, replacing pending snapshot with version {}", version);
            self.pending = Some(snapshot);
        } else if let Err(snapshot) = self.publish.try_push(snapshot) {
            log::warn!("Snapshot ring full, holding version {} back", version);
            self.pending = Some(snapshot);
        } else {
            log::debug!("Published snapshot version {}", version);
        }
        version
    }

    /// Retries the pending snapshot, if any.
    pub fn flush_pending(&mut self) {
        if let Some(snapshot) = self.pending.take() {
            if let Err(snapshot) = self.publish.try_push(snapshot) {
                self.pending = Some(snapshot);
            }
        }
    }

    /// Drops snapshots the render thread has finished with. Returns how many.
    pub fn collect_garbage(&mut self) -> usize {
        let mut dropped = 0;
        while self.retire.try_pop().is_some() {
            dropped += 1;
        }
        dropped
    }

    /// Most recently published snapshot, whether or not it was delivered yet.
    pub fn latest(&self) -> Option<&Arc<RenderSnapshot>> {
        self.latest.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Snapshots waiting in the ring.
    pub fn in_flight(&self) -> usize {
        self.publish.occupied_len()
    }
}

/// Render-thread end of the handoff. Neither allocates nor frees.
pub struct SnapshotSubscriber {
    publish: HeapCons<Arc<RenderSnapshot>>,
    retire: HeapProd<Arc<RenderSnapshot>>,
    current: Option<Arc<RenderSnapshot>>,
    /// Replaced snapshot that did not fit into the retire ring
    retiring: Option<Arc<RenderSnapshot>>,
}

impl SnapshotSubscriber {
    /// Adopts the newest delivered snapshot. Returns it when it changed.
    pub fn poll(&mut self) -> Option<&RenderSnapshot> {
        let mut changed = false;
        loop {
            if let Some(old) = self.retiring.take() {
                if let Err(old) = self.retire.try_push(old) {
                    // Keep the current snapshot until the old one can go back
                    self.retiring = Some(old);
                    break;
                }
            }
            let Some(next) = self.publish.try_pop() else {
                break;
            };
            self.retiring = self.current.replace(next);
            changed = true;
        }
        if changed { self.current.as_deref() } else { None }
    }

    pub fn current(&self) -> Option<&RenderSnapshot> {
        self.current.as_deref()
    }

    pub fn current_version(&self) -> u64 {
        self.current.as_ref().map_or(0, |snapshot| snapshot.version)
    }
}
