//! In-flight operation tracking for the loading indicator.
//!
//! Each long-running operation holds an [`ActivityGuard`]. The indicator is
//! visible while at least one guard is alive, so one operation finishing never
//! hides another that is still running. Guards end their operation on drop,
//! which covers the success and failure paths alike.
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    Signup,
    CreateListing,
    PlaceBid,
}

struct Inner {
    next_id: u64,
    in_flight: HashMap<u64, Operation>,
}

#[derive(Clone)]
pub struct ActivityTracker {
    inner: Arc<Mutex<Inner>>,
    visible: Arc<watch::Sender<bool>>,
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityTracker {
    pub fn new() -> Self {
        let (visible, _) = watch::channel(false);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                in_flight: HashMap::new(),
            })),
            visible: Arc::new(visible),
        }
    }

    pub fn begin(&self, operation: Operation) -> ActivityGuard {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.in_flight.insert(id, operation);
        debug!("{:<12} --> begin {:?} ({} in flight)", "Activity", operation, inner.in_flight.len());
        self.visible.send_replace(true);
        ActivityGuard {
            id,
            tracker: self.clone(),
        }
    }

    fn end(&self, id: u64) {
        let mut inner = self.inner.lock();
        if let Some(operation) = inner.in_flight.remove(&id) {
            debug!("{:<12} --> end {:?} ({} in flight)", "Activity", operation, inner.in_flight.len());
        }
        self.visible.send_replace(!inner.in_flight.is_empty());
    }

    pub fn is_busy(&self) -> bool {
        !self.inner.lock().in_flight.is_empty()
    }

    pub fn in_flight(&self) -> Vec<Operation> {
        self.inner.lock().in_flight.values().copied().collect()
    }

    /// Indicator visibility, updated whenever an operation begins or ends.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }
}

/// Keeps its operation in flight until dropped.
pub struct ActivityGuard {
    id: u64,
    tracker: ActivityTracker,
}

impl ActivityGuard {
    /// Ends the operation now rather than at end of scope.
    pub fn finish(self) {}
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.tracker.end(self.id);
    }
}
