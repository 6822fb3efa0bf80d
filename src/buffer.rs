//! Capacity-bounded window of decoded frames shared by the preloader
//! (producer) and the foreground loop (consumer).
//!
//! One mutex guards the window and one condition variable carries both the
//! "room available" and "frames available" signals. Every waiter re-checks
//! its predicate after each wake and never sleeps longer than one wait slice,
//! so cancellation is observed within that slice.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::events::DecodedFrame;

#[derive(Debug)]
pub struct FrameBuffer {
    frames: Mutex<VecDeque<Arc<DecodedFrame>>>,
    changed: Condvar,
    capacity: usize,
    wait_slice: Duration,
    shutdown: CancellationToken,
}

impl FrameBuffer {
    pub fn new(capacity: usize, wait_slice: Duration, shutdown: CancellationToken) -> Self {
        Self {
            frames: Mutex::new(VecDeque::with_capacity(capacity)),
            changed: Condvar::new(),
            capacity,
            wait_slice,
            shutdown,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.lock().len() >= self.capacity
    }

    /// Append a frame at the tail, blocking while the window is full.
    ///
    /// Returns `false` without inserting if shutdown is signalled first.
    pub fn push(&self, frame: DecodedFrame) -> bool {
        let mut frames = self.lock();
        while frames.len() >= self.capacity {
            if self.shutdown.is_cancelled() {
                return false;
            }
            frames = self.wait(frames);
        }
        if self.shutdown.is_cancelled() {
            return false;
        }
        frames.push_back(Arc::new(frame));
        trace!(len = frames.len(), "frame appended");
        self.changed.notify_all();
        true
    }

    /// Wait at most one slice for headroom. Returns whether there is room now.
    pub fn wait_for_room(&self) -> bool {
        let frames = self.lock();
        if frames.len() < self.capacity {
            return true;
        }
        let frames = self.wait(frames);
        frames.len() < self.capacity
    }

    /// Block until at least `min_count` frames are buffered.
    ///
    /// Returns `false` if shutdown is signalled first. `min_count` is
    /// clamped to the capacity, since more could never arrive.
    pub fn wait_for_ready(&self, min_count: usize) -> bool {
        let min_count = min_count.min(self.capacity);
        let mut frames = self.lock();
        while frames.len() < min_count {
            if self.shutdown.is_cancelled() {
                return false;
            }
            frames = self.wait(frames);
        }
        true
    }

    /// Wait up to `timeout` for the window to grow beyond `seen` frames.
    pub fn wait_for_more(&self, seen: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut frames = self.lock();
        while frames.len() <= seen {
            let now = Instant::now();
            if now >= deadline || self.shutdown.is_cancelled() {
                return false;
            }
            let slice = (deadline - now).min(self.wait_slice);
            frames = self
                .changed
                .wait_timeout(frames, slice)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    /// Frame at `index`, or `None` when out of range (a caller bug).
    pub fn at(&self, index: usize) -> Option<Arc<DecodedFrame>> {
        self.lock().get(index).cloned()
    }

    /// Drop up to `n` frames from the head; returns how many were removed.
    /// Callers holding an index must shift it left by the returned count.
    pub fn trim_front(&self, n: usize) -> usize {
        let mut frames = self.lock();
        let n = n.min(frames.len());
        frames.drain(..n);
        debug!(removed = n, len = frames.len(), "trimmed frame window");
        self.changed.notify_all();
        n
    }

    /// Wake every waiter so it can observe cancellation.
    pub fn wake_all(&self) {
        let _frames = self.lock();
        self.changed.notify_all();
    }

    fn wait<'a>(
        &self,
        frames: MutexGuard<'a, VecDeque<Arc<DecodedFrame>>>,
    ) -> MutexGuard<'a, VecDeque<Arc<DecodedFrame>>> {
        let (frames, timeout) = self
            .changed
            .wait_timeout(frames, self.wait_slice)
            .unwrap_or_else(PoisonError::into_inner);
        if timeout.timed_out() {
            trace!("frame buffer wait slice elapsed");
        }
        frames
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Arc<DecodedFrame>>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
