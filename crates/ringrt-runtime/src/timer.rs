//! The timer wheel — an ordered set of absolute deadlines.
//!
//! Grounded on `gvthread_runtime::timer::impls::heap::HeapTimerBackend`:
//! a `BinaryHeap` min-heap keyed by deadline with lazy cancellation
//! (cancelled handles recorded in a `HashSet`, skipped on pop rather than
//! removed from the heap in place). The "GVT to wake" field becomes a
//! `Waker` here, since suspension points are `.await` points on a Future,
//! not a green-thread id.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::Waker;
use std::time::Instant;

/// Unique handle for cancelling a timer before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        TimerHandle(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

struct TimerEntry {
    handle: TimerHandle,
    deadline: Instant,
    waker: Waker,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.handle == other.handle
    }
}
impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Reverse for a min-heap (earliest deadline pops first); tie-break
        // by insertion-ordered handle so same-tick timers fire in FIFO order.
        match other.deadline.cmp(&self.deadline) {
            CmpOrdering::Equal => other.handle.0.cmp(&self.handle.0),
            ord => ord,
        }
    }
}

/// Ordered set of absolute deadlines, one per execution context.
pub struct TimerWheel {
    heap: BinaryHeap<TimerEntry>,
    cancelled: HashSet<TimerHandle>,
}

impl TimerWheel {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            cancelled: HashSet::new(),
        }
    }

    /// Insert a new timer and return a handle that can cancel it.
    ///
    /// If `deadline` is already in the past, the caller is expected to
    /// notice via `fire_expired` on the very next call (the context's
    /// drive loop always fires expired timers before blocking, so a
    /// past deadline is observed within the same iteration rather than
    /// waiting a tick — this is `timeout_at`'s "strictly honored" rule).
    pub fn insert(&mut self, deadline: Instant, waker: Waker) -> TimerHandle {
        let handle = TimerHandle::new();
        self.heap.push(TimerEntry {
            handle,
            deadline,
            waker,
        });
        handle
    }

    /// Cancel a pending timer. No-op if it already fired or was never
    /// inserted in this wheel.
    pub fn cancel(&mut self, handle: TimerHandle) {
        self.cancelled.insert(handle);
        if self.heap.is_empty() {
            self.cancelled.clear();
        }
    }

    /// Earliest pending deadline, ignoring cancelled entries.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.drop_cancelled_front();
        self.heap.peek().map(|e| e.deadline)
    }

    /// Pop and return every timer whose deadline is `<= now`, in deadline
    /// order (ties broken by insertion order, see `Ord` above).
    pub fn fire_expired(&mut self, now: Instant) -> Vec<Waker> {
        let mut fired = Vec::new();
        loop {
            self.drop_cancelled_front();
            match self.heap.peek() {
                Some(e) if e.deadline <= now => {
                    let entry = self.heap.pop().expect("peeked Some");
                    fired.push(entry.waker);
                }
                _ => break,
            }
        }
        if self.heap.is_empty() {
            self.cancelled.clear();
        }
        fired
    }

    fn drop_cancelled_front(&mut self) {
        while let Some(e) = self.heap.peek() {
            if self.cancelled.remove(&e.handle) {
                self.heap.pop();
            } else {
                break;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Default for TimerWheel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn noop_waker() -> Waker {
        use std::task::{RawWaker, RawWakerVTable};
        fn clone(_: *const ()) -> RawWaker {
            raw()
        }
        fn noop(_: *const ()) {}
        fn raw() -> RawWaker {
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        unsafe { Waker::from_raw(raw()) }
    }

    #[test]
    fn fires_in_deadline_order() {
        let mut wheel = TimerWheel::new();
        let now = Instant::now();
        wheel.insert(now + Duration::from_millis(30), noop_waker());
        wheel.insert(now + Duration::from_millis(10), noop_waker());
        wheel.insert(now + Duration::from_millis(20), noop_waker());

        let fired = wheel.fire_expired(now + Duration::from_millis(25));
        assert_eq!(fired.len(), 2);
        assert!(wheel.next_deadline().is_some());
    }

    #[test]
    fn cancel_is_skipped() {
        let mut wheel = TimerWheel::new();
        let now = Instant::now();
        let handle = wheel.insert(now + Duration::from_millis(10), noop_waker());
        wheel.insert(now + Duration::from_millis(20), noop_waker());
        wheel.cancel(handle);

        let fired = wheel.fire_expired(now + Duration::from_millis(100));
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn past_deadline_fires_immediately() {
        let mut wheel = TimerWheel::new();
        let now = Instant::now();
        wheel.insert(now - Duration::from_millis(5), noop_waker());
        let fired = wheel.fire_expired(now);
        assert_eq!(fired.len(), 1);
    }
}
