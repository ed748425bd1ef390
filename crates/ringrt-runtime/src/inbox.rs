//! Cross-thread inbox — the only shared state between contexts.
//!
//! Grounded on the reactor's `crossbeam_queue::ArrayQueue` usage
//! (`ksvc_gvthread::reactor::ReactorShared::request_queue`), but unbounded
//! (`SegQueue`) rather than bounded: a bounded inbox would silently drop
//! cross-context spawns under back-pressure, and a dropped spawn has no
//! recovery path for the caller.
//!
//! An item is a boxed thunk that starts a task on the receiving context.

use crossbeam_queue::SegQueue;

pub type InboxItem = Box<dyn FnOnce() + Send + 'static>;

pub struct Inbox {
    queue: SegQueue<InboxItem>,
}

impl Inbox {
    pub fn new() -> Self {
        Self {
            queue: SegQueue::new(),
        }
    }

    /// Single-producer-safe push from any thread.
    pub fn push(&self, item: InboxItem) {
        self.queue.push(item);
    }

    /// Pop one item, non-blocking. Called only by the owning context.
    pub fn pop(&self) -> Option<InboxItem> {
        self.queue.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn push_pop_fifo() {
        let inbox = Inbox::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for i in 0..3 {
            let c = counter.clone();
            inbox.push(Box::new(move || {
                c.fetch_add(i + 1, Ordering::Relaxed);
            }));
        }
        let mut ran = 0;
        while let Some(item) = inbox.pop() {
            item();
            ran += 1;
        }
        assert_eq!(ran, 3);
        assert_eq!(counter.load(Ordering::Relaxed), 6);
    }

    #[test]
    fn cross_thread_push() {
        let inbox = Arc::new(Inbox::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let inbox = inbox.clone();
            let counter = counter.clone();
            handles.push(std::thread::spawn(move || {
                inbox.push(Box::new(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                }));
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let mut ran = 0;
        while let Some(item) = inbox.pop() {
            item();
            ran += 1;
        }
        assert_eq!(ran, 4);
        assert_eq!(counter.load(Ordering::Relaxed), 4);
    }
}
