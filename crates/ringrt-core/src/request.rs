//! The generic request/reap bridge between the scheduler and an awaitable.
//!
//! Two records meet here: the "I/O request record" (result + flags +
//! continuation, owned by the awaiter's future) and the "completion-reap
//! record" dequeued from the ready queue — either a bare continuation or
//! a pointer to a request record still needing its result copied in.
//! These are plain Rust types rather than a packed union; a union would
//! shave a few bytes but buys nothing a discriminated enum doesn't
//! already give for free.
//!
//! `RequestSlot` is the part every I/O awaitable embeds as an intrusive
//! header so the execution context can write a completion's result back
//! without knowing the awaitable's concrete type — it only ever sees a
//! `NonNull<RequestSlot>` recovered from the completion's cookie. All
//! fields are plain `Cell`s, not atomics: a request record is only ever
//! touched by the one thread that owns its context.

use crate::entry::OpKind;
use std::cell::Cell;
use std::ptr::NonNull;
use std::task::Waker;

/// Intrusive header embedded in every I/O awaitable's pinned request.
pub struct RequestSlot {
    op: OpKind,
    result: Cell<i32>,
    flags: Cell<u32>,
    waker: Cell<Option<Waker>>,
    done: Cell<bool>,
}

impl RequestSlot {
    pub fn new(op: OpKind) -> Self {
        Self {
            op,
            result: Cell::new(0),
            flags: Cell::new(0),
            waker: Cell::new(None),
            done: Cell::new(false),
        }
    }

    /// Which ring operation this slot belongs to, for logging when a
    /// completion is abandoned before it arrives (see `ringrt::io`'s
    /// early-drop leak path).
    pub fn op(&self) -> OpKind {
        self.op
    }

    /// Record the continuation to resume when this request's completion
    /// is reaped. Called from the awaitable's `poll` on first suspension,
    /// and again on every subsequent pending poll in case the awaiter's
    /// waker changed (a combinator re-pinning the future under a new
    /// parent, for instance).
    pub fn set_waker(&self, waker: Waker) {
        self.waker.set(Some(waker));
    }

    pub fn result(&self) -> i32 {
        self.result.get()
    }

    pub fn flags(&self) -> u32 {
        self.flags.get()
    }

    /// Distinct from `result() == 0`, since a zero result (e.g. `recv`
    /// reporting EOF) is a perfectly valid completion value.
    pub fn is_done(&self) -> bool {
        self.done.get()
    }

    /// Write a completion's result/flags and return the waker to resume,
    /// if one was recorded. Called only by the execution context while
    /// draining the ready queue.
    pub fn complete(&self, result: i32, flags: u32) -> Option<Waker> {
        self.result.set(result);
        self.flags.set(flags);
        self.done.set(true);
        self.waker.take()
    }
}

/// An item dequeued from the ready queue: either a bare continuation
/// (spawned task, timer fire, inbox handoff) or an I/O completion still
/// needing its result copied into the awaiter's `RequestSlot`.
pub enum ReapItem {
    Wake(Waker),
    Io {
        slot: NonNull<RequestSlot>,
        result: i32,
        flags: u32,
    },
}

// Safety: a `ReapItem` never crosses a thread boundary — it is created and
// consumed entirely within one execution context's drive loop. The `Send`
// impl exists only so it can sit in a `VecDeque` alongside other
// same-thread-only context state without auxiliary plumbing.
unsafe impl Send for ReapItem {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::{RawWaker, RawWakerVTable};

    fn noop_waker() -> Waker {
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
    fn complete_returns_waker_once() {
        let slot = RequestSlot::new(OpKind::Nop);
        slot.set_waker(noop_waker());
        let woken = slot.complete(42, 7);
        assert!(woken.is_some());
        assert_eq!(slot.result(), 42);
        assert_eq!(slot.flags(), 7);

        // A second complete with no waker set returns None.
        let woken2 = slot.complete(1, 0);
        assert!(woken2.is_none());
    }
}
