//! `SharedTask<T>` — a reference-counted task multiple coroutines can
//! await.
//!
//! Grounded on `original_source/test/move_shared_task.cpp`: several
//! awaiters can hold the same `shared_task`, each gets a clone of the
//! result, except the awaiter that happens to be the last live handle at
//! completion time, which gets to move the value out instead of cloning
//! it. Once moved out, the slot holds `T::default()` — a "moved-from"
//! value, not a panic on a second read — matching the source's own
//! documented move-shared-task behavior.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as TaskCx, Poll, Waker};

struct SharedState<T> {
    result: RefCell<Option<T>>,
    wakers: RefCell<Vec<Waker>>,
    done: Cell<bool>,
    live_handles: Cell<usize>,
}

/// A cloneable handle onto a single running computation. Every clone
/// observes the same result; see the module docs for the move-out rule.
pub struct SharedTask<T> {
    state: Rc<SharedState<T>>,
}

impl<T: 'static> SharedTask<T> {
    /// Start `fut` running immediately, same eager-execution contract as
    /// [`crate::task::Task::spawn`].
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = T> + 'static,
    {
        let state = Rc::new(SharedState {
            result: RefCell::new(None),
            wakers: RefCell::new(Vec::new()),
            done: Cell::new(false),
            live_handles: Cell::new(1),
        });
        let driver_state = state.clone();
        let driver = async move {
            let out = fut.await;
            *driver_state.result.borrow_mut() = Some(out);
            driver_state.done.set(true);
            for w in driver_state.wakers.borrow_mut().drain(..) {
                w.wake();
            }
        };
        crate::task::spawn_detached(driver);
        SharedTask { state }
    }
}

impl<T> Clone for SharedTask<T> {
    fn clone(&self) -> Self {
        self.state.live_handles.set(self.state.live_handles.get() + 1);
        SharedTask {
            state: self.state.clone(),
        }
    }
}

impl<T> Drop for SharedTask<T> {
    fn drop(&mut self) {
        self.state.live_handles.set(self.state.live_handles.get() - 1);
    }
}

impl<T: Clone + Default> Future for SharedTask<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskCx<'_>) -> Poll<T> {
        let this = self.get_mut();
        if !this.state.done.get() {
            this.state.wakers.borrow_mut().push(cx.waker().clone());
            return Poll::Pending;
        }
        // `.await` is about to drop this handle as soon as poll returns,
        // so `live_handles == 1` here means we are the last one standing
        // and may move the value out rather than clone it.
        let is_last = this.state.live_handles.get() == 1;
        let mut slot = this.state.result.borrow_mut();
        if is_last {
            Poll::Ready(slot.take().unwrap_or_default())
        } else {
            Poll::Ready(slot.clone().unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_tracks_live_handles() {
        // Exercises the bookkeeping without a running context: spawning
        // real work needs `tls::with_current`, covered by the integration
        // tests instead.
        let state = Rc::new(SharedState::<u32> {
            result: RefCell::new(Some(7)),
            wakers: RefCell::new(Vec::new()),
            done: Cell::new(true),
            live_handles: Cell::new(1),
        });
        let a = SharedTask { state };
        let b = a.clone();
        assert_eq!(a.state.live_handles.get(), 2);
        drop(b);
        assert_eq!(a.state.live_handles.get(), 1);
    }
}
