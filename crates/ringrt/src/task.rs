//! Task handles — spawned futures with an eager-start, awaitable join
//! handle.
//!
//! A C++ coroutine frame is compiler-generated; here the
//! compiler-generated state machine is an ordinary `async fn`/`async`
//! block, so "the task" is just a `Future`. What these types add on top
//! is eager execution on spawn, and a join handle that can itself be
//! `.await`ed for the result.
//!
//! Grounded on `gvthread_runtime::scheduler`'s spawn/run split, adapted
//! from "switch to a fiber's stack" to "poll a boxed future," and on the
//! classic waker-drives-an-Rc-frame pattern used by every from-scratch
//! single-threaded executor (the shape is identical to
//! `futures::task::ArcWake`, just `Rc` instead of `Arc` since a context
//! never shares a task across threads).

use ringrt_runtime::ContextHandle;

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::mem::ManuallyDrop;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as TaskCx, Poll, RawWaker, RawWakerVTable, Waker};

type BoxFuture = Pin<Box<dyn Future<Output = ()>>>;

struct Frame {
    future: RefCell<Option<BoxFuture>>,
}

impl Frame {
    fn run(self: Rc<Self>) {
        let Some(mut fut) = self.future.borrow_mut().take() else {
            // Already completed, or this wake raced a completion that
            // already consumed the future — nothing to do.
            return;
        };
        let waker = make_waker(self.clone());
        let mut cx = TaskCx::from_waker(&waker);
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {}
            Poll::Pending => {
                *self.future.borrow_mut() = Some(fut);
            }
        }
    }
}

fn raw_waker(frame: Rc<Frame>) -> RawWaker {
    RawWaker::new(Rc::into_raw(frame) as *const (), &VTABLE)
}

static VTABLE: RawWakerVTable = RawWakerVTable::new(clone_raw, wake_raw, wake_by_ref_raw, drop_raw);

unsafe fn clone_raw(ptr: *const ()) -> RawWaker {
    let frame = ManuallyDrop::new(Rc::from_raw(ptr as *const Frame));
    raw_waker(Rc::clone(&frame))
}

unsafe fn wake_raw(ptr: *const ()) {
    let frame = Rc::from_raw(ptr as *const Frame);
    frame.run();
}

unsafe fn wake_by_ref_raw(ptr: *const ()) {
    let frame = ManuallyDrop::new(Rc::from_raw(ptr as *const Frame));
    Rc::clone(&frame).run();
}

unsafe fn drop_raw(ptr: *const ()) {
    drop(Rc::from_raw(ptr as *const Frame));
}

fn make_waker(frame: Rc<Frame>) -> Waker {
    unsafe { Waker::from_raw(raw_waker(frame)) }
}

struct TaskState<T> {
    slot: Cell<Option<T>>,
    waker: Cell<Option<Waker>>,
    done: Cell<bool>,
}

/// A uniquely-owned handle to a spawned, already-running computation.
/// Awaiting it yields the task's result exactly once; dropping it without
/// awaiting lets the task keep running to completion in the background.
pub struct Task<T> {
    state: Rc<TaskState<T>>,
}

impl<T: 'static> Task<T> {
    /// Start `fut` running on the current context immediately, up to its
    /// first suspension point, and return a handle for its eventual
    /// result. Panics if called outside a running context (see
    /// [`ringrt_runtime::tls::with_current`]).
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = T> + 'static,
    {
        let state = Rc::new(TaskState {
            slot: Cell::new(None),
            waker: Cell::new(None),
            done: Cell::new(false),
        });
        let driver_state = state.clone();
        let driver: BoxFuture = Box::pin(async move {
            let out = fut.await;
            driver_state.slot.set(Some(out));
            driver_state.done.set(true);
            if let Some(w) = driver_state.waker.take() {
                w.wake();
            }
        });
        let frame = Rc::new(Frame {
            future: RefCell::new(Some(driver)),
        });
        frame.run();
        Task { state }
    }
}

impl<T> Future for Task<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskCx<'_>) -> Poll<T> {
        if self.state.done.get() {
            Poll::Ready(
                self.state
                    .slot
                    .take()
                    .expect("task result taken twice"),
            )
        } else {
            self.state.waker.set(Some(cx.waker().clone()));
            Poll::Pending
        }
    }
}

/// Start `fut` running on the current context, same as [`Task::spawn`],
/// but without keeping a join handle — a pure fire-and-forget spawn.
pub fn spawn_detached<F>(fut: F)
where
    F: Future<Output = ()> + 'static,
{
    let frame = Rc::new(Frame {
        future: RefCell::new(Some(Box::pin(fut))),
    });
    frame.run();
}

/// Post `fut` to run on a different context's thread. Detached: the
/// source thread has no join handle
/// into another context's `!Send` task graph, only the ability to kick
/// off work there. `fut` and its output must be `Send` to cross the
/// inbox boundary, even though the `Task` machinery that eventually
/// drives it on the target thread is not.
pub fn spawn_on<F>(handle: &ContextHandle, fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let thunk: Box<dyn FnOnce() + Send + 'static> = Box::new(move || {
        spawn_detached(fut);
    });
    handle.spawn_boxed(thunk);
}
