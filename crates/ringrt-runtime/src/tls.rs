//! Thread-local "current context" pointer.
//!
//! Grounded on `gvthread_runtime::tls`. A global, module-level context
//! pointer only makes sense if there is exactly one context per process;
//! here there can be several, one per thread, so this is a thread-local
//! instead, set by `Context::run` on entry and cleared on loop exit — so
//! that free-standing `ringrt::spawn` and I/O awaitables can find "the
//! current context" without threading a reference through every
//! `async fn`.

use crate::context::Context;
use std::cell::Cell;

thread_local! {
    static CURRENT: Cell<*mut Context> = const { Cell::new(std::ptr::null_mut()) };
}

/// Set the current-context pointer for this thread. Safety: the pointee
/// must outlive every call to `with_current`/`current` made before
/// `clear()` runs — `Context::run` upholds this by clearing before it
/// returns, and never before the drive loop stops.
pub(crate) fn set_current(ctx: *mut Context) {
    CURRENT.with(|c| c.set(ctx));
}

pub(crate) fn clear_current() {
    CURRENT.with(|c| c.set(std::ptr::null_mut()));
}

pub fn is_in_context() -> bool {
    CURRENT.with(|c| !c.get().is_null())
}

/// Borrow the current context. Panics if called outside a running
/// context's drive loop — e.g. spawning an I/O awaitable from a plain OS
/// thread with no context, which is a programmer error, not a condition
/// to recover from.
pub fn with_current<R>(f: impl FnOnce(&mut Context) -> R) -> R {
    let ptr = CURRENT.with(|c| c.get());
    assert!(
        !ptr.is_null(),
        "ringrt: no execution context running on this thread"
    );
    // Safety: see `set_current`'s contract — the pointee is the `Context`
    // owned by this thread's `Context::run` call, alive for the duration
    // of the drive loop.
    f(unsafe { &mut *ptr })
}
