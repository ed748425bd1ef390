//! # ringrt-runtime — the io_uring execution context
//!
//! Everything needed to drive one thread's worth of asynchronous I/O: a
//! ring driver, a timer wheel, a cross-thread inbox, an eventfd-based
//! wake-up, and the [`context::Context`] that ties them into a single
//! drive loop. The `ringrt` facade crate builds tasks, I/O awaitables and
//! combinators on top of what this crate exposes.

pub mod context;
pub mod inbox;
pub mod ring;
pub mod timer;
pub mod tls;
pub mod wake;

pub use context::{ContextConfig, ContextHandle, RunningContext};
