//! # ringrt — an io_uring-backed async runtime for Linux
//!
//! One execution context owns one OS thread and one io_uring ring
//! ([`ringrt_runtime::context`]); tasks spawned on it are ordinary Rust
//! futures driven to completion by a minimal, purpose-built executor
//! ([`task`]). I/O against that ring — `recv`/`send`/`accept`/`connect`/
//! `read`/`write`/timers — is exposed as awaitables in [`io`]; waiting on
//! several of them at once is [`combinators`]; a small TCP facade on top
//! of both lives in [`net`].
//!
//! ```no_run
//! use ringrt::context::{ContextConfig, RunningContext};
//! use ringrt::task;
//!
//! let ctx = RunningContext::start(ContextConfig::from_env()).unwrap();
//! task::spawn_on(&ctx.handle(), async {
//!     let doubled = task::Task::spawn(async { 21 }).await * 2;
//!     assert_eq!(doubled, 42);
//! });
//! ctx.stop();
//! ctx.join();
//! ```

pub mod combinators;
pub mod io;
pub mod net;
pub mod shared_task;
pub mod task;

pub use ringrt_runtime::context;
pub use ringrt_core::{address, error, log};
