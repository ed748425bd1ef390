//! ringrt error taxonomy.
//!
//! Structural failures (ring setup, programmer errors) are fatal;
//! everything else is data callers branch on. Flat enum with a `Display`
//! impl, the same shape as `ksvc-core::error::KsvcError` — no external
//! error crate, matching the zero-dependency error style of `ksvc-core`
//! and `gerror`.

use std::fmt;

#[derive(Debug)]
pub enum RingError {
    /// `io_uring_setup` (or the builder's `build()`) failed. Fatal to the
    /// owning context.
    SetupFailed(i32),
    /// A prepared submission was rejected outright (not just queued for
    /// later — e.g. an invalid opcode on this kernel).
    SubmitFailed(i32),
    /// `wait_cqe` was interrupted by a signal. Spurious; callers retry.
    Interrupted,
    /// An OS-level errno not covered above.
    Os(i32),
}

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetupFailed(e) => write!(f, "io_uring setup failed: errno {e}"),
            Self::SubmitFailed(e) => write!(f, "io_uring submit failed: errno {e}"),
            Self::Interrupted => write!(f, "wait_cqe interrupted"),
            Self::Os(e) => write!(f, "OS error: errno {e}"),
        }
    }
}

impl std::error::Error for RingError {}

pub type Result<T> = std::result::Result<T, RingError>;
