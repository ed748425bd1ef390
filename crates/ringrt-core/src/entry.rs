//! Completion triples and the tags identifying what an I/O awaitable wants.
//!
//! Kept separate from `ringrt_runtime::ring` so that the runtime and the
//! awaitable types (in the `ringrt` facade crate) can share a vocabulary
//! without a dependency cycle — the same split `ksvc-core::entry` makes
//! between the wire-level record types and their consumers.

use crate::cookie::Cookie;

/// A single kernel completion: cookie, signed result, flags — verbatim
/// from the CQE, before any routing happens.
#[derive(Debug, Clone, Copy)]
pub struct Completion {
    pub cookie: Cookie,
    pub result: i32,
    pub flags: u32,
}

/// Which ring-supported operation an I/O awaitable represents.
///
/// Purely descriptive — carried on `RequestSlot` so a completion
/// abandoned before it arrives (see `ringrt::io`'s early-drop leak path)
/// can be logged by name instead of as an opaque pointer. The actual SQE
/// construction lives next to each awaitable type since each needs
/// different argument shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Recv,
    Send,
    Accept,
    Connect,
    Read,
    Write,
    Timeout,
    TimeoutAt,
    Nop,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Recv => "recv",
            OpKind::Send => "send",
            OpKind::Accept => "accept",
            OpKind::Connect => "connect",
            OpKind::Read => "read",
            OpKind::Write => "write",
            OpKind::Timeout => "timeout",
            OpKind::TimeoutAt => "timeout_at",
            OpKind::Nop => "nop",
        }
    }
}
