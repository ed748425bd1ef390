//! I/O awaitables — futures that drive one io_uring submission to its
//! completion.
//!
//! Grounded on `ksvc_module::basic_iouring`'s submit-then-reap shape, but
//! expressed as `Future<Output = i32>` instead of a callback: each
//! awaitable follows the same three-step protocol on every poll:
//!
//! 1. First poll: build the SQE, stamp its `user_data` with this
//!    awaitable's own [`RequestSlot`] address, hand it to the current
//!    context, record the waker, return `Pending`.
//! 2. A later poll before completion: re-record the waker (it may have
//!    changed — a combinator re-pinning under a new parent) and stay
//!    `Pending`.
//! 3. Once the context's drive loop has reaped this request's completion
//!    and written its result, return `Ready(result)` — `result` follows
//!    raw io_uring/syscall convention: non-negative is a byte count or fd,
//!    negative is `-errno`.
//!
//! `result` is plain `i32` rather than a `Result<..>` because the source
//! never validates the result itself — interpreting it (EAGAIN vs a real
//! error vs a short read) is the caller's job, same as the raw source's
//! `reap_info.result`.
//!
//! # Buffer lifetime
//!
//! `Recv`/`Send`/`Read`/`Write` borrow their buffer for the awaitable's
//! whole lifetime, which is sound for the golden path (poll to
//! completion) because the borrow checker keeps the buffer alive at
//! least as long as the awaitable that holds it. Dropping the awaitable
//! *before* completion still leaves an in-flight kernel write targeting
//! that borrowed memory; see `IoFuture`'s `Drop` impl for the mitigation
//! this crate takes (best-effort cancel, heap-leak the request slot)
//! and why a full ownership-transfer API (buffer handed to the kernel,
//! handed back on completion, à la `tokio-uring`) is out of scope here.

use ringrt_core::cookie::Cookie;
use ringrt_core::entry::OpKind;
use ringrt_core::request::RequestSlot;
use ringrt_runtime::timer::TimerHandle;
use ringrt_runtime::tls;

use io_uring::{opcode, squeue::Entry, types};
use std::future::Future;
use std::marker::PhantomData;
use std::os::unix::io::RawFd;
use std::pin::Pin;
use std::task::{Context as TaskCx, Poll};
use std::time::{Duration, Instant};

/// Generic driver shared by every ring-backed awaitable in this module.
/// `_borrow` ties the awaitable's lifetime to whatever buffer the
/// concrete op closed over when it built `entry`.
pub struct IoFuture<'a> {
    slot: Box<RequestSlot>,
    entry: Option<Entry>,
    _borrow: PhantomData<&'a mut ()>,
}

impl<'a> IoFuture<'a> {
    fn new(entry: Entry, op: OpKind) -> Self {
        Self {
            slot: Box::new(RequestSlot::new(op)),
            entry: Some(entry),
            _borrow: PhantomData,
        }
    }
}

impl<'a> Future for IoFuture<'a> {
    type Output = i32;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskCx<'_>) -> Poll<i32> {
        let this = self.get_mut();
        if let Some(entry) = this.entry.take() {
            let cookie = Cookie::from_ptr(this.slot.as_ref() as *const RequestSlot);
            this.slot.set_waker(cx.waker().clone());
            let entry = entry.user_data(cookie.0);
            tls::with_current(|ctx| ctx.submit(entry));
            return Poll::Pending;
        }
        if this.slot.is_done() {
            Poll::Ready(this.slot.result())
        } else {
            this.slot.set_waker(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl<'a> Drop for IoFuture<'a> {
    fn drop(&mut self) {
        if self.entry.is_some() || self.slot.is_done() {
            // Never submitted, or already reaped: the box frees normally.
            return;
        }
        // Submitted but not yet completed — the kernel still holds a
        // pointer to `*self.slot`. Ask for a best-effort cancellation and
        // leak the slot rather than risk a completion landing on freed
        // memory; the leaked allocation is reclaimed only by the process
        // exiting, which is the deliberate trade-off documented above.
        let op = self.slot.op();
        ringrt_core::klog_warn!("abandoning in-flight {} request, leaking its slot", op.as_str());
        let cookie = Cookie::from_ptr(self.slot.as_ref() as *const RequestSlot);
        let leaked = std::mem::replace(&mut self.slot, Box::new(RequestSlot::new(op)));
        Box::leak(leaked);
        if tls::is_in_context() {
            let cancel = opcode::AsyncCancel::new(cookie.0).build();
            tls::with_current(|ctx| ctx.submit(cancel));
        }
    }
}

/// A no-op ring round-trip. Useful for measuring wake-up latency and for
/// tests that want a minimal completion without touching a real fd.
pub fn nop() -> IoFuture<'static> {
    IoFuture::new(opcode::Nop::new().build(), OpKind::Nop)
}

pub fn recv(fd: RawFd, buf: &mut [u8], flags: i32) -> IoFuture<'_> {
    let entry = opcode::Recv::new(types::Fd(fd), buf.as_mut_ptr(), buf.len() as u32)
        .flags(flags)
        .build();
    IoFuture::new(entry, OpKind::Recv)
}

pub fn send(fd: RawFd, buf: &[u8], flags: i32) -> IoFuture<'_> {
    let entry = opcode::Send::new(types::Fd(fd), buf.as_ptr(), buf.len() as u32)
        .flags(flags)
        .build();
    IoFuture::new(entry, OpKind::Send)
}

pub fn read(fd: RawFd, buf: &mut [u8], offset: u64) -> IoFuture<'_> {
    let entry = opcode::Read::new(types::Fd(fd), buf.as_mut_ptr(), buf.len() as u32)
        .offset(offset)
        .build();
    IoFuture::new(entry, OpKind::Read)
}

pub fn write(fd: RawFd, buf: &[u8], offset: u64) -> IoFuture<'_> {
    let entry = opcode::Write::new(types::Fd(fd), buf.as_ptr(), buf.len() as u32)
        .offset(offset)
        .build();
    IoFuture::new(entry, OpKind::Write)
}

/// Accept one connection on `listener_fd`. `addr`/`addr_len` follow the
/// raw `accept4` convention — pass zeroed storage and ignore it unless
/// the peer address is needed.
pub fn accept<'a>(
    listener_fd: RawFd,
    addr: &'a mut libc::sockaddr_storage,
    addr_len: &'a mut libc::socklen_t,
) -> IoFuture<'a> {
    let entry = opcode::Accept::new(
        types::Fd(listener_fd),
        addr as *mut _ as *mut libc::sockaddr,
        addr_len as *mut _,
    )
    .flags(libc::SOCK_CLOEXEC)
    .build();
    IoFuture::new(entry, OpKind::Accept)
}

pub fn connect<'a>(fd: RawFd, addr: &'a libc::sockaddr, addr_len: libc::socklen_t) -> IoFuture<'a> {
    let entry = opcode::Connect::new(types::Fd(fd), addr as *const _, addr_len).build();
    IoFuture::new(entry, OpKind::Connect)
}

/// Sleep until `deadline`, driven by the owning context's timer wheel
/// rather than the ring. Re-registers on every pending poll rather than
/// trusting "got woken" to mean "deadline passed" — a combinator may
/// share one waker across several sibling futures.
pub struct TimeoutAt {
    deadline: Instant,
    handle: Option<TimerHandle>,
}

impl TimeoutAt {
    pub fn new(deadline: Instant) -> Self {
        Self {
            deadline,
            handle: None,
        }
    }
}

impl Future for TimeoutAt {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut TaskCx<'_>) -> Poll<()> {
        let this = self.get_mut();
        if Instant::now() >= this.deadline {
            if let Some(h) = this.handle.take() {
                tls::with_current(|ctx| ctx.cancel_timer(h));
            }
            return Poll::Ready(());
        }
        if let Some(h) = this.handle.take() {
            tls::with_current(|ctx| ctx.cancel_timer(h));
        }
        let deadline = this.deadline;
        let waker = cx.waker().clone();
        let h = tls::with_current(|ctx| ctx.insert_timer(deadline, waker));
        this.handle = Some(h);
        Poll::Pending
    }
}

impl Drop for TimeoutAt {
    fn drop(&mut self) {
        if let Some(h) = self.handle.take() {
            if tls::is_in_context() {
                tls::with_current(|ctx| ctx.cancel_timer(h));
            }
        }
    }
}

/// Sleep for `duration` from now — `TimeoutAt::new(Instant::now() + duration)`.
pub fn timeout(duration: Duration) -> TimeoutAt {
    TimeoutAt::new(Instant::now() + duration)
}

pub fn timeout_at(deadline: Instant) -> TimeoutAt {
    TimeoutAt::new(deadline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_future_not_submitted_on_construction() {
        // Building an IoFuture must not touch thread-local context state
        // until the first poll — this lets tests construct one without a
        // running context as long as they never poll it.
        let fut = nop();
        drop(fut);
    }
}
