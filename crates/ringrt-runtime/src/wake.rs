//! Cross-thread wake-up for a sleeping context.
//!
//! A spawning thread needs to wake a context that may be blocked in
//! `io_uring_enter`. The `io-uring` crate's safe API borrows the ring
//! mutably to build a submission, so a *different* thread cannot push an
//! SQE into another context's ring directly without its own
//! synchronization. The idiomatic substitute — used throughout the KSVC
//! stack via `ksvc_module::eventfd_notifier::EventFdNotifier` — is an
//! eventfd the owning context reads via a standing io_uring `Read`
//! submission: any thread can `write()` to it (a plain, thread-safe
//! syscall), which both increments the eventfd counter and, because a read
//! on it is already queued in the ring, produces a completion that
//! unblocks `wait_for_completion`. Cheap, coalesced, and harmless if
//! redundant.

use ringrt_core::error::{RingError, Result};
use std::os::unix::io::RawFd;

pub struct WakeEventFd {
    fd: RawFd,
}

impl WakeEventFd {
    pub fn create() -> Result<Self> {
        let fd = unsafe { libc::eventfd(0, libc::EFD_NONBLOCK | libc::EFD_CLOEXEC) };
        if fd < 0 {
            return Err(RingError::Os(unsafe { *libc::__errno_location() }));
        }
        Ok(Self { fd })
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Write 1 to the eventfd. Safe to call from any thread; multiple
    /// calls before the owner drains the counter are coalesced by eventfd
    /// semantics, so redundant wake-ups cost nothing beyond a syscall.
    pub fn notify(&self) -> Result<()> {
        let val: u64 = 1;
        let ret = unsafe {
            libc::write(
                self.fd,
                &val as *const u64 as *const libc::c_void,
                std::mem::size_of::<u64>(),
            )
        };
        if ret < 0 {
            let errno = unsafe { *libc::__errno_location() };
            if errno == libc::EAGAIN {
                return Ok(());
            }
            return Err(RingError::Os(errno));
        }
        Ok(())
    }

    /// Drain the counter after a wake so the next `write()` arms a fresh
    /// completion instead of folding into a stale one.
    pub fn drain(&self) {
        let mut buf: u64 = 0;
        unsafe {
            libc::read(
                self.fd,
                &mut buf as *mut u64 as *mut libc::c_void,
                std::mem::size_of::<u64>(),
            );
        }
    }
}

impl Drop for WakeEventFd {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

// Safety: the fd is only ever written/read via plain syscalls; no
// interior mutability beyond the kernel's own eventfd counter.
unsafe impl Send for WakeEventFd {}
unsafe impl Sync for WakeEventFd {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_notify() {
        let fd = WakeEventFd::create().expect("eventfd");
        fd.notify().expect("notify");
        fd.drain();
    }
}
