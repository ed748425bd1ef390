//! The execution context — one OS thread, one ring, one drive loop.
//!
//! Grounded on `ksvc_gvthread::reactor::Reactor::run` for the overall
//! drain-ready/submit/wait/reap shape, and on
//! `gvthread_runtime::scheduler::SchedulerConfig` for the env-driven config
//! builder. Unlike the reactor (which drives green-thread fibers) or the
//! scheduler (which drives `naked_asm!` stack switches), this drive loop
//! only ever resumes `Waker`s — the task itself is a compiler-generated
//! `Future`, so "resuming" is just `Waker::wake()`.
//!
//! A `Context` is `!Send` by construction (it owns a `RingDriver`, which
//! wraps raw io_uring mmaps meant for single-thread use) and never crosses
//! threads after `start()` moves it onto its own OS thread. Other threads
//! reach it only through a [`ContextHandle`], which is `Send + Sync` and
//! talks to it exclusively through the [`Inbox`] and [`WakeEventFd`].

use crate::inbox::Inbox;
use crate::ring::RingDriver;
use crate::timer::{TimerHandle, TimerWheel};
use crate::tls;
use crate::wake::WakeEventFd;

use ringrt_core::error::{RingError, Result};
use ringrt_core::request::ReapItem;

use io_uring::squeue;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Cookie stamped on the context's own standing eventfd-read submission.
/// Never handed to an awaitable, so it can never collide with a real
/// `RequestSlot` pointer cast to a cookie.
const WAKE_COOKIE: u64 = u64::MAX - 2;

/// Operator-visible knobs for one execution context, mirroring
/// `SchedulerConfig::from_env` — every field has a sensible default and an
/// environment override so embedders don't need a config file just to
/// tune ring size.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Submission-queue depth for this context's ring.
    pub ring_entries: u32,
    /// Upper bound on how long the drive loop may block with no timers
    /// and no ready work, so a `stop()` issued from another thread is
    /// never stuck behind an unbounded wait.
    pub poll_interval: Duration,
    /// Max inbox items, and separately max ready-queue items, drained per
    /// iteration before yielding to a submit/reap round — a fairness
    /// bound so one busy context can't starve its own I/O.
    pub fairness_quota: usize,
    /// Log a warning the first time the submission overflow queue grows
    /// past this many entries.
    pub overflow_warn_at: usize,
}

impl ContextConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("RINGRT_RING_ENTRIES") {
            if let Ok(n) = v.parse() {
                cfg.ring_entries = n;
            }
        }
        if let Ok(v) = std::env::var("RINGRT_POLL_INTERVAL_MS") {
            if let Ok(n) = v.parse() {
                cfg.poll_interval = Duration::from_millis(n);
            }
        }
        if let Ok(v) = std::env::var("RINGRT_FAIRNESS_QUOTA") {
            if let Ok(n) = v.parse() {
                cfg.fairness_quota = n;
            }
        }
        if let Ok(v) = std::env::var("RINGRT_OVERFLOW_WARN_AT") {
            if let Ok(n) = v.parse() {
                cfg.overflow_warn_at = n;
            }
        }
        cfg
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            ring_entries: 256,
            poll_interval: Duration::from_millis(500),
            fairness_quota: 256,
            overflow_warn_at: 1024,
        }
    }
}

fn next_context_id() -> u32 {
    static NEXT: AtomicU32 = AtomicU32::new(0);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

/// State shared between a context and every [`ContextHandle`] pointing at
/// it. Everything here is thread-safe by construction: the inbox is a
/// lock-free MPSC queue, the eventfd is a plain syscall, and the flags are
/// atomics.
struct ContextShared {
    id: u32,
    inbox: Inbox,
    wake: WakeEventFd,
    sleeping: AtomicBool,
    stop: AtomicBool,
}

impl ContextShared {
    fn new(id: u32) -> Result<Self> {
        Ok(Self {
            id,
            inbox: Inbox::new(),
            wake: WakeEventFd::create()?,
            sleeping: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        })
    }
}

/// A cheap, cloneable, thread-safe reference to a running context — the
/// only thing other threads are allowed to hold. Spawning onto it posts a
/// thunk to the inbox and wakes the context if it is currently blocked in
/// `wait_for_completion`.
#[derive(Clone)]
pub struct ContextHandle {
    shared: Arc<ContextShared>,
}

impl ContextHandle {
    pub fn id(&self) -> u32 {
        self.shared.id
    }

    /// Post a start thunk to run on the owning context's thread. The
    /// thunk is expected to perform a *local* spawn once it runs (it runs
    /// with `tls::with_current` already pointing at the right context),
    /// not to do any work itself here.
    pub fn spawn_boxed(&self, thunk: Box<dyn FnOnce() + Send + 'static>) {
        self.shared.inbox.push(thunk);
        if self.shared.sleeping.load(Ordering::Acquire) {
            let _ = self.shared.wake.notify();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }
}

/// One execution context: a ring, a timer wheel, a ready queue, and a
/// submission overflow queue, all owned exclusively by the OS thread
/// running [`Context::run`].
pub struct Context {
    ring: RingDriver,
    timers: TimerWheel,
    ready: VecDeque<ReapItem>,
    overflow: VecDeque<squeue::Entry>,
    shared: Arc<ContextShared>,
    config: ContextConfig,
    now: Instant,
    wake_buf: Box<[u8; 8]>,
    overflow_warned: bool,
}

impl Context {
    fn new(config: ContextConfig, shared: Arc<ContextShared>) -> Result<Self> {
        let ring = RingDriver::new(config.ring_entries)?;
        Ok(Self {
            ring,
            timers: TimerWheel::new(),
            ready: VecDeque::new(),
            overflow: VecDeque::new(),
            shared,
            config,
            now: Instant::now(),
            wake_buf: Box::new([0u8; 8]),
            overflow_warned: false,
        })
    }

    pub fn id(&self) -> u32 {
        self.shared.id
    }

    pub fn handle(&self) -> ContextHandle {
        ContextHandle {
            shared: self.shared.clone(),
        }
    }

    /// Push a bare continuation onto this context's ready queue. Used by
    /// local `spawn` and by combinators resuming a parent task.
    pub fn push_ready(&mut self, item: ReapItem) {
        self.ready.push_back(item);
    }

    pub fn insert_timer(&mut self, deadline: Instant, waker: std::task::Waker) -> TimerHandle {
        self.timers.insert(deadline, waker)
    }

    pub fn cancel_timer(&mut self, handle: TimerHandle) {
        self.timers.cancel(handle)
    }

    /// Submit an SQE, falling back to the overflow queue when the ring is
    /// full rather than blocking or erroring out: the submitter never
    /// blocks, a full ring just enqueues to an overflow list instead.
    pub fn submit(&mut self, entry: squeue::Entry) {
        if let Err(entry) = self.ring.try_push(entry) {
            self.overflow.push_back(entry);
            if !self.overflow_warned && self.overflow.len() >= self.config.overflow_warn_at {
                self.overflow_warned = true;
                ringrt_core::klog_warn!(
                    "context {}: submission overflow queue depth {}",
                    self.shared.id,
                    self.overflow.len()
                );
            }
        }
    }

    fn retry_overflow(&mut self) {
        while let Some(entry) = self.overflow.pop_front() {
            match self.ring.try_push(entry) {
                Ok(()) => {}
                Err(entry) => {
                    self.overflow.push_front(entry);
                    break;
                }
            }
        }
        if self.overflow.is_empty() {
            self.overflow_warned = false;
        }
    }

    fn arm_wake_read(&mut self) {
        let fd = self.shared.wake.fd();
        let ptr = self.wake_buf.as_mut_ptr();
        let entry = io_uring::opcode::Read::new(io_uring::types::Fd(fd), ptr, 8)
            .build()
            .user_data(WAKE_COOKIE);
        self.submit(entry);
    }

    fn compute_wait_timeout(&mut self) -> Option<Duration> {
        match self.timers.next_deadline() {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(self.now);
                Some(remaining.min(self.config.poll_interval))
            }
            None => Some(self.config.poll_interval),
        }
    }

    /// The drive loop: fire expired timers, drain the inbox and ready
    /// queue under a fairness quota, retry overflowed submissions, flush,
    /// and — only once there is truly nothing left to do this tick —
    /// block for a completion and reap it.
    fn run(&mut self) {
        tls::set_current(self as *mut Context);
        self.arm_wake_read();

        loop {
            if self.shared.stop.load(Ordering::Acquire) {
                break;
            }

            self.now = Instant::now();

            for waker in self.timers.fire_expired(self.now) {
                self.ready.push_back(ReapItem::Wake(waker));
            }

            let mut drained = 0;
            while drained < self.config.fairness_quota {
                match self.shared.inbox.pop() {
                    Some(thunk) => {
                        thunk();
                        drained += 1;
                    }
                    None => break,
                }
            }

            let mut resumed = 0;
            while resumed < self.config.fairness_quota {
                match self.ready.pop_front() {
                    Some(ReapItem::Wake(waker)) => waker.wake(),
                    Some(ReapItem::Io {
                        slot,
                        result,
                        flags,
                    }) => {
                        // Safety: the slot outlives this completion because
                        // the awaitable holding it cannot be dropped while
                        // suspended awaiting it — dropping cancels first.
                        let slot = unsafe { slot.as_ref() };
                        if let Some(waker) = slot.complete(result, flags) {
                            waker.wake();
                        }
                    }
                    None => break,
                }
                resumed += 1;
            }

            self.retry_overflow();
            if let Err(e) = self.ring.flush_submissions() {
                ringrt_core::klog_error!("context {}: flush failed: {e}", self.shared.id);
            }

            if !self.ready.is_empty() || !self.shared.inbox.is_empty() {
                continue;
            }

            if self.shared.stop.load(Ordering::Acquire) {
                break;
            }

            let timeout = self.compute_wait_timeout();
            self.shared.sleeping.store(true, Ordering::Release);
            let wait_result = self.ring.wait_for_completion(timeout);
            self.shared.sleeping.store(false, Ordering::Release);

            match wait_result {
                Ok(()) => {}
                Err(RingError::Interrupted) => continue,
                Err(e) => {
                    ringrt_core::klog_error!("context {}: wait failed: {e}", self.shared.id);
                    continue;
                }
            }

            let mut batch = Vec::new();
            self.ring.reap_batch(&mut batch, 256);
            let mut wake_fired = false;
            for c in batch {
                if c.cookie.0 == WAKE_COOKIE {
                    wake_fired = true;
                    continue;
                }
                let ptr = c.cookie.as_ptr::<ringrt_core::request::RequestSlot>();
                if let Some(slot) = std::ptr::NonNull::new(ptr) {
                    self.ready.push_back(ReapItem::Io {
                        slot,
                        result: c.result,
                        flags: c.flags,
                    });
                }
            }
            if wake_fired {
                self.shared.wake.drain();
                self.arm_wake_read();
            }
        }

        tls::clear_current();
    }
}

/// A context running on its own OS thread. Dropping this without calling
/// `join` detaches the thread — the drive loop keeps running until
/// `stop()` is called from somewhere that still holds a handle.
pub struct RunningContext {
    shared: Arc<ContextShared>,
    thread: Option<JoinHandle<()>>,
}

impl RunningContext {
    /// Start a new execution context on its own OS thread. Ring setup
    /// failures are fatal and reported here, before the thread is even
    /// spawned, so embedders see them synchronously rather than via a
    /// background panic.
    pub fn start(config: ContextConfig) -> Result<Self> {
        let id = next_context_id();
        let shared = Arc::new(ContextShared::new(id)?);
        let mut ctx = Context::new(config, shared.clone())?;

        let thread = std::thread::Builder::new()
            .name(format!("ringrt-ctx-{id}"))
            .spawn(move || {
                ringrt_core::log::set_context_id(id);
                ctx.run();
                ringrt_core::log::clear_context_id();
            })
            .expect("failed to spawn ringrt context thread");

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> ContextHandle {
        ContextHandle {
            shared: self.shared.clone(),
        }
    }

    /// Request the drive loop to exit after its current iteration's reap
    /// step completes, waking it immediately if it is currently blocked.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
        let _ = self.shared.wake.notify();
    }

    /// Block the calling thread until the context's drive loop exits.
    pub fn join(mut self) {
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}
