//! Kernel-style leveled logging for ringrt.
//!
//! Grounded on `gvthread_core::kprint`: env-driven, zero external
//! dependency, stderr-only. The level numbering matches `gvthread`'s
//! own `GVT_LOG_LEVEL` convention: a 0-5 operator-settable threshold.
//!
//! # Environment variables
//!
//! - `RINGRT_LOG_LEVEL` - 0=off, 1=error, 2=warn, 3=info, 4=debug, 5=trace
//! - `RINGRT_LOG_FLUSH` - flush stderr after every line (debugging crashes)
//!
//! Each context tags its lines with a small numeric id (set via
//! [`set_context_id`]) rather than a worker/gvthread pair, since a ringrt
//! context is the unit of concurrency here.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Trace => "[TRACE]",
        }
    }
}

static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INITIALIZED: AtomicBool = AtomicBool::new(false);

fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    FLUSH_ENABLED.store(env_bool("RINGRT_LOG_FLUSH"), Ordering::Relaxed);
    if let Ok(val) = std::env::var("RINGRT_LOG_LEVEL") {
        let level = match val.to_lowercase().as_str() {
            "off" | "0" => LogLevel::Off,
            "error" | "1" => LogLevel::Error,
            "warn" | "2" => LogLevel::Warn,
            "info" | "3" => LogLevel::Info,
            "debug" | "4" => LogLevel::Debug,
            "trace" | "5" => LogLevel::Trace,
            _ => LogLevel::Info,
        };
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
}

fn env_bool(key: &str) -> bool {
    matches!(std::env::var(key).as_deref(), Ok("1") | Ok("true"))
}

#[inline]
pub fn log_level() -> LogLevel {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

#[inline]
fn level_enabled(level: LogLevel) -> bool {
    (level as u8) <= (log_level() as u8)
}

thread_local! {
    static CONTEXT_ID: std::cell::Cell<Option<u32>> = const { std::cell::Cell::new(None) };
}

/// Tag subsequent log lines on this thread with a context id. Called once
/// by `Context::start` / the thread running `Context::run`.
pub fn set_context_id(id: u32) {
    CONTEXT_ID.with(|c| c.set(Some(id)));
}

pub fn clear_context_id() {
    CONTEXT_ID.with(|c| c.set(None));
}

fn context_tag() -> String {
    match CONTEXT_ID.with(|c| c.get()) {
        Some(id) => format!("[ctx{id}]"),
        None => "[ctx-]".to_string(),
    }
}

#[doc(hidden)]
pub fn _klog_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = write!(handle, "{} {} ", level.prefix(), context_tag());
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    if FLUSH_ENABLED.load(Ordering::Relaxed) {
        let _ = handle.flush();
    }
}

#[macro_export]
macro_rules! klog_error {
    ($($arg:tt)*) => {{
        $crate::log::_klog_impl($crate::log::LogLevel::Error, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! klog_warn {
    ($($arg:tt)*) => {{
        $crate::log::_klog_impl($crate::log::LogLevel::Warn, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! klog_info {
    ($($arg:tt)*) => {{
        $crate::log::_klog_impl($crate::log::LogLevel::Info, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! klog_debug {
    ($($arg:tt)*) => {{
        $crate::log::_klog_impl($crate::log::LogLevel::Debug, format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! klog_trace {
    ($($arg:tt)*) => {{
        $crate::log::_klog_impl($crate::log::LogLevel::Trace, format_args!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn context_id_roundtrips() {
        assert_eq!(CONTEXT_ID.with(|c| c.get()), None);
        set_context_id(3);
        assert_eq!(CONTEXT_ID.with(|c| c.get()), Some(3));
        clear_context_id();
        assert_eq!(CONTEXT_ID.with(|c| c.get()), None);
    }

    #[test]
    fn macros_compile() {
        set_log_level(LogLevel::Off);
        klog_error!("e {}", 1);
        klog_warn!("w");
        klog_info!("i");
        klog_debug!("d");
        klog_trace!("t");
    }
}
