//! TCP echo server demo.
//!
//! Grounded on `cmd/ksvc-echo`'s setup/accept/recv/send shape and, for
//! `--multi`, `original_source/example`'s multi-context balancer pattern:
//! one context accepts, and round-robins each accepted connection to one
//! of several worker contexts so no single thread's ring handles every
//! byte.
//!
//! Usage:
//!     ringrt-demo-echo [port] [--multi N]
//!
//! Test with:
//!     echo "hello" | nc 127.0.0.1 9999

use ringrt::context::{ContextConfig, RunningContext};
use ringrt::net::{TcpListener, TcpStream};
use ringrt::task;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::os::unix::io::FromRawFd;

fn parse_args() -> (u16, usize) {
    let args: Vec<String> = std::env::args().collect();
    let mut port = 9999u16;
    let mut workers = 1usize;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--multi" => {
                workers = args
                    .get(i + 1)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(4);
                i += 2;
            }
            p => {
                if let Ok(n) = p.parse() {
                    port = n;
                }
                i += 1;
            }
        }
    }
    (port, workers)
}

async fn serve_one(conn: TcpStream) {
    let mut buf = [0u8; 4096];
    loop {
        let n = match conn.recv(&mut buf).await {
            Ok(0) => {
                ringrt_core::klog_debug!("connection closed");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                ringrt_core::klog_warn!("recv failed: {e}");
                return;
            }
        };
        if let Err(e) = conn.send(&buf[..n]).await {
            ringrt_core::klog_warn!("send failed: {e}");
            return;
        }
    }
}

fn main() {
    let (port, workers) = parse_args();
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);

    let accept_ctx = RunningContext::start(ContextConfig::from_env()).expect("start accept context");
    let worker_ctxs: Vec<RunningContext> = (0..workers.saturating_sub(1))
        .map(|_| RunningContext::start(ContextConfig::from_env()).expect("start worker context"))
        .collect();
    let worker_handles: Vec<_> = worker_ctxs.iter().map(|c| c.handle()).collect();
    let accept_handle = accept_ctx.handle();

    ringrt_core::klog_info!(
        "ringrt echo demo listening on {addr} with {} worker context(s)",
        workers
    );

    task::spawn_on(&accept_handle, async move {
        let listener = TcpListener::bind(addr).expect("bind echo listener");
        let mut next = 0usize;
        loop {
            let conn = match listener.accept().await {
                Ok(c) => c,
                Err(e) => {
                    ringrt_core::klog_error!("accept failed: {e}");
                    continue;
                }
            };
            if worker_handles.is_empty() {
                task::spawn_detached(serve_one(conn));
            } else {
                let fd = conn.as_raw_fd();
                std::mem::forget(conn); // ownership moves to the worker context below
                let target = &worker_handles[next % worker_handles.len()];
                next += 1;
                task::spawn_on(target, async move {
                    let conn = unsafe { TcpStream::from_raw_fd(fd) };
                    serve_one(conn).await;
                });
            }
        }
    });

    // Demo process: block forever driving the accept loop. A real
    // embedder would wire this to a signal handler instead.
    accept_ctx.join();
}
