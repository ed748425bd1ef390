//! Periodic timer cycles, grounded directly on
//! `original_source/example/timer.cpp`: three tasks print on their own
//! cadence, one of them driven by relative `timeout`, one by repeated
//! absolute `timeout_at` deadlines so it never drifts under load.

use ringrt::context::{ContextConfig, RunningContext};
use ringrt::io;
use ringrt::task;

use std::time::{Duration, Instant};

async fn cycle(secs: u64, message: &'static str) {
    loop {
        io::timeout(Duration::from_secs(secs)).await;
        println!("{message}");
    }
}

async fn cycle_abs(secs: u64, message: &'static str) {
    let mut next = Instant::now();
    loop {
        next += Duration::from_secs(secs);
        io::timeout_at(next).await;
        println!("{message}");
    }
}

fn main() {
    let ctx = RunningContext::start(ContextConfig::from_env()).expect("start context");

    task::spawn_on(&ctx.handle(), cycle(1, "1 sec"));
    task::spawn_on(&ctx.handle(), cycle_abs(1, "1 sec [abs]"));
    task::spawn_on(&ctx.handle(), cycle(3, "\t3 sec"));

    ctx.join();
}
