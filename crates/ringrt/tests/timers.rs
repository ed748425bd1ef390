//! Timer-driven scenarios: a relative timeout fires exactly
//! once, and an absolute deadline is honored without drifting off the
//! requested instant even when the context was otherwise idle.

use ringrt::context::{ContextConfig, RunningContext};
use ringrt::{io, task};

use std::sync::mpsc;
use std::time::{Duration, Instant};

#[test]
fn relative_timeout_fires_once() {
    let ctx = RunningContext::start(ContextConfig::from_env()).expect("start context");
    let (tx, rx) = mpsc::channel::<()>();

    task::spawn_on(&ctx.handle(), async move {
        io::timeout(Duration::from_millis(15)).await;
        tx.send(()).expect("receiver still waiting");
    });

    rx.recv_timeout(Duration::from_secs(5))
        .expect("relative timeout should fire within five seconds");
    // A second recv with a short bound confirms the channel wasn't fed
    // twice — the timer is one-shot.
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

    ctx.stop();
    ctx.join();
}

#[test]
fn absolute_timeout_is_not_late() {
    let ctx = RunningContext::start(ContextConfig::from_env()).expect("start context");
    let (tx, rx) = mpsc::channel::<Duration>();
    let deadline = Instant::now() + Duration::from_millis(30);

    task::spawn_on(&ctx.handle(), async move {
        io::timeout_at(deadline).await;
        tx.send(Instant::now().saturating_duration_since(deadline))
            .expect("receiver still waiting");
    });

    let overshoot = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("absolute timeout should fire within five seconds");
    // Generous bound: we only assert it didn't drift by whole seconds,
    // not that it fired in real time within microseconds of the deadline.
    assert!(overshoot < Duration::from_secs(1));

    ctx.stop();
    ctx.join();
}

#[test]
fn cancelled_timer_does_not_fire() {
    let ctx = RunningContext::start(ContextConfig::from_env()).expect("start context");
    let (tx, rx) = mpsc::channel::<&'static str>();

    task::spawn_on(&ctx.handle(), async move {
        let long_sleep = io::timeout(Duration::from_secs(10));
        let winner = ringrt::combinators::any(vec![
            Box::pin(async {
                io::timeout(Duration::from_millis(10)).await;
                "short"
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = &'static str> + Send>>,
            Box::pin(async move {
                long_sleep.await;
                "long"
            }),
        ])
        .await;
        tx.send(winner.1).expect("receiver still waiting");
    });

    let winner = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("the short sleep should win");
    assert_eq!(winner, "short");

    ctx.stop();
    ctx.join();
}
