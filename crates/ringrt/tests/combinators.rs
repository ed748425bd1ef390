//! `all`/`some` scenarios, grounded on
//! `original_source/example/when_all.cpp` and `when_some.cpp`: `all`
//! preserves input order regardless of completion order, and `some(k,..)`
//! reports the first `k` completions in the order they actually finished.

use ringrt::context::{ContextConfig, RunningContext};
use ringrt::{combinators, io, task};

use std::sync::mpsc;
use std::time::Duration;

#[test]
fn all_preserves_input_order_not_completion_order() {
    let ctx = RunningContext::start(ContextConfig::from_env()).expect("start context");
    let (tx, rx) = mpsc::channel::<Vec<u32>>();

    task::spawn_on(&ctx.handle(), async move {
        // Deliberately finish out of input order: index 0 sleeps longest.
        let results = combinators::all(vec![
            delayed(30, 0),
            delayed(5, 1),
            delayed(15, 2),
        ])
        .await;
        tx.send(results).expect("receiver still waiting");
    });

    let results = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("all() should resolve");
    assert_eq!(results, vec![0, 1, 2]);

    ctx.stop();
    ctx.join();
}

#[test]
fn some_reports_completion_order_with_original_indices() {
    let ctx = RunningContext::start(ContextConfig::from_env()).expect("start context");
    let (tx, rx) = mpsc::channel::<Vec<(usize, u32)>>();

    task::spawn_on(&ctx.handle(), async move {
        let winners = combinators::some(
            2,
            vec![delayed(30, 100), delayed(5, 200), delayed(15, 300)],
        )
        .await;
        tx.send(winners).expect("receiver still waiting");
    });

    let winners = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("some(2, ..) should resolve");
    assert_eq!(winners.len(), 2);
    // Index 1 (5ms) finishes first, then index 2 (15ms) — index 0 (30ms)
    // is still in flight when `some` resolves.
    assert_eq!(winners[0], (1, 200));
    assert_eq!(winners[1], (2, 300));

    ctx.stop();
    ctx.join();
}

#[test]
fn both_runs_to_completion_without_short_circuit() {
    let ctx = RunningContext::start(ContextConfig::from_env()).expect("start context");
    let (tx, rx) = mpsc::channel::<(u32, &'static str)>();

    task::spawn_on(&ctx.handle(), async move {
        let (a, b) = combinators::both(delayed(5, 7u32), async {
            io::timeout(Duration::from_millis(20)).await;
            "done"
        })
        .await;
        tx.send((a, b)).expect("receiver still waiting");
    });

    let (a, b) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("both() should resolve once each side finishes");
    assert_eq!(a, 7);
    assert_eq!(b, "done");

    ctx.stop();
    ctx.join();
}

async fn delayed(millis: u64, value: u32) -> u32 {
    io::timeout(Duration::from_millis(millis)).await;
    value
}
