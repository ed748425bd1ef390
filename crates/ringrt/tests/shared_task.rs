//! `SharedTask<T>` scenarios, grounded on
//! `original_source/test/move_shared_task.cpp`: several awaiters
//! share one running computation, each getting the same result, and the
//! implementation is free to move the value out for whichever awaiter
//! happens to consume the last live handle instead of cloning it.

use ringrt::context::{ContextConfig, RunningContext};
use ringrt::shared_task::SharedTask;
use ringrt::{io, task};

use std::sync::mpsc;
use std::time::Duration;

#[test]
fn two_awaiters_observe_the_same_result() {
    let ctx = RunningContext::start(ContextConfig::from_env()).expect("start context");
    let (tx, rx) = mpsc::channel::<(u32, u32)>();

    task::spawn_on(&ctx.handle(), async move {
        let shared = SharedTask::spawn(async {
            io::timeout(Duration::from_millis(10)).await;
            99u32
        });
        let a = shared.clone();
        let b = shared;

        // Drive both awaiters concurrently via `both`, not sequentially —
        // sequential awaiting would trivially serialize on the same
        // already-resolved value and not exercise the shared-waker path.
        let (ra, rb) = ringrt::combinators::both(a, b).await;
        tx.send((ra, rb)).expect("receiver still waiting");
    });

    let (ra, rb) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("both awaiters should observe the shared result");
    assert_eq!(ra, 99);
    assert_eq!(rb, 99);

    ctx.stop();
    ctx.join();
}

#[test]
fn clone_dropped_before_completion_does_not_panic() {
    let ctx = RunningContext::start(ContextConfig::from_env()).expect("start context");
    let (tx, rx) = mpsc::channel::<u32>();

    task::spawn_on(&ctx.handle(), async move {
        let shared = SharedTask::spawn(async {
            io::timeout(Duration::from_millis(10)).await;
            7u32
        });
        let extra = shared.clone();
        drop(extra);
        let result = shared.await;
        tx.send(result).expect("receiver still waiting");
    });

    let result = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("the remaining handle should still resolve");
    assert_eq!(result, 7);

    ctx.stop();
    ctx.join();
}
