//! Task aggregates — the Rust mapping of `when_all`/`when_some`.
//!
//! Grounded on `original_source/example/when_all.cpp` and
//! `when_some.cpp`: both take a *homogeneous* vector of tasks (not a
//! fixed-arity tuple), so the combinators here follow the same shape —
//! `Vec<F>` in, an indexed result out.
//!
//! `some`/`any` never drop an unfinished sibling early: the combinator
//! future keeps every child pinned until it completes, even after
//! enough of them have finished to satisfy `k`. The caller decides what
//! happens once *this* future resolves and gets dropped — at that point
//! any still-pending children are dropped too, and [`crate::io::IoFuture`]'s
//! own `Drop` impl is what makes that safe for I/O children specifically:
//! their completions are still reaped by the kernel, just as no-ops.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskCx, Poll};

/// Run every future to completion and collect results in input order.
pub struct All<F: Future> {
    futures: Vec<Option<Pin<Box<F>>>>,
    outputs: Vec<Option<F::Output>>,
    remaining: usize,
}

pub fn all<F: Future>(futures: Vec<F>) -> All<F> {
    let remaining = futures.len();
    let outputs = (0..remaining).map(|_| None).collect();
    let futures = futures.into_iter().map(|f| Some(Box::pin(f))).collect();
    All {
        futures,
        outputs,
        remaining,
    }
}

impl<F: Future> Future for All<F> {
    type Output = Vec<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskCx<'_>) -> Poll<Vec<F::Output>> {
        let this = self.get_mut();
        for i in 0..this.futures.len() {
            if let Some(fut) = this.futures[i].as_mut() {
                if let Poll::Ready(out) = fut.as_mut().poll(cx) {
                    this.outputs[i] = Some(out);
                    this.futures[i] = None;
                    this.remaining -= 1;
                }
            }
        }
        if this.remaining == 0 {
            let outs = this
                .outputs
                .iter_mut()
                .map(|o| o.take().expect("all: output collected exactly once"))
                .collect();
            Poll::Ready(outs)
        } else {
            Poll::Pending
        }
    }
}

/// Resolve once the first `k` of `futures` complete, in the order they
/// finished, paired with their original index.
pub struct SomeCompletions<F: Future> {
    futures: Vec<Option<Pin<Box<F>>>>,
    k: usize,
    collected: Vec<(usize, F::Output)>,
}

pub fn some<F: Future>(k: usize, futures: Vec<F>) -> SomeCompletions<F> {
    assert!(
        k >= 1 && k <= futures.len(),
        "some: k must be between 1 and the number of futures"
    );
    SomeCompletions {
        futures: futures.into_iter().map(|f| Some(Box::pin(f))).collect(),
        k,
        collected: Vec::with_capacity(k),
    }
}

impl<F: Future> Future for SomeCompletions<F> {
    type Output = Vec<(usize, F::Output)>;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskCx<'_>) -> Poll<Vec<(usize, F::Output)>> {
        let this = self.get_mut();
        for i in 0..this.futures.len() {
            if this.collected.len() >= this.k {
                break;
            }
            if let Some(fut) = this.futures[i].as_mut() {
                if let Poll::Ready(out) = fut.as_mut().poll(cx) {
                    this.futures[i] = None;
                    this.collected.push((i, out));
                }
            }
        }
        if this.collected.len() >= this.k {
            Poll::Ready(std::mem::take(&mut this.collected))
        } else {
            Poll::Pending
        }
    }
}

/// `some(1, futures)`, flattened to the single winning `(index, output)`.
pub async fn any<F: Future>(futures: Vec<F>) -> (usize, F::Output) {
    let mut results = some(1, futures).await;
    results.pop().expect("some(1, ..) always yields one result")
}

/// Run two differently-typed futures to completion, neither
/// short-circuiting the other. Rust has no overloadable `&&` for this
/// (the source's `operator&&` on tasks), so this free function is the
/// idiomatic stand-in — the "fused, no-short-circuit" rule the source
/// documents is exactly what it implements.
pub struct Both<A: Future, B: Future> {
    a: Pin<Box<A>>,
    b: Pin<Box<B>>,
    a_out: Option<A::Output>,
    b_out: Option<B::Output>,
}

pub fn both<A: Future, B: Future>(a: A, b: B) -> Both<A, B> {
    Both {
        a: Box::pin(a),
        b: Box::pin(b),
        a_out: None,
        b_out: None,
    }
}

impl<A: Future, B: Future> Future for Both<A, B> {
    type Output = (A::Output, B::Output);

    fn poll(self: Pin<&mut Self>, cx: &mut TaskCx<'_>) -> Poll<(A::Output, B::Output)> {
        let this = self.get_mut();
        if this.a_out.is_none() {
            if let Poll::Ready(out) = this.a.as_mut().poll(cx) {
                this.a_out = Some(out);
            }
        }
        if this.b_out.is_none() {
            if let Poll::Ready(out) = this.b.as_mut().poll(cx) {
                this.b_out = Some(out);
            }
        }
        match (this.a_out.take(), this.b_out.take()) {
            (Some(a), Some(b)) => Poll::Ready((a, b)),
            (a, b) => {
                this.a_out = a;
                this.b_out = b;
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::ready;

    #[test]
    fn all_preserves_input_order() {
        let fut = all(vec![ready(1), ready(2), ready(3)]);
        let waker = noop_waker();
        let mut cx = TaskCx::from_waker(&waker);
        let mut fut = Box::pin(fut);
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(v) => assert_eq!(v, vec![1, 2, 3]),
            Poll::Pending => panic!("ready futures must resolve on first poll"),
        }
    }

    #[test]
    fn some_collects_k_with_original_indices() {
        let fut = some(2, vec![ready(10), ready(20), ready(30)]);
        let waker = noop_waker();
        let mut cx = TaskCx::from_waker(&waker);
        let mut fut = Box::pin(fut);
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(pairs) => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[0], (0, 10));
                assert_eq!(pairs[1], (1, 20));
            }
            Poll::Pending => panic!("ready futures must resolve on first poll"),
        }
    }

    fn noop_waker() -> std::task::Waker {
        use std::task::{RawWaker, RawWakerVTable, Waker};
        fn clone(_: *const ()) -> RawWaker {
            raw()
        }
        fn noop(_: *const ()) {}
        fn raw() -> RawWaker {
            static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, noop, noop, noop);
            RawWaker::new(std::ptr::null(), &VTABLE)
        }
        unsafe { Waker::from_raw(raw()) }
    }
}
