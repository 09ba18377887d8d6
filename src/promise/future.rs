//! Bridge from [`Promise`] to Rust's `Future` trait.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use super::core::{Promise, Settled};

struct Shared<T, E> {
    outcome: Option<Settled<T, E>>,
    waker: Option<Waker>,
}

/// `Future` adapter for a [`Promise`], created by its `IntoFuture` impl.
///
/// Polling never drives the scheduler: the future stays pending until the
/// promise's settlement task has actually run on its scheduler, then
/// resolves once with the outcome as a `Result`.
pub struct PromiseFuture<T, E> {
    shared: Arc<Mutex<Shared<T, E>>>,
}

impl<T, E> fmt::Debug for PromiseFuture<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ready = self
            .shared
            .lock()
            .expect("promise future lock poisoned")
            .outcome
            .is_some();
        f.debug_struct("PromiseFuture")
            .field("ready", &ready)
            .finish_non_exhaustive()
    }
}

impl<T, E> Future for PromiseFuture<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut shared = self.shared.lock().expect("promise future lock poisoned");
        match shared.outcome.take() {
            Some(outcome) => Poll::Ready(outcome.into_result()),
            None => {
                shared.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<T, E> IntoFuture for Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    type Output = Result<T, E>;
    type IntoFuture = PromiseFuture<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        let shared = Arc::new(Mutex::new(Shared {
            outcome: None,
            waker: None,
        }));
        let fulfill_shared = Arc::clone(&shared);
        let reject_shared = Arc::clone(&shared);
        self.subscribe(
            Box::new(move |value| deliver(&fulfill_shared, Settled::Fulfilled { value })),
            Box::new(move |reason| deliver(&reject_shared, Settled::Rejected { reason })),
        );
        PromiseFuture { shared }
    }
}

/// Stores the outcome, then wakes the pending poll outside the lock.
fn deliver<T, E>(shared: &Mutex<Shared<T, E>>, outcome: Settled<T, E>) {
    let waker = {
        let mut shared = shared.lock().expect("promise future lock poisoned");
        shared.outcome = Some(outcome);
        shared.waker.take()
    };
    if let Some(waker) = waker {
        waker.wake();
    }
}
