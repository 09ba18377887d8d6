//! Promise state machine, settlement capabilities, and chaining.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::scheduler::SchedulerHandle;
use crate::tracing_compat::{debug, trace};

/// A queued continuation awaiting a settled value.
pub(crate) type Reaction<V> = Box<dyn FnOnce(V) + Send>;

static NEXT_PROMISE_ID: AtomicU64 = AtomicU64::new(1);

/// Observable lifecycle stage of a [`Promise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromiseState {
    /// Not settled yet.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a reason.
    Rejected,
}

impl PromiseState {
    /// Returns `true` before settlement.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns `true` once settled with a value.
    #[must_use]
    pub const fn is_fulfilled(self) -> bool {
        matches!(self, Self::Fulfilled)
    }

    /// Returns `true` once settled with a reason.
    #[must_use]
    pub const fn is_rejected(self) -> bool {
        matches!(self, Self::Rejected)
    }
}

impl fmt::Display for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Fulfilled => "fulfilled",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// How a promise is being resolved, decided at the call site.
///
/// This is the crate's rendition of "resolve may receive a value or another
/// promise": instead of a runtime type test, the caller states which one it
/// is.
pub enum Resolution<T, E> {
    /// A plain value; the promise fulfills with it on the next tick.
    Direct(T),
    /// Another promise whose eventual outcome is adopted, recursively.
    Deferred(Promise<T, E>),
}

/// Terminal outcome of a settled promise.
///
/// Also the per-input record produced by
/// [`Promise::all_settled`](crate::Promise::all_settled), serialized with a
/// `status` tag alongside the value or reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Settled<T, E> {
    /// Settled with a value.
    Fulfilled {
        /// The fulfillment value.
        value: T,
    },
    /// Settled with a reason.
    Rejected {
        /// The rejection reason.
        reason: E,
    },
}

impl<T, E> Settled<T, E> {
    /// Returns `true` for a fulfillment record.
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled { .. })
    }

    /// Returns `true` for a rejection record.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Converts the record into a `Result`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Fulfilled { value } => Ok(value),
            Self::Rejected { reason } => Err(reason),
        }
    }
}

enum State<T, E> {
    Pending {
        on_fulfilled: Vec<Reaction<T>>,
        on_rejected: Vec<Reaction<E>>,
    },
    Fulfilled(T),
    Rejected(E),
}

struct PromiseInner<T, E> {
    id: u64,
    state: State<T, E>,
    /// Set when a settlement is accepted, before its task runs. All later
    /// settlement attempts are no-ops.
    claimed: bool,
}

/// A deferred value: the eventual result of an asynchronous computation.
///
/// A promise starts pending and settles at most once, fulfilled with a `T`
/// or rejected with an `E`. Cloning yields another handle to the same
/// underlying state. Settlement, and every continuation it triggers, runs
/// as a task on the promise's scheduler; nothing runs on the stack of the
/// call that settled it.
///
/// Values and reasons are cloned into each observer, hence the `Clone`
/// bounds on the settlement and chaining surface.
pub struct Promise<T, E> {
    inner: Arc<Mutex<PromiseInner<T, E>>>,
    sched: SchedulerHandle,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            sched: Arc::clone(&self.sched),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        let state = match inner.state {
            State::Pending { .. } => PromiseState::Pending,
            State::Fulfilled(_) => PromiseState::Fulfilled,
            State::Rejected(_) => PromiseState::Rejected,
        };
        f.debug_struct("Promise")
            .field("id", &inner.id)
            .field("state", &state)
            .finish_non_exhaustive()
    }
}

impl<T, E> Promise<T, E> {
    /// Stable identity of this promise's shared state.
    ///
    /// Chaining always creates promises with fresh ids.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.lock().id
    }

    /// Current lifecycle stage.
    #[must_use]
    pub fn state(&self) -> PromiseState {
        match self.lock().state {
            State::Pending { .. } => PromiseState::Pending,
            State::Fulfilled(_) => PromiseState::Fulfilled,
            State::Rejected(_) => PromiseState::Rejected,
        }
    }

    /// Returns `true` before settlement.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state().is_pending()
    }

    /// Returns `true` once fulfilled.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        self.state().is_fulfilled()
    }

    /// Returns `true` once rejected.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.state().is_rejected()
    }

    fn lock(&self) -> MutexGuard<'_, PromiseInner<T, E>> {
        self.inner.lock().expect("promise state lock poisoned")
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a pending promise together with its settlement capability.
    #[must_use]
    pub fn with_resolver(sched: SchedulerHandle) -> (Self, Resolver<T, E>) {
        let promise = Self {
            inner: Arc::new(Mutex::new(PromiseInner {
                id: NEXT_PROMISE_ID.fetch_add(1, Ordering::Relaxed),
                state: State::Pending {
                    on_fulfilled: Vec::new(),
                    on_rejected: Vec::new(),
                },
                claimed: false,
            })),
            sched,
        };
        let resolver = Resolver {
            target: promise.clone(),
        };
        (promise, resolver)
    }

    /// Creates a promise and runs `setup` synchronously with its resolver.
    ///
    /// A `setup` error rejects the promise, unless a settlement was already
    /// accepted through the resolver.
    pub fn new<F>(sched: SchedulerHandle, setup: F) -> Self
    where
        F: FnOnce(Resolver<T, E>) -> Result<(), E>,
    {
        let (promise, resolver) = Self::with_resolver(sched);
        if let Err(reason) = setup(resolver.clone()) {
            resolver.reject(reason);
        }
        promise
    }

    /// The fulfillment value, if the promise has fulfilled.
    #[must_use]
    pub fn try_value(&self) -> Option<T> {
        match &self.lock().state {
            State::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The rejection reason, if the promise has rejected.
    #[must_use]
    pub fn try_reason(&self) -> Option<E> {
        match &self.lock().state {
            State::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Registers a fulfillment continuation, returning the promise of its
    /// outcome.
    ///
    /// The handler runs as a scheduled task once `self` fulfills, in
    /// registration order relative to other continuations. Its `Ok`
    /// resolution settles the returned promise (with
    /// [`Resolution::Deferred`] adopted recursively); an `Err` rejects it.
    /// A rejection of `self` passes through to the returned promise
    /// unchanged.
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + Send + 'static,
    {
        let (downstream, resolver) = Promise::with_resolver(Arc::clone(&self.sched));
        let pass_reject = resolver.clone();
        self.subscribe(
            Box::new(move |value| match on_fulfilled(value) {
                Ok(resolution) => resolver.settle(resolution),
                Err(reason) => resolver.reject(reason),
            }),
            Box::new(move |reason| pass_reject.reject(reason)),
        );
        downstream
    }

    /// Registers a rejection continuation (recovery), returning the promise
    /// of its outcome.
    ///
    /// A fulfillment of `self` passes through unchanged; a rejection runs
    /// the handler, whose `Ok` resolution settles the returned promise and
    /// whose `Err` rejects it with the new reason.
    pub fn catch<R>(&self, on_rejected: R) -> Promise<T, E>
    where
        R: FnOnce(E) -> Result<Resolution<T, E>, E> + Send + 'static,
    {
        let (downstream, resolver) = Promise::with_resolver(Arc::clone(&self.sched));
        let pass_fulfill = resolver.clone();
        self.subscribe(
            Box::new(move |value| pass_fulfill.resolve(value)),
            Box::new(move |reason| match on_rejected(reason) {
                Ok(resolution) => resolver.settle(resolution),
                Err(next) => resolver.reject(next),
            }),
        );
        downstream
    }

    /// Registers both continuations at once; exactly one of them runs.
    ///
    /// The rejection handler observes only `self`'s rejection, never a
    /// failure of the fulfillment handler.
    pub fn then_catch<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U, E>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + Send + 'static,
        R: FnOnce(E) -> Result<Resolution<U, E>, E> + Send + 'static,
    {
        let (downstream, resolver) = Promise::with_resolver(Arc::clone(&self.sched));
        let reject_resolver = resolver.clone();
        self.subscribe(
            Box::new(move |value| match on_fulfilled(value) {
                Ok(resolution) => resolver.settle(resolution),
                Err(reason) => resolver.reject(reason),
            }),
            Box::new(move |reason| match on_rejected(reason) {
                Ok(resolution) => reject_resolver.settle(resolution),
                Err(next) => reject_resolver.reject(next),
            }),
        );
        downstream
    }

    /// Registers a side-effecting continuation that runs exactly once on
    /// either outcome.
    ///
    /// The settled value or reason passes through unchanged, unless
    /// `on_settled` fails; its error then rejects the returned promise,
    /// overriding the original outcome.
    pub fn finally<F>(&self, on_settled: F) -> Promise<T, E>
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
    {
        let (downstream, resolver) = Promise::with_resolver(Arc::clone(&self.sched));
        let hook = Arc::new(Mutex::new(Some(on_settled)));
        let fulfill_hook = Arc::clone(&hook);
        let fulfill_resolver = resolver.clone();
        self.subscribe(
            Box::new(move |value| match run_finally_hook(&fulfill_hook) {
                Ok(()) => fulfill_resolver.resolve(value),
                Err(reason) => fulfill_resolver.reject(reason),
            }),
            Box::new(move |reason| match run_finally_hook(&hook) {
                Ok(()) => resolver.reject(reason),
                Err(next) => resolver.reject(next),
            }),
        );
        downstream
    }

    /// Registers a pair of reactions. On a pending promise both are queued
    /// and the matching one fires at settlement, in registration order; on
    /// a settled promise the matching one is scheduled straight away. Never
    /// runs anything synchronously.
    pub(crate) fn subscribe(&self, on_fulfilled: Reaction<T>, on_rejected: Reaction<E>) {
        let mut inner = self.lock();
        match &mut inner.state {
            State::Pending {
                on_fulfilled: fulfill_queue,
                on_rejected: reject_queue,
            } => {
                fulfill_queue.push(on_fulfilled);
                reject_queue.push(on_rejected);
            }
            State::Fulfilled(value) => {
                let value = value.clone();
                drop(inner);
                self.sched.enqueue(Box::new(move || on_fulfilled(value)));
            }
            State::Rejected(reason) => {
                let reason = reason.clone();
                drop(inner);
                self.sched.enqueue(Box::new(move || on_rejected(reason)));
            }
        }
    }

    /// Claims the settlement latch. Returns `false` if a settlement was
    /// already accepted.
    fn claim(&self) -> bool {
        let mut inner = self.lock();
        if inner.claimed {
            trace!(promise_id = inner.id, "settlement ignored: already claimed");
            return false;
        }
        inner.claimed = true;
        true
    }

    /// Applies a terminal outcome and drains the matching reaction queue.
    /// Runs inside a scheduler task; reactions are invoked with the lock
    /// released, each with its own clone of the payload.
    fn finish(&self, outcome: Settled<T, E>) {
        let mut inner = self.lock();
        let State::Pending {
            on_fulfilled,
            on_rejected,
        } = &mut inner.state
        else {
            return;
        };
        let fulfilled = std::mem::take(on_fulfilled);
        let rejected = std::mem::take(on_rejected);
        match outcome {
            Settled::Fulfilled { value } => {
                debug!(
                    promise_id = inner.id,
                    reactions = fulfilled.len(),
                    "promise fulfilled"
                );
                inner.state = State::Fulfilled(value.clone());
                drop(inner);
                for reaction in fulfilled {
                    reaction(value.clone());
                }
            }
            Settled::Rejected { reason } => {
                debug!(
                    promise_id = inner.id,
                    reactions = rejected.len(),
                    "promise rejected"
                );
                if rejected.is_empty() {
                    debug!(promise_id = inner.id, "promise rejected with no rejection reactions");
                }
                inner.state = State::Rejected(reason.clone());
                drop(inner);
                for reaction in rejected {
                    reaction(reason.clone());
                }
            }
        }
    }

    /// Subscribes this promise to `inner`, adopting its eventual outcome.
    ///
    /// `inner` flattens its own resolution first, so the adopted outcome is
    /// always a plain value or reason; arbitrary nesting depth terminates
    /// level by level. The adopted settlement still transitions through a
    /// fresh scheduler task.
    fn adopt(&self, inner: Promise<T, E>) {
        trace!(
            outer_id = self.id(),
            inner_id = inner.id(),
            "adopting inner promise"
        );
        let fulfill_target = self.clone();
        let reject_target = self.clone();
        inner.subscribe(
            Box::new(move |value| {
                let target = fulfill_target.clone();
                fulfill_target
                    .sched
                    .enqueue(Box::new(move || target.finish(Settled::Fulfilled { value })));
            }),
            Box::new(move |reason| {
                let target = reject_target.clone();
                reject_target
                    .sched
                    .enqueue(Box::new(move || target.finish(Settled::Rejected { reason })));
            }),
        );
    }
}

/// Settlement capability for one [`Promise`].
///
/// Cloneable; all clones share the one-shot settlement latch, so only the
/// first accepted settlement across every clone has any effect.
pub struct Resolver<T, E> {
    target: Promise<T, E>,
}

impl<T, E> Clone for Resolver<T, E> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("promise_id", &self.target.id())
            .finish()
    }
}

impl<T, E> Resolver<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Fulfills the promise with `value` on the next tick, if no settlement
    /// was accepted yet.
    pub fn resolve(&self, value: T) {
        self.settle(Resolution::Direct(value));
    }

    /// Rejects the promise with `reason` on the next tick, if no settlement
    /// was accepted yet.
    pub fn reject(&self, reason: E) {
        if !self.target.claim() {
            return;
        }
        let target = self.target.clone();
        self.target
            .sched
            .enqueue(Box::new(move || target.finish(Settled::Rejected { reason })));
    }

    /// Applies `resolution`, if no settlement was accepted yet: a direct
    /// value fulfills the promise on the next tick, a deferred one adopts
    /// the other promise's eventual outcome.
    pub fn settle(&self, resolution: Resolution<T, E>) {
        if !self.target.claim() {
            return;
        }
        match resolution {
            Resolution::Direct(value) => {
                let target = self.target.clone();
                self.target
                    .sched
                    .enqueue(Box::new(move || target.finish(Settled::Fulfilled { value })));
            }
            Resolution::Deferred(inner) => {
                let target = self.target.clone();
                self.target
                    .sched
                    .enqueue(Box::new(move || target.adopt(inner)));
            }
        }
    }
}

/// Takes and runs a `finally` hook. Only one of the two registered
/// reactions ever finds it present.
fn run_finally_hook<E, F>(slot: &Mutex<Option<F>>) -> Result<(), E>
where
    F: FnOnce() -> Result<(), E>,
{
    let hook = slot.lock().expect("finally hook lock poisoned").take();
    match hook {
        Some(hook) => hook(),
        None => Ok(()),
    }
}
