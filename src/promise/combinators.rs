//! Static constructors and combinators over collections of inputs.
//!
//! Every combinator normalizes its inputs through [`Promise::resolve`], so
//! direct values and deferred outcomes mix freely. Results are reported in
//! input order regardless of settlement order; short-circuiting is decided
//! by settlement order, with same-tick ties going to the earlier scheduler
//! task.

use std::sync::{Arc, Mutex};

use crate::error::AggregateError;
use crate::scheduler::SchedulerHandle;
use crate::tracing_compat::debug;

use super::core::{Promise, Resolution, Settled};

/// Collects per-input outcomes into their original positions.
struct SlotTracker<V> {
    slots: Vec<Option<V>>,
    remaining: usize,
}

impl<V> SlotTracker<V> {
    fn new(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, || None);
        Self {
            slots,
            remaining: len,
        }
    }

    /// Stores `value` at `index`. Returns the completed, input-ordered
    /// collection once the last slot fills.
    fn record(&mut self, index: usize, value: V) -> Option<Vec<V>> {
        if self.slots[index].is_none() {
            self.slots[index] = Some(value);
            self.remaining -= 1;
        }
        if self.remaining == 0 {
            Some(self.slots.drain(..).flatten().collect())
        } else {
            None
        }
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a promise resolved with `resolution`.
    ///
    /// The settlement still runs as a scheduled task, so the promise stays
    /// pending until the scheduler is stepped. A deferred resolution adopts
    /// the other promise's eventual outcome.
    #[must_use]
    pub fn resolve(sched: SchedulerHandle, resolution: Resolution<T, E>) -> Self {
        let (promise, resolver) = Self::with_resolver(sched);
        resolver.settle(resolution);
        promise
    }

    /// Creates a promise rejected with `reason`.
    ///
    /// Rejection reasons are carried verbatim; they never flatten.
    #[must_use]
    pub fn reject(sched: SchedulerHandle, reason: E) -> Self {
        let (promise, resolver) = Self::with_resolver(sched);
        resolver.reject(reason);
        promise
    }

    /// Fulfills with every input's value, in input order, once all inputs
    /// fulfill.
    ///
    /// The first rejection in settlement order rejects the result with that
    /// reason and later outcomes are ignored. An empty input fulfills with
    /// an empty `Vec` on the next tick.
    #[must_use]
    pub fn all(sched: SchedulerHandle, inputs: Vec<Resolution<T, E>>) -> Promise<Vec<T>, E> {
        let (combined, resolver) = Promise::with_resolver(Arc::clone(&sched));
        if inputs.is_empty() {
            resolver.resolve(Vec::new());
            return combined;
        }
        debug!(inputs = inputs.len(), "combining with all");
        let tracker = Arc::new(Mutex::new(SlotTracker::new(inputs.len())));
        for (index, input) in inputs.into_iter().enumerate() {
            let tracker = Arc::clone(&tracker);
            let fulfill_resolver = resolver.clone();
            let reject_resolver = resolver.clone();
            Self::resolve(Arc::clone(&sched), input).subscribe(
                Box::new(move |value| {
                    let completed = tracker
                        .lock()
                        .expect("all tracker lock poisoned")
                        .record(index, value);
                    if let Some(values) = completed {
                        fulfill_resolver.resolve(values);
                    }
                }),
                Box::new(move |reason| reject_resolver.reject(reason)),
            );
        }
        combined
    }

    /// Fulfills with one outcome record per input, in input order, once all
    /// inputs settle. Never rejects.
    #[must_use]
    pub fn all_settled(
        sched: SchedulerHandle,
        inputs: Vec<Resolution<T, E>>,
    ) -> Promise<Vec<Settled<T, E>>, E> {
        let (combined, resolver) = Promise::with_resolver(Arc::clone(&sched));
        if inputs.is_empty() {
            resolver.resolve(Vec::new());
            return combined;
        }
        debug!(inputs = inputs.len(), "combining with all_settled");
        let tracker = Arc::new(Mutex::new(SlotTracker::new(inputs.len())));
        for (index, input) in inputs.into_iter().enumerate() {
            let fulfill_tracker = Arc::clone(&tracker);
            let reject_tracker = Arc::clone(&tracker);
            let fulfill_resolver = resolver.clone();
            let reject_resolver = resolver.clone();
            Self::resolve(Arc::clone(&sched), input).subscribe(
                Box::new(move |value| {
                    let completed = fulfill_tracker
                        .lock()
                        .expect("all_settled tracker lock poisoned")
                        .record(index, Settled::Fulfilled { value });
                    if let Some(outcomes) = completed {
                        fulfill_resolver.resolve(outcomes);
                    }
                }),
                Box::new(move |reason| {
                    let completed = reject_tracker
                        .lock()
                        .expect("all_settled tracker lock poisoned")
                        .record(index, Settled::Rejected { reason });
                    if let Some(outcomes) = completed {
                        reject_resolver.resolve(outcomes);
                    }
                }),
            );
        }
        combined
    }

    /// Settles with the first input to settle, value or reason alike.
    ///
    /// Same-tick ties go to the earlier scheduler task, which for direct
    /// values is the earlier input position. An empty input never settles.
    #[must_use]
    pub fn race(sched: SchedulerHandle, inputs: Vec<Resolution<T, E>>) -> Self {
        let (winner, resolver) = Promise::with_resolver(Arc::clone(&sched));
        debug!(inputs = inputs.len(), "combining with race");
        for input in inputs {
            let fulfill_resolver = resolver.clone();
            let reject_resolver = resolver.clone();
            Self::resolve(Arc::clone(&sched), input).subscribe(
                Box::new(move |value| fulfill_resolver.resolve(value)),
                Box::new(move |reason| reject_resolver.reject(reason)),
            );
        }
        winner
    }

    /// Fulfills with the first input to fulfill; rejects only after every
    /// input has rejected, with an [`AggregateError`] carrying all reasons
    /// in input order.
    ///
    /// An empty input rejects with an empty aggregate on the next tick.
    #[must_use]
    pub fn any(
        sched: SchedulerHandle,
        inputs: Vec<Resolution<T, E>>,
    ) -> Promise<T, AggregateError<E>> {
        let (first, resolver) = Promise::with_resolver(Arc::clone(&sched));
        if inputs.is_empty() {
            resolver.reject(AggregateError::all_rejected(Vec::new()));
            return first;
        }
        debug!(inputs = inputs.len(), "combining with any");
        let tracker = Arc::new(Mutex::new(SlotTracker::new(inputs.len())));
        for (index, input) in inputs.into_iter().enumerate() {
            let tracker = Arc::clone(&tracker);
            let fulfill_resolver = resolver.clone();
            let reject_resolver = resolver.clone();
            Self::resolve(Arc::clone(&sched), input).subscribe(
                Box::new(move |value| fulfill_resolver.resolve(value)),
                Box::new(move |reason| {
                    let completed = tracker
                        .lock()
                        .expect("any tracker lock poisoned")
                        .record(index, reason);
                    if let Some(reasons) = completed {
                        reject_resolver.reject(AggregateError::all_rejected(reasons));
                    }
                }),
            );
        }
        first
    }
}
