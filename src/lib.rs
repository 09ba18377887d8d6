//! Promissory: a deterministic promise primitive with an explicit scheduler.
//!
//! # Overview
//!
//! A [`Promise`] is the eventual result of an asynchronous computation. It
//! settles at most once, either fulfilled with a value or rejected with a
//! reason, and continuations registered through [`Promise::then`] and its
//! siblings observe that outcome in registration order. Nothing ever runs on
//! the stack that triggered a settlement: every transition and every
//! continuation is a task enqueued on an explicit FIFO scheduler, so code
//! following a `resolve` call always runs first and tests can step the world
//! one task at a time.
//!
//! # Core Guarantees
//!
//! - **At most one settlement**: the first accepted `resolve`/`reject` wins;
//!   later calls are silent no-ops
//! - **No synchronous reentry**: settlement and continuation dispatch happen
//!   in scheduler tasks, never inside the settling call
//! - **Deep flattening**: resolving with another promise adopts its eventual
//!   outcome, through any finite nesting depth
//! - **Deterministic ordering**: a strict-FIFO [`TaskQueue`] plus a
//!   virtual-time [`EventLoop`] make every interleaving reproducible, with a
//!   serializable witness log as evidence
//!
//! # Module Structure
//!
//! - [`promise`]: The promise state machine, chaining, and combinators
//! - [`scheduler`]: The scheduler seam and its deterministic drivers
//! - [`trace`]: Witness log of scheduler activity
//! - [`config`]: Tuning knobs for the deterministic drivers
//! - [`error`]: Error types
//! - [`tracing_compat`]: Feature-gated structured logging
//!
//! # Example
//!
//! ```
//! use promissory::{Promise, Resolution, TaskQueue};
//!
//! let queue = TaskQueue::new();
//! let promise = Promise::<i32, String>::new(queue.handle(), |resolver| {
//!     resolver.resolve(41);
//!     Ok(())
//! });
//! let bumped = promise.then(|n| Ok(Resolution::Direct(n + 1)));
//!
//! // Nothing has settled yet: settlement is itself a queued task.
//! assert!(promise.is_pending());
//!
//! queue.run_until_idle().expect("queue drained");
//! assert_eq!(bumped.try_value(), Some(42));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod error;
pub mod promise;
pub mod scheduler;
pub mod trace;
pub mod tracing_compat;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::LoopConfig;
pub use error::{AggregateError, DriveError};
pub use promise::{Promise, PromiseFuture, PromiseState, Resolution, Resolver, Settled};
pub use scheduler::{
    EventLoop, Scheduler, SchedulerHandle, Task, TaskQueue, TurnReport, VirtualClock,
};
pub use trace::{TraceEvent, TraceLog};
