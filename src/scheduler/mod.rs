//! The scheduler seam and its deterministic drivers.
//!
//! The promise core depends on exactly one environment capability: a FIFO
//! sink for zero-argument tasks, expressed by the [`Scheduler`] trait. It
//! only ever enqueues; nothing runs on the caller's stack. The crate ships
//! two drivers:
//!
//! - [`TaskQueue`]: a strict-FIFO microtask queue, steppable one task at a
//!   time
//! - [`EventLoop`]: the queue plus virtual-time one-shot timers, with the
//!   classic turn model (drain all microtasks, then fire one due timer)
//!
//! Both record into a shared [`TraceLog`](crate::trace::TraceLog) witness.

mod clock;
mod event_loop;
mod queue;

pub use clock::VirtualClock;
pub use event_loop::{EventLoop, TurnReport};
pub use queue::TaskQueue;

use std::sync::Arc;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send>;

/// FIFO task sink the promise core settles through.
///
/// Tasks enqueued earlier are dispatched earlier; there are no priority
/// levels. `enqueue` must only store the task, never run it.
pub trait Scheduler: Send + Sync {
    /// Appends `task` to the queue.
    fn enqueue(&self, task: Task);
}

/// Shared handle to a [`Scheduler`].
pub type SchedulerHandle = Arc<dyn Scheduler>;
