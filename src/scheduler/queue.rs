//! Deterministic FIFO task queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::LoopConfig;
use crate::error::DriveError;
use crate::trace::{TraceEvent, TraceLog};
use crate::tracing_compat::{trace, warn};

use super::{Scheduler, SchedulerHandle, Task};

struct SequencedTask {
    seq: u64,
    task: Task,
}

struct QueueInner {
    tasks: VecDeque<SequencedTask>,
    enqueued_total: u64,
}

/// Strict-FIFO task queue behind a cloneable handle.
///
/// The queue is the crate's reference [`Scheduler`]: deterministic,
/// manually steppable, and fully observable through its witness log. Tasks
/// run with no queue lock held, so a running task may freely enqueue more
/// work.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Mutex<QueueInner>>,
    trace: TraceLog,
    drain_budget: u64,
}

impl TaskQueue {
    /// Creates an empty queue with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default())
    }

    /// Creates an empty queue configured by `config`.
    #[must_use]
    pub fn with_config(config: LoopConfig) -> Self {
        Self::with_trace(config, TraceLog::with_capacity(config.trace_capacity))
    }

    /// Creates an empty queue recording into an existing witness log.
    #[must_use]
    pub fn with_trace(config: LoopConfig, trace: TraceLog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner {
                tasks: VecDeque::new(),
                enqueued_total: 0,
            })),
            trace,
            drain_budget: config.drain_budget,
        }
    }

    /// Erased handle for the promise constructors.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        Arc::new(self.clone())
    }

    /// Dispatches exactly one task, if any is queued. Returns whether a
    /// task ran.
    pub fn step(&self) -> bool {
        let next = self.lock().tasks.pop_front();
        let Some(SequencedTask { seq, task }) = next else {
            return false;
        };
        self.trace.record(TraceEvent::TaskDispatched { seq });
        trace!(seq, "task dispatched");
        task();
        true
    }

    /// Dispatches queued tasks in FIFO order until the queue is empty,
    /// returning how many ran.
    ///
    /// # Errors
    ///
    /// [`DriveError::BudgetExhausted`] if the configured drain budget runs
    /// out while tasks remain queued.
    pub fn run_until_idle(&self) -> Result<u64, DriveError> {
        let mut ran = 0;
        while self.step() {
            ran += 1;
            if ran >= self.drain_budget && !self.is_idle() {
                warn!(
                    ran,
                    budget = self.drain_budget,
                    "drain budget exhausted with tasks still queued"
                );
                return Err(DriveError::BudgetExhausted {
                    ran,
                    budget: self.drain_budget,
                });
            }
        }
        Ok(ran)
    }

    /// Number of tasks currently queued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Returns `true` when nothing is queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    /// Total tasks ever enqueued.
    #[must_use]
    pub fn enqueued_total(&self) -> u64 {
        self.lock().enqueued_total
    }

    /// The witness log this queue records into.
    #[must_use]
    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueInner> {
        self.inner.lock().expect("task queue lock poisoned")
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TaskQueue {
    fn enqueue(&self, task: Task) {
        let seq = {
            let mut inner = self.lock();
            let seq = inner.enqueued_total;
            inner.enqueued_total += 1;
            inner.tasks.push_back(SequencedTask { seq, task });
            seq
        };
        self.trace.record(TraceEvent::TaskEnqueued { seq });
        trace!(seq, "task enqueued");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;

    fn init_test(test_name: &str) {
        init_test_logging();
        crate::test_phase!(test_name);
    }

    fn recording_task(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> Task {
        let log = Arc::clone(log);
        Box::new(move || log.lock().expect("record log poisoned").push(value))
    }

    #[test]
    fn dispatches_in_fifo_order() {
        init_test("dispatches_in_fifo_order");
        let queue = TaskQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for value in [1, 2, 3] {
            queue.enqueue(recording_task(&log, value));
        }
        let ran = queue.run_until_idle().expect("queue drained");
        assert_eq!(ran, 3);
        assert_eq!(*log.lock().expect("record log poisoned"), vec![1, 2, 3]);
        crate::test_complete!("dispatches_in_fifo_order");
    }

    #[test]
    fn step_on_empty_queue_returns_false() {
        init_test("step_on_empty_queue_returns_false");
        let queue = TaskQueue::new();
        assert!(!queue.step());
        assert!(queue.is_idle());
        crate::test_complete!("step_on_empty_queue_returns_false");
    }

    #[test]
    fn tasks_enqueued_while_running_go_to_the_back() {
        init_test("tasks_enqueued_while_running_go_to_the_back");
        let queue = TaskQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_task = recording_task(&log, 3);
        let requeue = queue.clone();
        let first_log = Arc::clone(&log);
        queue.enqueue(Box::new(move || {
            first_log.lock().expect("record log poisoned").push(1);
            requeue.enqueue(inner_task);
        }));
        queue.enqueue(recording_task(&log, 2));
        queue.run_until_idle().expect("queue drained");
        assert_eq!(*log.lock().expect("record log poisoned"), vec![1, 2, 3]);
        crate::test_complete!("tasks_enqueued_while_running_go_to_the_back");
    }

    #[test]
    fn budget_exhaustion_surfaces_as_error() {
        init_test("budget_exhaustion_surfaces_as_error");
        fn feed(queue: &TaskQueue) {
            let next = queue.clone();
            queue.enqueue(Box::new(move || feed(&next)));
        }
        let queue = TaskQueue::with_config(LoopConfig::new().drain_budget(16));
        feed(&queue);
        let err = queue.run_until_idle().expect_err("self-feeding chain");
        assert_eq!(err, DriveError::BudgetExhausted { ran: 16, budget: 16 });
        crate::test_complete!("budget_exhaustion_surfaces_as_error");
    }

    #[test]
    fn counters_track_enqueue_and_dispatch() {
        init_test("counters_track_enqueue_and_dispatch");
        let queue = TaskQueue::new();
        queue.enqueue(Box::new(|| {}));
        queue.enqueue(Box::new(|| {}));
        assert_eq!(queue.enqueued_total(), 2);
        assert_eq!(queue.pending(), 2);
        assert!(queue.step());
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.enqueued_total(), 2);
        crate::test_complete!("counters_track_enqueue_and_dispatch");
    }
}
