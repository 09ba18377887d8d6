//! Deterministic event loop: microtask draining plus virtual-time timers.

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};

use crate::config::LoopConfig;
use crate::error::DriveError;
use crate::trace::{TraceEvent, TraceLog};
use crate::tracing_compat::trace;

use super::{SchedulerHandle, Task, TaskQueue, VirtualClock};

struct TimerEntry {
    fire_at_ms: u64,
    id: u64,
    task: Task,
}

// Heap order is by deadline, then registration id. The task is not part of
// the key.
impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at_ms == other.fire_at_ms && self.id == other.id
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.fire_at_ms, self.id).cmp(&(other.fire_at_ms, other.id))
    }
}

struct LoopInner {
    clock: VirtualClock,
    timers: BinaryHeap<Reverse<TimerEntry>>,
    next_timer_id: u64,
}

/// What one [`EventLoop::turn`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnReport {
    /// Microtasks dispatched during the drain phase.
    pub microtasks: u64,
    /// Whether a timer fired this turn.
    pub timer_fired: bool,
}

/// Deterministic event loop over a [`TaskQueue`].
///
/// A turn first drains every queued microtask, then fires the single
/// earliest due timer, advancing the virtual clock to its deadline when the
/// queue went idle first. Timers with equal deadlines fire in registration
/// order. The loop and its queue record into one shared witness log.
#[derive(Clone)]
pub struct EventLoop {
    queue: TaskQueue,
    inner: Arc<Mutex<LoopInner>>,
    trace: TraceLog,
}

impl EventLoop {
    /// Creates a loop with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default())
    }

    /// Creates a loop configured by `config`.
    #[must_use]
    pub fn with_config(config: LoopConfig) -> Self {
        let trace = TraceLog::with_capacity(config.trace_capacity);
        Self {
            queue: TaskQueue::with_trace(config, trace.clone()),
            inner: Arc::new(Mutex::new(LoopInner {
                clock: VirtualClock::new(),
                timers: BinaryHeap::new(),
                next_timer_id: 1,
            })),
            trace,
        }
    }

    /// Erased handle to the microtask queue.
    #[must_use]
    pub fn scheduler(&self) -> SchedulerHandle {
        self.queue.handle()
    }

    /// The underlying microtask queue.
    #[must_use]
    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    /// Current virtual time in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.lock().clock.now_ms()
    }

    /// The witness log shared by the queue and the timer layer.
    #[must_use]
    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    /// Registers a one-shot timer firing `delay_ms` after the current
    /// virtual time. Returns the timer id.
    pub fn set_timeout(&self, delay_ms: u64, task: Task) -> u64 {
        let (id, fire_at_ms) = {
            let mut inner = self.lock();
            let id = inner.next_timer_id;
            inner.next_timer_id += 1;
            let fire_at_ms = inner.clock.now_ms().saturating_add(delay_ms);
            inner.timers.push(Reverse(TimerEntry {
                fire_at_ms,
                id,
                task,
            }));
            (id, fire_at_ms)
        };
        self.trace.record(TraceEvent::TimerScheduled { id, fire_at_ms });
        trace!(id, fire_at_ms, "timer scheduled");
        id
    }

    /// Number of timers not yet fired.
    #[must_use]
    pub fn timers_pending(&self) -> usize {
        self.lock().timers.len()
    }

    /// Returns `true` while either microtasks or timers remain.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        !self.queue.is_idle() || !self.lock().timers.is_empty()
    }

    /// Runs one turn: drains the microtask queue, then fires the earliest
    /// due timer, advancing the clock to its deadline if nothing was due
    /// yet.
    ///
    /// # Errors
    ///
    /// [`DriveError::BudgetExhausted`] if the microtask drain exceeds the
    /// configured budget.
    pub fn turn(&self) -> Result<TurnReport, DriveError> {
        let microtasks = self.queue.run_until_idle()?;
        let fired = {
            let mut inner = self.lock();
            let popped = inner.timers.pop();
            popped.map(|Reverse(entry)| {
                let from_ms = inner.clock.now_ms();
                inner.clock.advance_to(entry.fire_at_ms);
                let to_ms = inner.clock.now_ms();
                (entry, from_ms, to_ms)
            })
        };
        let Some((entry, from_ms, to_ms)) = fired else {
            return Ok(TurnReport {
                microtasks,
                timer_fired: false,
            });
        };
        if to_ms > from_ms {
            self.trace.record(TraceEvent::ClockAdvanced { from_ms, to_ms });
        }
        self.trace.record(TraceEvent::TimerFired { id: entry.id });
        trace!(id = entry.id, now_ms = to_ms, "timer fired");
        (entry.task)();
        Ok(TurnReport {
            microtasks,
            timer_fired: true,
        })
    }

    /// Runs turns until no microtask and no timer remains, returning the
    /// total number of microtasks dispatched.
    ///
    /// # Errors
    ///
    /// [`DriveError::BudgetExhausted`] if any single drain phase exceeds
    /// the configured budget.
    pub fn run(&self) -> Result<u64, DriveError> {
        let mut total = 0;
        loop {
            let report = self.turn()?;
            total += report.microtasks;
            if !report.timer_fired && self.queue.is_idle() {
                return Ok(total);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoopInner> {
        self.inner.lock().expect("event loop lock poisoned")
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}
