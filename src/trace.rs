//! Witness log of scheduler activity.
//!
//! Every enqueue, dispatch, timer registration, timer fire, and clock
//! advance is recorded as a [`TraceEvent`]. Identical operation sequences
//! produce identical event sequences, which is what lets tests pin
//! determinism: run a scenario twice, compare the snapshots. Events are
//! serde-serializable so snapshots can be exported as JSON lines and diffed
//! offline.
//!
//! The log is bounded: beyond its configured capacity the oldest events are
//! evicted and counted in [`TraceLog::dropped`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// One recorded scheduler event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A task entered the queue.
    TaskEnqueued {
        /// Queue-wide sequence number of the task.
        seq: u64,
    },
    /// A task left the queue and ran.
    TaskDispatched {
        /// Queue-wide sequence number of the task.
        seq: u64,
    },
    /// A one-shot timer was registered.
    TimerScheduled {
        /// Timer id.
        id: u64,
        /// Virtual deadline in milliseconds.
        fire_at_ms: u64,
    },
    /// A timer's task ran.
    TimerFired {
        /// Timer id.
        id: u64,
    },
    /// The virtual clock moved forward.
    ClockAdvanced {
        /// Previous time in milliseconds.
        from_ms: u64,
        /// New time in milliseconds.
        to_ms: u64,
    },
}

#[derive(Debug)]
struct LogInner {
    events: VecDeque<TraceEvent>,
    capacity: usize,
    dropped: u64,
}

/// Cloneable handle to a bounded, drop-oldest event log.
///
/// All clones share the same buffer. The queue and the event loop record
/// into one shared log so a snapshot shows the full interleaving.
#[derive(Debug, Clone)]
pub struct TraceLog {
    inner: Arc<Mutex<LogInner>>,
}

impl TraceLog {
    /// Creates a log retaining at most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogInner {
                events: VecDeque::with_capacity(capacity),
                capacity,
                dropped: 0,
            })),
        }
    }

    /// Appends `event`, evicting the oldest entry when the log is full.
    ///
    /// A zero-capacity log retains nothing and counts every event as
    /// dropped.
    pub fn record(&self, event: TraceEvent) {
        let mut inner = self.lock();
        if inner.capacity == 0 {
            inner.dropped += 1;
            return;
        }
        if inner.events.len() == inner.capacity {
            inner.events.pop_front();
            inner.dropped += 1;
        }
        inner.events.push_back(event);
    }

    /// The retained events, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TraceEvent> {
        self.lock().events.iter().copied().collect()
    }

    /// Number of retained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    /// Returns `true` when nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().events.is_empty()
    }

    /// Events evicted or refused since creation.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    /// Discards the retained events. The dropped counter keeps its value.
    pub fn clear(&self) {
        self.lock().events.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LogInner> {
        self.inner.lock().expect("trace log lock poisoned")
    }
}
