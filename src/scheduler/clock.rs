//! Virtual time.

/// Monotonic virtual clock measured in milliseconds.
///
/// Time only moves when a driver advances it past a timer deadline; nothing
/// reads the host clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VirtualClock {
    now_ms: u64,
}

impl VirtualClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub const fn new() -> Self {
        Self { now_ms: 0 }
    }

    /// Current virtual time in milliseconds.
    #[must_use]
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Advances to `deadline_ms`. Earlier deadlines leave the clock
    /// unchanged.
    pub fn advance_to(&mut self, deadline_ms: u64) {
        if deadline_ms > self.now_ms {
            self.now_ms = deadline_ms;
        }
    }
}
