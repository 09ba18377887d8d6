//! Configuration for the deterministic drivers.
//!
//! The loop configuration controls the two safety valves of the scheduling
//! layer:
//! - How many tasks a single drain may dispatch before it gives up
//! - How many witness events the trace log retains

/// Configuration for [`TaskQueue`](crate::scheduler::TaskQueue) and
/// [`EventLoop`](crate::scheduler::EventLoop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Maximum tasks one drain may dispatch before failing with
    /// [`DriveError::BudgetExhausted`](crate::error::DriveError::BudgetExhausted).
    pub drain_budget: u64,
    /// Witness log capacity; the oldest events are evicted beyond it.
    pub trace_capacity: usize,
}

impl LoopConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            drain_budget: 100_000,
            trace_capacity: 4096,
        }
    }

    /// Sets the drain budget.
    #[must_use]
    pub const fn drain_budget(mut self, budget: u64) -> Self {
        self.drain_budget = budget;
        self
    }

    /// Sets the witness log capacity.
    #[must_use]
    pub const fn trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity;
        self
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = LoopConfig::default();
        assert_eq!(config.drain_budget, 100_000);
        assert_eq!(config.trace_capacity, 4096);
    }

    #[test]
    fn builder_setters_replace_fields() {
        let config = LoopConfig::new().drain_budget(64).trace_capacity(16);
        assert_eq!(config.drain_budget, 64);
        assert_eq!(config.trace_capacity, 16);
    }
}
