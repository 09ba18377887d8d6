//! Error types.

use thiserror::Error;

/// Error carrying every rejection reason when no input fulfilled.
///
/// Produced by [`Promise::any`](crate::Promise::any) once all of its inputs
/// have rejected. Reasons are stored in input order, regardless of the order
/// in which the inputs settled. An empty reason list is valid: `any` of no
/// inputs rejects with an empty aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError<E> {
    message: String,
    reasons: Vec<E>,
}

impl<E> AggregateError<E> {
    /// Creates an aggregate with the canonical all-rejected message.
    #[must_use]
    pub fn all_rejected(reasons: Vec<E>) -> Self {
        Self::with_message("all promises were rejected", reasons)
    }

    /// Creates an aggregate with a caller-supplied message.
    #[must_use]
    pub fn with_message(message: impl Into<String>, reasons: Vec<E>) -> Self {
        Self {
            message: message.into(),
            reasons,
        }
    }

    /// The aggregate message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The underlying reasons, in input order.
    #[must_use]
    pub fn reasons(&self) -> &[E] {
        &self.reasons
    }

    /// Consumes the aggregate, yielding the reasons in input order.
    #[must_use]
    pub fn into_reasons(self) -> Vec<E> {
        self.reasons
    }
}

impl<E> std::fmt::Display for AggregateError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} reasons)", self.message, self.reasons.len())
    }
}

impl<E: std::fmt::Debug> std::error::Error for AggregateError<E> {}

/// Error returned when driving a scheduler fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DriveError {
    /// The drain budget ran out with tasks still queued.
    ///
    /// Almost always a task chain that keeps feeding itself; raising the
    /// budget via [`LoopConfig`](crate::config::LoopConfig) is the escape
    /// hatch for legitimately long drains.
    #[error("drain budget exhausted after {ran} tasks (budget {budget})")]
    BudgetExhausted {
        /// Tasks dispatched before giving up.
        ran: u64,
        /// The configured budget.
        budget: u64,
    },
}
