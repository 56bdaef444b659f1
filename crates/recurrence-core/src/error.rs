//! Error types for recurrence-core operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    /// Malformed or contradictory rule fields. Raised by the validating
    /// constructors and re-checked when an expansion starts.
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    /// A rule that never ends was expanded without `max_count` or `max_horizon`.
    #[error("Unbounded expansion: rule never ends and no max_count or max_horizon was given")]
    UnboundedExpansion,

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

impl RecurrenceError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRule(message.into())
    }
}

pub type Result<T> = std::result::Result<T, RecurrenceError>;
