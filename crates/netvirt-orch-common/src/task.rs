//! Event processing status.

/// Result of processing a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Event handled, all required actions issued
    Success,
    /// Event had nothing to do (no tenant network, unhandled action, ...)
    Ignore,
    /// Event shape has no handler and was dropped
    InvalidEntry,
    /// Event handling failed; the failure is contained to this event
    Failed,
}
