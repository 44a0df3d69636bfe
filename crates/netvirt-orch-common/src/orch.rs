//! Base Orch trait.

use async_trait::async_trait;

/// Base trait for reconciliation workers.
///
/// Each worker implements this trait to participate in the dispatcher
/// event loop. The dispatcher calls [`Orch::do_task`] whenever the worker
/// reports pending work.
///
/// # Lifecycle
///
/// 1. Construction: the worker receives its collaborators
/// 2. Event loop: `do_task()` is called when events are queued
/// 3. Shutdown: the worker is dropped once the loop exits
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so the dispatcher can own them
/// from a spawned task.
#[async_trait]
pub trait Orch: Send + Sync {
    /// Returns the name of this Orch (for logging and debugging).
    fn name(&self) -> &str;

    /// Processes pending events.
    ///
    /// Implementations should:
    /// 1. Drain pending events in arrival order
    /// 2. Process each event to completion
    /// 3. Contain failures to the event that produced them
    async fn do_task(&mut self);

    /// Returns the priority of this Orch (lower = higher priority).
    fn priority(&self) -> i32 {
        0
    }

    /// Returns true if this Orch has pending work.
    fn has_pending_tasks(&self) -> bool {
        false
    }

    /// Dumps pending tasks for debugging.
    fn dump_pending_tasks(&self) -> Vec<String> {
        vec![]
    }
}
