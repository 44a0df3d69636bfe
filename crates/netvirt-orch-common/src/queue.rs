//! Strictly ordered event queue.

use std::collections::VecDeque;
use std::fmt::Debug;

/// Configuration for an [`EventQueue`].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue name used in dumps (e.g., "southbound")
    pub name: String,
    /// Maximum number of events returned by one `drain_batch`
    pub batch_size: usize,
}

impl QueueConfig {
    /// Creates a new queue config.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batch_size: 128,
        }
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// FIFO queue of pending events for a single reconciliation worker.
///
/// Events are handed out exactly in the order they were pushed. There is
/// no per-key merging and no de-duplication: a row delete and a port delete
/// for the same interface are two entries, and both are delivered.
#[derive(Debug)]
pub struct EventQueue<E> {
    config: QueueConfig,
    pending: VecDeque<E>,
}

impl<E: Debug> EventQueue<E> {
    /// Creates a new queue with the given configuration.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            pending: VecDeque::new(),
        }
    }

    /// Returns the queue name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns true if there are pending events.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns the number of pending events.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Returns the maximum number of events one `drain_batch` hands out.
    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    /// Appends an event at the tail.
    pub fn push(&mut self, event: E) {
        self.pending.push_back(event);
    }

    /// Removes up to `batch_size` events from the head, preserving order.
    pub fn drain_batch(&mut self) -> Vec<E> {
        let n = self.config.batch_size.min(self.pending.len());
        self.pending.drain(..n).collect()
    }

    /// Dumps pending events for debugging.
    pub fn dump(&self) -> Vec<String> {
        self.pending
            .iter()
            .enumerate()
            .map(|(i, e)| format!("{}[{}]: {:?}", self.config.name, i, e))
            .collect()
    }
}
