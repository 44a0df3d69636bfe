//! Common orchestration abstractions for netvirt.
//!
//! This crate provides the core traits and types shared by the
//! reconciliation workers of the network virtualization control plane:
//!
//! - [`Orch`]: Base trait for event-loop participants
//! - [`EventQueue`]: Strictly ordered pending-event queue
//! - [`Action`]: Add/update/delete discriminator carried by every event
//! - [`TaskStatus`]: Outcome of processing a single event
//!
//! # Architecture
//!
//! 1. The southbound library reports a change (row, bridge, port, node)
//! 2. The change is classified into a typed event and enqueued
//! 3. The dispatcher loop calls [`Orch::do_task`] to drain the queue
//! 4. Each event is processed to completion before the next one starts
//!
//! Unlike table consumers that merge operations per key, an [`EventQueue`]
//! never coalesces or reorders: two events describing the same change are
//! both delivered, in arrival order.

mod action;
mod orch;
mod queue;
mod task;

pub use action::Action;
pub use orch::Orch;
pub use queue::{EventQueue, QueueConfig};
pub use task::TaskStatus;
