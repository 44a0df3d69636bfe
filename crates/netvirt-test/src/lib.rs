//! Test infrastructure for the netvirt southbound engine
//!
//! Provides:
//! - Fixtures for termination points, tenant networks and raw rows
//! - Recording provider and L3 collaborators
//! - A [`Harness`] wiring a handler over an in-memory inventory

pub mod fixtures;
mod harness;
mod recorder;

pub use fixtures::*;
pub use harness::Harness;
pub use recorder::*;
