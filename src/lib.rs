//! WorldLock Kernel - World-state coordination for simulation subsystems
//!
//! The kernel pairs an advisory lock manager, which serializes access to
//! shared world state, with a priority event bus that lets subsystems observe
//! each other's changes. A `WorldCoordinator` owns both for one session.

pub mod application;
pub mod domain;
pub mod infrastructure;
