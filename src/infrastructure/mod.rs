//! Infrastructure layer - Host runtime around the coordinator
//!
//! This layer contains:
//! - Config: Application configuration from the environment
//! - State: Shared coordinator behind a single async mutex
//! - Tick worker: Periodic tick and statistics tasks

pub mod config;
pub mod state;
pub mod tick_worker;
