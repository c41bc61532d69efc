//! Application layer - Lock arbitration and event delivery built on the domain types

pub mod ports;
pub mod services;
