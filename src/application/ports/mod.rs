//! Ports - Interfaces between the coordination services and the subsystems they serve

pub mod outbound;
