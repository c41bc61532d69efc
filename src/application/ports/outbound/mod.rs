//! Outbound ports - Interfaces that the application requires from other subsystems

mod event_listener_port;

pub use event_listener_port::EventListener;
