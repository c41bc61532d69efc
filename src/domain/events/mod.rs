//! Domain events - Notifications of state changes within the world

mod global_event;
mod lock_events;

pub use global_event::{EventPriority, EventType, GlobalEvent};
pub use lock_events::{LockEvent, ReleaseReason};
