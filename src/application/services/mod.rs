//! Application services - Coordination use cases
//!
//! The lock manager and the event bus are independent state machines. The
//! world coordinator owns one of each and connects them through the lock
//! event publisher.

pub mod event_bus;
pub mod lock_event_publisher;
pub mod lock_manager;
pub mod world_coordinator;

pub use event_bus::{EventBus, EventBusStats, EventDelegate};
pub use lock_event_publisher::{LockEventPublisher, LOCK_EVENT_SOURCE};
pub use lock_manager::{LockGrant, LockManager, LockStatistics};
pub use world_coordinator::{CoordinatorStats, WorldCoordinator};
