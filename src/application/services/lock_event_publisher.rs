//! Lock Event Publisher - Maps LockEvents to WorldStateChanged global events
//!
//! The lock manager writes its transitions to an unbounded channel. This
//! publisher drains that channel and broadcasts a deferred
//! `WorldStateChanged` event per transition on the event bus, so listeners
//! see lock changes on the next dispatch pass.

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::application::services::EventBus;
use crate::domain::entities::LockRequest;
use crate::domain::events::{EventPriority, EventType, GlobalEvent, LockEvent};

/// Source name stamped on every lock state event
pub const LOCK_EVENT_SOURCE: &str = "WorldStateLock";

/// Publisher that converts LockEvents to global events
#[derive(Debug, Default)]
pub struct LockEventPublisher;

impl LockEventPublisher {
    pub fn new() -> Self {
        Self
    }

    /// Publish every notification currently buffered in `lock_event_rx`
    ///
    /// Returns the number of global events broadcast.
    pub fn publish_pending(
        &self,
        lock_event_rx: &mut UnboundedReceiver<LockEvent>,
        event_bus: &mut EventBus,
    ) -> usize {
        let mut published = 0;
        while let Ok(event) = lock_event_rx.try_recv() {
            if let Some(global_event) = self.map_to_global_event(event) {
                event_bus.broadcast_event(global_event);
                published += 1;
            }
        }
        published
    }

    /// Map a LockEvent to a WorldStateChanged event
    ///
    /// Requests produce no global event; the resulting grant does.
    pub fn map_to_global_event(&self, event: LockEvent) -> Option<GlobalEvent> {
        match event {
            LockEvent::Requested {
                request,
                granted,
                reason,
            } => {
                debug!(
                    lock_type = %request.lock_type,
                    requester = %request.requester_id,
                    granted,
                    reason = %reason,
                    "Lock request processed"
                );
                None
            }
            LockEvent::Granted { lock } => Some(lock_state_event(&lock, true, "Granted")),
            LockEvent::Released { lock, reason } => {
                Some(lock_state_event(&lock, false, reason.as_str()))
            }
            LockEvent::ForceCleared {
                released,
                dropped_queued,
            } => Some(
                GlobalEvent::new(EventType::WorldStateChanged, LOCK_EVENT_SOURCE)
                    .with_priority(EventPriority::Normal)
                    .with_data("ForceCleared", "true")
                    .with_data("Locked", "false")
                    .with_data("ActiveCount", released.len().to_string())
                    .with_data("QueuedCount", dropped_queued.to_string()),
            ),
        }
    }
}

fn lock_state_event(lock: &LockRequest, locked: bool, reason: &str) -> GlobalEvent {
    GlobalEvent::new(EventType::WorldStateChanged, LOCK_EVENT_SOURCE)
        .with_priority(EventPriority::Normal)
        .with_data("LockType", lock.lock_type.as_str())
        .with_data("RequesterID", lock.requester_id.clone())
        .with_data("LockID", lock.id.to_string())
        .with_data("Locked", locked.to_string())
        .with_data("Reason", reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::ReleaseReason;
    use crate::domain::value_objects::LockType;
    use tokio::sync::mpsc;

    fn save_request() -> LockRequest {
        LockRequest::new(LockType::Save, "persistence", "autosave")
    }

    #[test]
    fn test_requested_is_not_published() {
        let publisher = LockEventPublisher::new();
        let event = LockEvent::Requested {
            request: save_request(),
            granted: true,
            reason: "Lock granted immediately".to_string(),
        };

        assert!(publisher.map_to_global_event(event).is_none());
    }

    #[test]
    fn test_granted_maps_to_locked_state() {
        let publisher = LockEventPublisher::new();
        let lock = save_request();
        let lock_id = lock.id.to_string();

        let event = publisher
            .map_to_global_event(LockEvent::Granted { lock })
            .unwrap();

        assert_eq!(event.event_type, EventType::WorldStateChanged);
        assert_eq!(event.source, LOCK_EVENT_SOURCE);
        assert!(!event.immediate);
        assert_eq!(event.data("LockType"), Some("Save"));
        assert_eq!(event.data("RequesterID"), Some("persistence"));
        assert_eq!(event.data("LockID"), Some(lock_id.as_str()));
        assert_eq!(event.data("Locked"), Some("true"));
    }

    #[test]
    fn test_expired_release_carries_reason() {
        let publisher = LockEventPublisher::new();
        let event = publisher
            .map_to_global_event(LockEvent::Released {
                lock: save_request(),
                reason: ReleaseReason::Expired,
            })
            .unwrap();

        assert_eq!(event.data("Locked"), Some("false"));
        assert_eq!(event.data("Reason"), Some("Expired"));
    }

    #[test]
    fn test_force_clear_is_one_event() {
        let publisher = LockEventPublisher::new();
        let event = publisher
            .map_to_global_event(LockEvent::ForceCleared {
                released: vec![save_request(), save_request()],
                dropped_queued: 3,
            })
            .unwrap();

        assert_eq!(event.data("ForceCleared"), Some("true"));
        assert_eq!(event.data("ActiveCount"), Some("2"));
        assert_eq!(event.data("QueuedCount"), Some("3"));
    }

    #[test]
    fn test_publish_pending_drains_channel_into_bus() {
        let publisher = LockEventPublisher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut bus = EventBus::new(16);
        let lock = save_request();

        tx.send(LockEvent::Requested {
            request: lock.clone(),
            granted: true,
            reason: String::new(),
        })
        .unwrap();
        tx.send(LockEvent::Granted { lock: lock.clone() }).unwrap();
        tx.send(LockEvent::Released {
            lock,
            reason: ReleaseReason::Explicit,
        })
        .unwrap();

        assert_eq!(publisher.publish_pending(&mut rx, &mut bus), 2);
        assert_eq!(bus.pending_len(), 2);
        assert_eq!(bus.event_count(EventType::WorldStateChanged), 2);
        assert!(rx.try_recv().is_err());
    }
}
