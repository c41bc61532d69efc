//! World Coordinator - Session-scoped facade over the lock manager and event bus
//!
//! One coordinator is created when a world session starts and shut down when
//! it ends. It wires lock notifications into the bus and drives both
//! components from a single `tick`.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};

use crate::application::services::{
    EventBus, EventBusStats, LockEventPublisher, LockGrant, LockManager, LockStatistics,
};
use crate::domain::entities::LockRequest;
use crate::domain::events::LockEvent;
use crate::domain::value_objects::{CoordinatorSettings, LockId, LockPriority, LockType};

/// Combined statistics snapshot, logged periodically by the host
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStats {
    pub world_time_secs: f64,
    pub active_locks: usize,
    pub queued_locks: usize,
    pub locks: LockStatistics,
    pub events: EventBusStats,
}

pub struct WorldCoordinator {
    settings: CoordinatorSettings,
    lock_manager: LockManager,
    event_bus: EventBus,
    publisher: LockEventPublisher,
    lock_event_rx: UnboundedReceiver<LockEvent>,
    shut_down: bool,
}

impl WorldCoordinator {
    pub fn new(settings: CoordinatorSettings) -> Self {
        let (lock_event_tx, lock_event_rx) = mpsc::unbounded_channel();
        let lock_manager = LockManager::new(&settings).with_notifications(lock_event_tx);
        let event_bus = EventBus::from_settings(&settings);

        info!(
            max_event_history = settings.max_event_history,
            "World coordinator initialized"
        );

        Self {
            settings,
            lock_manager,
            event_bus,
            publisher: LockEventPublisher::new(),
            lock_event_rx,
            shut_down: false,
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Bus access for registration and broadcasting
    pub fn event_bus_mut(&mut self) -> &mut EventBus {
        &mut self.event_bus
    }

    /// Advance both components by `delta`
    ///
    /// Lock state changes produced by this tick are delivered in the same
    /// tick's dispatch pass.
    pub fn tick(&mut self, delta: Duration) {
        self.lock_manager.tick(delta);
        self.publish_lock_events();
        self.event_bus.tick(delta);
    }

    fn publish_lock_events(&mut self) {
        self.publisher
            .publish_pending(&mut self.lock_event_rx, &mut self.event_bus);
    }

    // ------------------------------------------------------------------------
    // Locks
    // ------------------------------------------------------------------------

    /// Whether a request must be turned away because the session is over
    fn refuse_after_shutdown(&self, lock_type: LockType, requester_id: &str) -> bool {
        if self.shut_down {
            warn!(
                lock_type = %lock_type,
                requester = %requester_id,
                "Lock requested after coordinator shutdown"
            );
        }
        self.shut_down
    }

    /// Submit a lock request. Refused once the coordinator has shut down.
    pub fn request_lock(&mut self, request: LockRequest) -> LockGrant {
        if self.refuse_after_shutdown(request.lock_type, &request.requester_id) {
            return LockGrant::Refused;
        }
        let grant = self.lock_manager.request_lock(request);
        self.publish_lock_events();
        grant
    }

    pub fn request_simple_lock(
        &mut self,
        lock_type: LockType,
        requester_id: &str,
        description: &str,
        priority: LockPriority,
        exclusive: bool,
        max_hold_duration: Duration,
    ) -> LockId {
        if self.refuse_after_shutdown(lock_type, requester_id) {
            return LockId::new();
        }
        let id = self.lock_manager.request_simple_lock(
            lock_type,
            requester_id,
            description,
            priority,
            exclusive,
            max_hold_duration,
        );
        self.publish_lock_events();
        id
    }

    /// After shutdown the returned id is not known to the lock manager
    pub fn request_save_lock(&mut self, requester_id: &str) -> LockId {
        if self.refuse_after_shutdown(LockType::Save, requester_id) {
            return LockId::new();
        }
        let id = self.lock_manager.request_save_lock(requester_id);
        self.publish_lock_events();
        id
    }

    pub fn request_load_lock(&mut self, requester_id: &str) -> LockId {
        if self.refuse_after_shutdown(LockType::Load, requester_id) {
            return LockId::new();
        }
        let id = self.lock_manager.request_load_lock(requester_id);
        self.publish_lock_events();
        id
    }

    pub fn release_lock(&mut self, lock_id: LockId) -> bool {
        let released = self.lock_manager.release_lock(lock_id);
        self.publish_lock_events();
        released
    }

    pub fn release_all_locks(&mut self, requester_id: &str) -> usize {
        let released = self.lock_manager.release_all_locks(requester_id);
        self.publish_lock_events();
        released
    }

    pub fn is_locked(&self, lock_type: LockType) -> bool {
        self.lock_manager.is_locked(lock_type)
    }

    pub fn is_safe_to_save(&self) -> bool {
        self.lock_manager.is_safe_to_save()
    }

    pub fn is_safe_for_ecosystem_update(&self) -> bool {
        self.lock_manager.is_safe_for_ecosystem_update()
    }

    pub fn set_lock_logging(&mut self, enabled: bool) {
        self.lock_manager.set_lock_logging(enabled);
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            world_time_secs: self.lock_manager.world_time().as_secs_f64(),
            active_locks: self.lock_manager.active_locks().len(),
            queued_locks: self.lock_manager.queued_locks().len(),
            locks: self.lock_manager.statistics().clone(),
            events: self.event_bus.stats(),
        }
    }

    /// Lock status followed by bus statistics
    pub fn status_report(&self) -> String {
        format!(
            "{}\n{}",
            self.lock_manager.status_report(),
            self.event_bus.stats_summary()
        )
    }

    // ------------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------------

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Drop every lock and deliver what is still pending
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }

        if !self.lock_manager.active_locks().is_empty()
            || !self.lock_manager.queued_locks().is_empty()
        {
            warn!("Shutting down world coordinator with outstanding locks");
        }

        self.lock_manager.force_release_all_locks();
        self.publish_lock_events();
        self.event_bus.tick(Duration::ZERO);
        self.shut_down = true;

        info!("World coordinator shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::outbound::EventListener;
    use crate::domain::events::{EventType, GlobalEvent};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct WorldStateWatcher {
        seen: Mutex<Vec<GlobalEvent>>,
    }

    impl WorldStateWatcher {
        fn seen(&self) -> Vec<GlobalEvent> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl EventListener for WorldStateWatcher {
        fn on_event(&self, event: &GlobalEvent) {
            self.seen.lock().unwrap().push(event.clone());
        }
    }

    fn coordinator_with_watcher() -> (WorldCoordinator, Arc<WorldStateWatcher>) {
        let mut coordinator = WorldCoordinator::new(CoordinatorSettings::default());
        let watcher = Arc::new(WorldStateWatcher::default());
        coordinator
            .event_bus_mut()
            .register_listener(&watcher, &[EventType::WorldStateChanged]);
        (coordinator, watcher)
    }

    #[test]
    fn test_grant_announced_on_next_tick() {
        let (mut coordinator, watcher) = coordinator_with_watcher();

        coordinator.request_save_lock("persistence");
        assert!(watcher.seen().is_empty());
        assert_eq!(coordinator.event_bus().pending_len(), 1);

        coordinator.tick(Duration::from_millis(16));

        let seen = watcher.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].data("LockType"), Some("Save"));
        assert_eq!(seen[0].data("Locked"), Some("true"));
    }

    #[test]
    fn test_queued_grant_delivered_in_same_tick() {
        let (mut coordinator, watcher) = coordinator_with_watcher();
        let save_id = coordinator.request_save_lock("persistence");
        coordinator.request_simple_lock(
            LockType::EcosystemUpdate,
            "ecosystem",
            "daily growth",
            LockPriority::Normal,
            true,
            Duration::ZERO,
        );
        coordinator.tick(Duration::from_millis(16));

        assert!(coordinator.release_lock(save_id));
        coordinator.tick(Duration::from_millis(16));

        let states: Vec<_> = watcher
            .seen()
            .iter()
            .map(|event| {
                format!(
                    "{}:{}",
                    event.data("LockType").unwrap_or_default(),
                    event.data("Locked").unwrap_or_default()
                )
            })
            .collect();
        assert_eq!(
            states,
            vec!["Save:true", "Save:false", "EcosystemUpdate:true"]
        );
        assert!(coordinator.is_locked(LockType::EcosystemUpdate));
    }

    #[test]
    fn test_expired_lock_notifies_listeners() {
        let (mut coordinator, watcher) = coordinator_with_watcher();
        coordinator.request_simple_lock(
            LockType::FactionUpdate,
            "factions",
            "war declaration",
            LockPriority::Normal,
            true,
            Duration::from_secs(1),
        );
        coordinator.tick(Duration::from_millis(500));
        coordinator.tick(Duration::from_millis(600));

        assert!(!coordinator.is_locked(LockType::FactionUpdate));
        let last = watcher.seen().pop().unwrap();
        assert_eq!(last.data("Reason"), Some("Expired"));
        assert_eq!(last.data("Locked"), Some("false"));
    }

    #[test]
    fn test_safety_checks_follow_locks() {
        let mut coordinator = WorldCoordinator::new(CoordinatorSettings::default());
        assert!(coordinator.is_safe_to_save());

        let load_id = coordinator.request_load_lock("persistence");
        assert!(!coordinator.is_safe_to_save());
        assert!(!coordinator.is_safe_for_ecosystem_update());

        coordinator.release_lock(load_id);
        assert!(coordinator.is_safe_to_save());
        assert!(coordinator.is_safe_for_ecosystem_update());
    }

    #[test]
    fn test_release_all_locks_publishes_each_release() {
        let (mut coordinator, watcher) = coordinator_with_watcher();
        coordinator.request_lock(LockRequest::new(LockType::FactionUpdate, "factions", "a"));
        coordinator.request_lock(LockRequest::new(LockType::QuestUpdate, "factions", "b"));
        coordinator.tick(Duration::ZERO);

        assert_eq!(coordinator.release_all_locks("factions"), 2);
        coordinator.tick(Duration::ZERO);

        let released = watcher
            .seen()
            .iter()
            .filter(|event| event.data("Reason") == Some("RequesterDetached"))
            .count();
        assert_eq!(released, 2);
    }

    #[test]
    fn test_shutdown_clears_locks_and_flushes_events() {
        let (mut coordinator, watcher) = coordinator_with_watcher();
        coordinator.request_save_lock("persistence");
        coordinator.request_lock(LockRequest::new(LockType::EcosystemUpdate, "ecosystem", "tick"));

        coordinator.shutdown();

        assert!(coordinator.is_shut_down());
        assert!(coordinator.lock_manager().active_locks().is_empty());
        assert!(coordinator.lock_manager().queued_locks().is_empty());
        assert_eq!(coordinator.event_bus().pending_len(), 0);
        let last = watcher.seen().pop().unwrap();
        assert_eq!(last.data("ForceCleared"), Some("true"));
        assert_eq!(last.data("QueuedCount"), Some("1"));

        let delivered = watcher.seen().len();
        coordinator.shutdown();
        assert_eq!(watcher.seen().len(), delivered);
    }

    #[test]
    fn test_stats_snapshot() {
        let mut coordinator = WorldCoordinator::new(CoordinatorSettings::default());
        coordinator.request_save_lock("persistence");
        coordinator.request_load_lock("persistence");
        coordinator.tick(Duration::from_secs(2));

        let stats = coordinator.stats();
        assert_eq!(stats.active_locks, 1);
        assert_eq!(stats.queued_locks, 1);
        assert_eq!(stats.locks.total_granted, 1);
        assert_eq!(stats.events.total_events_processed, 1);
        assert!((stats.world_time_secs - 2.0).abs() < f64::EPSILON);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["events"]["event_counts"]["WorldStateChanged"], 1);
    }

    #[test]
    fn test_requests_refused_after_shutdown() {
        let (mut coordinator, watcher) = coordinator_with_watcher();
        coordinator.shutdown();
        let delivered = watcher.seen().len();

        let grant = coordinator
            .request_lock(LockRequest::new(LockType::FactionUpdate, "factions", "late"));
        assert_eq!(grant, LockGrant::Refused);

        let save_id = coordinator.request_save_lock("persistence");
        coordinator.request_load_lock("persistence");
        coordinator.request_simple_lock(
            LockType::Custom,
            "modding",
            "late",
            LockPriority::Low,
            false,
            Duration::ZERO,
        );

        assert!(coordinator.lock_manager().active_locks().is_empty());
        assert!(coordinator.lock_manager().queued_locks().is_empty());
        assert!(!coordinator.release_lock(save_id));
        assert_eq!(coordinator.event_bus().pending_len(), 0);
        assert_eq!(watcher.seen().len(), delivered);
    }

    #[test]
    fn test_status_report_covers_both_components() {
        let mut coordinator = WorldCoordinator::new(CoordinatorSettings::default());
        coordinator.request_save_lock("persistence");

        let report = coordinator.status_report();
        assert!(report.contains("=== World State Lock Status ==="));
        assert!(report.contains("Active Locks: 1"));
        assert!(report.contains("Events in Queue: 1"));
    }
}
