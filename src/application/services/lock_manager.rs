//! Lock Manager - Advisory locks over categories of shared world state
//!
//! Subsystems ask for a lock before mutating shared state (saving, loading,
//! running an ecosystem tick, updating factions or quests). A request is
//! either granted on the spot or queued; it is never rejected. Queued
//! requests are retried on every `tick`, highest priority first, and active
//! locks that outlive their hold limit are released on `tick` as well.
//!
//! Locks are advisory: nothing stops a subsystem from touching state without
//! one. The manager only arbitrates between subsystems that ask.
//!
//! Time is the manager's own world clock, advanced by the `delta` passed to
//! `tick`. Request and grant timestamps are read from that clock.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::domain::entities::{ActiveLock, LockRequest};
use crate::domain::events::{LockEvent, ReleaseReason};
use crate::domain::value_objects::{CoordinatorSettings, LockId, LockPriority, LockType};

/// Outcome of submitting a lock request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockGrant {
    Granted,
    Queued,
    /// The coordinator has shut down and accepts no more requests
    Refused,
}

impl LockGrant {
    pub fn is_granted(&self) -> bool {
        matches!(self, LockGrant::Granted)
    }
}

/// Running lock statistics
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LockStatistics {
    pub total_granted: u64,
    pub total_released: u64,
    pub total_expired: u64,
    /// Sum of hold times of every lock that left the table
    pub total_hold_time: Duration,
}

/// The world-state lock manager
pub struct LockManager {
    active_locks: BTreeMap<LockType, ActiveLock>,
    /// Sorted by priority descending, then request time ascending
    queue: Vec<LockRequest>,
    world_time: Duration,
    notifications: Option<UnboundedSender<LockEvent>>,
    log_lock_operations: bool,
    default_lock_hold: Duration,
    save_lock_hold: Duration,
    load_lock_hold: Duration,
    statistics: LockStatistics,
}

impl LockManager {
    pub fn new(settings: &CoordinatorSettings) -> Self {
        Self {
            active_locks: BTreeMap::new(),
            queue: Vec::new(),
            world_time: Duration::ZERO,
            notifications: None,
            log_lock_operations: settings.log_lock_operations,
            default_lock_hold: settings.default_lock_hold(),
            save_lock_hold: settings.save_lock_hold(),
            load_lock_hold: settings.load_lock_hold(),
            statistics: LockStatistics::default(),
        }
    }

    /// Send lock table transitions to `sender`
    pub fn with_notifications(mut self, sender: UnboundedSender<LockEvent>) -> Self {
        self.notifications = Some(sender);
        self
    }

    fn notify(&self, event: LockEvent) {
        if let Some(sender) = &self.notifications {
            if sender.send(event).is_err() {
                debug!("Lock notification receiver dropped");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    /// Submit a lock request
    ///
    /// The request is stamped with the current world time, then granted if
    /// nothing active conflicts with it, otherwise inserted into the queue.
    pub fn request_lock(&mut self, mut request: LockRequest) -> LockGrant {
        request.requested_at = self.world_time;

        if self.log_lock_operations {
            info!(
                lock_type = %request.lock_type,
                requester = %request.requester_id,
                description = %request.description,
                "Lock requested"
            );
        }

        if self.can_grant(&request) {
            self.grant(request.clone());
            self.notify(LockEvent::Requested {
                request,
                granted: true,
                reason: "Lock granted immediately".to_string(),
            });
            LockGrant::Granted
        } else {
            if self.log_lock_operations {
                info!(lock_id = %request.id, lock_type = %request.lock_type, "Lock queued");
            }
            self.queue.push(request.clone());
            self.sort_queue();
            self.notify(LockEvent::Requested {
                request,
                granted: false,
                reason: "Lock queued".to_string(),
            });
            LockGrant::Queued
        }
    }

    /// Build and submit a request, returning its id whether it was granted
    /// or queued so the caller can track it
    pub fn request_simple_lock(
        &mut self,
        lock_type: LockType,
        requester_id: &str,
        description: &str,
        priority: LockPriority,
        exclusive: bool,
        max_hold_duration: Duration,
    ) -> LockId {
        let request = LockRequest::new(lock_type, requester_id, description)
            .with_priority(priority)
            .with_exclusive(exclusive)
            .with_max_hold(max_hold_duration);
        let id = request.id;
        self.request_lock(request);
        id
    }

    /// Request a lock with normal priority, exclusive, and the configured
    /// default hold limit
    pub fn request_default_lock(
        &mut self,
        lock_type: LockType,
        requester_id: &str,
        description: &str,
    ) -> LockId {
        self.request_simple_lock(
            lock_type,
            requester_id,
            description,
            LockPriority::Normal,
            true,
            self.default_lock_hold,
        )
    }

    /// High priority exclusive Save lock
    pub fn request_save_lock(&mut self, requester_id: &str) -> LockId {
        self.request_simple_lock(
            LockType::Save,
            requester_id,
            "Save operation",
            LockPriority::High,
            true,
            self.save_lock_hold,
        )
    }

    /// Critical priority exclusive Load lock
    pub fn request_load_lock(&mut self, requester_id: &str) -> LockId {
        self.request_simple_lock(
            LockType::Load,
            requester_id,
            "Load operation",
            LockPriority::Critical,
            true,
            self.load_lock_hold,
        )
    }

    // ------------------------------------------------------------------------
    // Releases
    // ------------------------------------------------------------------------

    /// Release an active or queued lock
    ///
    /// Returns false, and changes nothing, if the id is unknown.
    pub fn release_lock(&mut self, lock_id: LockId) -> bool {
        let active_type = self
            .active_locks
            .values()
            .find(|lock| lock.id() == lock_id)
            .map(|lock| lock.request.lock_type);
        if let Some(lock_type) = active_type {
            self.release_active(lock_type, ReleaseReason::Explicit);
            return true;
        }

        if let Some(position) = self.queue.iter().position(|request| request.id == lock_id) {
            let removed = self.queue.remove(position);
            if self.log_lock_operations {
                info!(
                    lock_type = %removed.lock_type,
                    requester = %removed.requester_id,
                    "Queued lock removed"
                );
            }
            return true;
        }

        warn!(lock_id = %lock_id, "Attempted to release unknown lock");
        false
    }

    /// Release every active and queued lock owned by `requester_id`
    pub fn release_all_locks(&mut self, requester_id: &str) -> usize {
        let owned: Vec<LockType> = self
            .active_locks
            .values()
            .filter(|lock| lock.request.requester_id == requester_id)
            .map(|lock| lock.request.lock_type)
            .collect();

        let mut released = 0;
        for lock_type in owned {
            if self
                .release_active(lock_type, ReleaseReason::RequesterDetached)
                .is_some()
            {
                released += 1;
            }
        }

        let queued_before = self.queue.len();
        self.queue.retain(|request| request.requester_id != requester_id);
        released += queued_before - self.queue.len();

        if self.log_lock_operations && released > 0 {
            info!(requester = %requester_id, released, "Released all locks for requester");
        }

        released
    }

    /// Drop every active and queued lock. Reserved for teardown.
    pub fn force_release_all_locks(&mut self) {
        let released: Vec<LockRequest> = std::mem::take(&mut self.active_locks)
            .into_values()
            .map(|lock| {
                self.statistics.total_released += 1;
                self.statistics.total_hold_time += lock.held_for(self.world_time);
                lock.request
            })
            .collect();
        let dropped_queued = self.queue.len();
        self.queue.clear();

        warn!(
            active = released.len(),
            queued = dropped_queued,
            "Force released all world locks"
        );

        self.notify(LockEvent::ForceCleared {
            released,
            dropped_queued,
        });
    }

    fn release_active(&mut self, lock_type: LockType, reason: ReleaseReason) -> Option<LockRequest> {
        let lock = self.active_locks.remove(&lock_type)?;

        self.statistics.total_released += 1;
        self.statistics.total_hold_time += lock.held_for(self.world_time);
        if reason == ReleaseReason::Expired {
            self.statistics.total_expired += 1;
        }

        if self.log_lock_operations {
            info!(
                lock_type = %lock_type,
                requester = %lock.request.requester_id,
                reason = reason.as_str(),
                "Lock released"
            );
        }

        self.notify(LockEvent::Released {
            lock: lock.request.clone(),
            reason,
        });
        Some(lock.request)
    }

    // ------------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------------

    /// Advance the world clock, grant what the queue now allows, then expire
    /// locks held past their limit
    pub fn tick(&mut self, delta: Duration) {
        self.world_time += delta;
        self.process_lock_queue();
        self.check_for_expired_locks();
    }

    fn process_lock_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let pending = std::mem::take(&mut self.queue);
        for request in pending {
            if self.can_grant(&request) {
                if self.log_lock_operations {
                    info!(
                        lock_type = %request.lock_type,
                        requester = %request.requester_id,
                        "Queued lock granted"
                    );
                }
                self.grant(request);
            } else {
                self.queue.push(request);
            }
        }
    }

    fn check_for_expired_locks(&mut self) {
        let now = self.world_time;
        let expired: Vec<LockType> = self
            .active_locks
            .values()
            .filter(|lock| lock.is_expired(now))
            .map(|lock| {
                warn!(
                    lock_type = %lock.request.lock_type,
                    requester = %lock.request.requester_id,
                    held_secs = lock.held_for(now).as_secs_f64(),
                    "Lock expired"
                );
                lock.request.lock_type
            })
            .collect();

        for lock_type in expired {
            self.release_active(lock_type, ReleaseReason::Expired);
        }
    }

    fn can_grant(&self, request: &LockRequest) -> bool {
        if self.active_locks.contains_key(&request.lock_type) {
            return false;
        }
        !self
            .active_locks
            .values()
            .any(|active| Self::conflicts(request, &active.request))
    }

    /// An active Load holds off every other request. Otherwise only
    /// exclusive requests consult the conflict matrix.
    fn conflicts(request: &LockRequest, active: &LockRequest) -> bool {
        if active.lock_type == LockType::Load {
            return true;
        }
        request.exclusive && request.lock_type.conflicts_with(active.lock_type)
    }

    fn grant(&mut self, request: LockRequest) {
        self.statistics.total_granted += 1;

        if self.log_lock_operations {
            info!(
                lock_type = %request.lock_type,
                requester = %request.requester_id,
                lock_id = %request.id,
                "Lock granted"
            );
        }

        self.notify(LockEvent::Granted {
            lock: request.clone(),
        });
        self.active_locks
            .insert(request.lock_type, ActiveLock::new(request, self.world_time));
    }

    fn sort_queue(&mut self) {
        self.queue.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.requested_at.cmp(&b.requested_at))
        });
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn is_locked(&self, lock_type: LockType) -> bool {
        self.active_locks.contains_key(&lock_type)
    }

    pub fn is_any_exclusive_lock_active(&self) -> bool {
        self.active_locks.values().any(|lock| lock.request.exclusive)
    }

    /// Requester currently holding `lock_type`
    pub fn lock_holder(&self, lock_type: LockType) -> Option<&str> {
        self.active_locks
            .get(&lock_type)
            .map(|lock| lock.request.requester_id.as_str())
    }

    /// No ecosystem update, load or save in progress
    pub fn is_safe_to_save(&self) -> bool {
        !self.is_locked(LockType::EcosystemUpdate)
            && !self.is_locked(LockType::Load)
            && !self.is_locked(LockType::Save)
    }

    /// No save or load in progress
    pub fn is_safe_for_ecosystem_update(&self) -> bool {
        !self.is_locked(LockType::Save) && !self.is_locked(LockType::Load)
    }

    pub fn active_locks(&self) -> Vec<ActiveLock> {
        self.active_locks.values().cloned().collect()
    }

    pub fn queued_locks(&self) -> &[LockRequest] {
        &self.queue
    }

    pub fn world_time(&self) -> Duration {
        self.world_time
    }

    pub fn statistics(&self) -> &LockStatistics {
        &self.statistics
    }

    pub fn set_lock_logging(&mut self, enabled: bool) {
        self.log_lock_operations = enabled;
        info!(enabled, "Lock logging toggled");
    }

    /// Human-readable dump of active and queued locks
    pub fn status_report(&self) -> String {
        let mut report = String::from("=== World State Lock Status ===\n");
        report.push_str(&format!("Active Locks: {}\n", self.active_locks.len()));
        for lock in self.active_locks.values() {
            report.push_str(&format!(
                "  {}: {} ({}) - Duration: {:.2}s\n",
                lock.request.lock_type,
                lock.request.requester_id,
                lock.request.description,
                lock.held_for(self.world_time).as_secs_f64()
            ));
        }

        report.push_str(&format!("Queued Locks: {}\n", self.queue.len()));
        for request in &self.queue {
            report.push_str(&format!(
                "  {}: {} ({}) - Priority: {}\n",
                request.lock_type, request.requester_id, request.description, request.priority
            ));
        }

        report.push_str("Statistics:\n");
        report.push_str(&format!(
            "  Total Locks Granted: {}\n",
            self.statistics.total_granted
        ));
        report.push_str(&format!(
            "  Total Locks Released: {}\n",
            self.statistics.total_released
        ));
        report.push_str(&format!(
            "  Total Locks Expired: {}\n",
            self.statistics.total_expired
        ));
        report.push_str(&format!(
            "  Total Lock Time: {:.2} seconds\n",
            self.statistics.total_hold_time.as_secs_f64()
        ));
        report.push_str("=== End Lock Status ===");
        report
    }
}
