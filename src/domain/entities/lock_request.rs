//! Lock request entity - A subsystem's claim on a category of world state

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{LockId, LockPriority, LockType};

/// A request for an advisory world-state lock
///
/// Built by the requesting subsystem; `requested_at` is stamped by the lock
/// manager from its world clock when the request is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockRequest {
    pub id: LockId,
    pub lock_type: LockType,
    pub priority: LockPriority,
    /// Identifier of the subsystem asking for the lock
    pub requester_id: String,
    /// What the lock is for, used in logs only
    pub description: String,
    /// World-clock time at which the request was submitted
    pub requested_at: Duration,
    /// Longest time the lock may be held once granted (zero = indefinite)
    pub max_hold_duration: Duration,
    /// Non-exclusive requests bypass the conflict matrix
    pub exclusive: bool,
}

impl LockRequest {
    pub fn new(
        lock_type: LockType,
        requester_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: LockId::new(),
            lock_type,
            priority: LockPriority::Normal,
            requester_id: requester_id.into(),
            description: description.into(),
            requested_at: Duration::ZERO,
            max_hold_duration: Duration::ZERO,
            exclusive: true,
        }
    }

    pub fn with_priority(mut self, priority: LockPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_hold(mut self, max_hold_duration: Duration) -> Self {
        self.max_hold_duration = max_hold_duration;
        self
    }

    pub fn with_exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Whether this lock is allowed to expire
    pub fn has_hold_limit(&self) -> bool {
        !self.max_hold_duration.is_zero()
    }
}

/// A granted lock request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveLock {
    pub request: LockRequest,
    /// World-clock time at which the lock was granted
    pub granted_at: Duration,
}

impl ActiveLock {
    pub fn new(request: LockRequest, granted_at: Duration) -> Self {
        Self { request, granted_at }
    }

    pub fn id(&self) -> LockId {
        self.request.id
    }

    /// How long the lock has been held at world time `now`
    pub fn held_for(&self, now: Duration) -> Duration {
        now.saturating_sub(self.granted_at)
    }

    /// Whether the hold limit has been exceeded at world time `now`
    pub fn is_expired(&self, now: Duration) -> bool {
        self.request.has_hold_limit() && self.held_for(now) > self.request.max_hold_duration
    }
}
