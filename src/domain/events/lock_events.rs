//! Lock events - Transitions of the world-state lock table
//!
//! The lock manager emits these on a channel. They are mapped onto
//! `WorldStateChanged` global events by the lock event publisher.

use serde::{Deserialize, Serialize};

use crate::domain::entities::LockRequest;

/// Why an active lock left the lock table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseReason {
    /// The holder released it
    Explicit,
    /// The hold limit was exceeded
    Expired,
    /// Every lock of a requester was dropped at once
    RequesterDetached,
}

impl ReleaseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseReason::Explicit => "Explicit",
            ReleaseReason::Expired => "Expired",
            ReleaseReason::RequesterDetached => "RequesterDetached",
        }
    }
}

/// A lock table transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LockEvent {
    /// A request was submitted and either granted right away or queued
    Requested {
        request: LockRequest,
        granted: bool,
        reason: String,
    },

    /// A lock became active
    Granted { lock: LockRequest },

    /// An active lock was released
    Released {
        lock: LockRequest,
        reason: ReleaseReason,
    },

    /// The whole table and queue were cleared
    ForceCleared {
        released: Vec<LockRequest>,
        dropped_queued: usize,
    },
}

impl LockEvent {
    /// Get the event name
    pub fn name(&self) -> &'static str {
        match self {
            LockEvent::Requested { .. } => "Requested",
            LockEvent::Granted { .. } => "Granted",
            LockEvent::Released { .. } => "Released",
            LockEvent::ForceCleared { .. } => "ForceCleared",
        }
    }
}
