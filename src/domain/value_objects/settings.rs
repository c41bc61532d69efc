//! Coordinator settings value object
//!
//! Settings are plain data with serde derives so the host can log the
//! effective configuration as JSON at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the lock manager and event bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoordinatorSettings {
    // Event bus
    pub max_event_history: usize,
    pub log_events: bool,
    pub log_event_processing: bool,

    // Lock manager
    pub log_lock_operations: bool,
    pub default_lock_hold_secs: u64,
    pub save_lock_hold_secs: u64,
    pub load_lock_hold_secs: u64,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            max_event_history: 1000,
            log_events: true,
            log_event_processing: false,
            log_lock_operations: true,
            default_lock_hold_secs: 30,
            save_lock_hold_secs: 60,
            load_lock_hold_secs: 120,
        }
    }
}

impl CoordinatorSettings {
    pub fn default_lock_hold(&self) -> Duration {
        Duration::from_secs(self.default_lock_hold_secs)
    }

    pub fn save_lock_hold(&self) -> Duration {
        Duration::from_secs(self.save_lock_hold_secs)
    }

    pub fn load_lock_hold(&self) -> Duration {
        Duration::from_secs(self.load_lock_hold_secs)
    }
}
