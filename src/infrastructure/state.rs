//! Shared application state

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::application::services::WorldCoordinator;
use crate::infrastructure::config::AppConfig;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    /// The one critical section guarding the lock table, queue and bus
    pub coordinator: Arc<Mutex<WorldCoordinator>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let coordinator = WorldCoordinator::new(config.settings.clone());
        Self {
            config,
            coordinator: Arc::new(Mutex::new(coordinator)),
        }
    }

    /// Shut the coordinator down, releasing every lock
    pub async fn shutdown(&self) {
        self.coordinator.lock().await.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_builds_coordinator_from_config() {
        let mut config = AppConfig::default();
        config.settings.max_event_history = 7;

        let state = AppState::new(config);

        let coordinator = state.coordinator.lock().await;
        assert_eq!(coordinator.event_bus().max_history_size(), 7);
        assert!(!coordinator.is_shut_down());
    }

    #[tokio::test]
    async fn test_shutdown_releases_locks() {
        let state = AppState::new(AppConfig::default());
        state.coordinator.lock().await.request_save_lock("persistence");

        state.shutdown().await;

        let coordinator = state.coordinator.lock().await;
        assert!(coordinator.is_shut_down());
        assert!(coordinator.is_safe_to_save());
    }
}
