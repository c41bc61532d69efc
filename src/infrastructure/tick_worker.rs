//! Background workers driving the world coordinator
//!
//! Both workers take the coordinator mutex for the duration of one step, so
//! a tick never interleaves with a lock request from another task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};

use crate::application::services::WorldCoordinator;

/// Worker that advances the coordinator at a fixed period
///
/// The delta handed to `tick` is the wall time elapsed since the previous
/// step. The worker exits once the coordinator has been shut down.
pub async fn tick_worker(coordinator: Arc<Mutex<WorldCoordinator>>, tick_interval: Duration) {
    tracing::info!(interval_ms = tick_interval.as_millis() as u64, "Starting world tick worker");

    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();

    loop {
        interval.tick().await;
        let now = Instant::now();
        let delta = now.duration_since(last_tick);
        last_tick = now;

        let mut world = coordinator.lock().await;
        if world.is_shut_down() {
            break;
        }
        world.tick(delta);
    }

    tracing::info!("World tick worker stopped");
}

/// Worker that logs a JSON statistics snapshot at a fixed period
pub async fn stats_worker(coordinator: Arc<Mutex<WorldCoordinator>>, stats_interval: Duration) {
    tracing::info!("Starting stats worker");

    let mut interval = tokio::time::interval(stats_interval);
    // the first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;

        let stats = {
            let world = coordinator.lock().await;
            if world.is_shut_down() {
                break;
            }
            world.stats()
        };

        match serde_json::to_string(&stats) {
            Ok(json) => tracing::info!(stats = %json, "World coordinator stats"),
            Err(e) => tracing::error!("Failed to serialize coordinator stats: {}", e),
        }
    }

    tracing::info!("Stats worker stopped");
}
