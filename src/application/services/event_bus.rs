//! Event Bus - Priority-ordered publish/subscribe between world subsystems
//!
//! Subsystems publish `GlobalEvent`s without knowing who observes them.
//! Observers come in two flavours:
//! - listeners: `EventListener` objects held by weak reference
//! - delegates: closures keyed by event type
//!
//! For a given event every live listener is invoked before any delegate.
//! Immediate events are dispatched inside `broadcast_event`; deferred events
//! wait for the next `tick`, which delivers them highest priority first.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::application::ports::outbound::EventListener;
use crate::domain::events::{EventPriority, EventType, GlobalEvent};
use crate::domain::value_objects::{CoordinatorSettings, DelegateId};

/// Closure subscriber registered for a single event type
pub type EventDelegate = Arc<dyn Fn(&GlobalEvent) + Send + Sync>;

struct DelegateEntry {
    id: DelegateId,
    callback: EventDelegate,
}

/// Snapshot of the bus statistics
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventBusStats {
    pub queued_events: usize,
    pub history_len: usize,
    pub max_history_size: usize,
    pub total_events_processed: u64,
    pub total_processing_time_secs: f64,
    /// `None` until at least one deferred event was processed
    pub average_processing_time_secs: Option<f64>,
    pub listener_event_types: usize,
    pub delegate_event_types: usize,
    /// Non-zero per-type counters, keyed by type name
    pub event_counts: BTreeMap<String, u64>,
}

/// The global event bus
pub struct EventBus {
    /// Deferred events waiting for the next tick
    pending: Vec<GlobalEvent>,
    history: VecDeque<GlobalEvent>,
    max_history_size: usize,
    listeners: HashMap<EventType, Vec<Weak<dyn EventListener>>>,
    delegates: HashMap<EventType, Vec<DelegateEntry>>,
    event_counts: HashMap<EventType, u64>,
    log_events: bool,
    log_event_processing: bool,
    total_processing_time: Duration,
    total_events_processed: u64,
}

impl EventBus {
    /// Create a bus keeping at most `max_history_size` events of history
    pub fn new(max_history_size: usize) -> Self {
        Self {
            pending: Vec::new(),
            history: VecDeque::new(),
            max_history_size: max_history_size.max(1),
            listeners: HashMap::new(),
            delegates: HashMap::new(),
            event_counts: HashMap::new(),
            log_events: false,
            log_event_processing: false,
            total_processing_time: Duration::ZERO,
            total_events_processed: 0,
        }
    }

    pub fn from_settings(settings: &CoordinatorSettings) -> Self {
        let mut bus = Self::new(settings.max_event_history);
        bus.log_events = settings.log_events;
        bus.log_event_processing = settings.log_event_processing;
        bus
    }

    // ------------------------------------------------------------------------
    // Broadcasting
    // ------------------------------------------------------------------------

    /// Publish an event
    ///
    /// The event is timestamped, counted and recorded in history before it is
    /// either dispatched (immediate) or queued for the next tick.
    pub fn broadcast_event(&mut self, mut event: GlobalEvent) {
        event.timestamp = Utc::now();

        if self.log_events {
            debug!(
                event_type = %event.event_type,
                source = %event.source,
                target = event.target_label(),
                "Broadcasting event"
            );
        }

        self.add_to_history(event.clone());
        *self.event_counts.entry(event.event_type).or_insert(0) += 1;

        if event.immediate {
            self.dispatch(&event);
        } else {
            self.pending.push(event);
        }
    }

    /// Build and publish an event from its parts
    pub fn broadcast_simple_event(
        &mut self,
        event_type: EventType,
        source: &str,
        target: Option<&str>,
        payload: HashMap<String, String>,
        priority: EventPriority,
        immediate: bool,
    ) {
        let mut event = GlobalEvent::new(event_type, source)
            .with_priority(priority)
            .with_payload(payload);
        event.target = target.map(str::to_string);
        event.immediate = immediate;
        self.broadcast_event(event);
    }

    /// Build and publish an event that carries no payload
    pub fn broadcast_simple_event_no_data(
        &mut self,
        event_type: EventType,
        source: &str,
        target: Option<&str>,
        priority: EventPriority,
        immediate: bool,
    ) {
        self.broadcast_simple_event(event_type, source, target, HashMap::new(), priority, immediate);
    }

    /// Deliver every deferred event queued before this call
    ///
    /// Events are delivered highest priority first; events of equal priority
    /// keep their broadcast order.
    pub fn tick(&mut self, _delta: Duration) {
        if self.pending.is_empty() {
            return;
        }

        let mut batch = std::mem::take(&mut self.pending);
        batch.sort_by(|a, b| b.priority.cmp(&a.priority));

        let started = Instant::now();
        for event in &batch {
            self.dispatch(event);
        }
        let elapsed = started.elapsed();

        self.total_processing_time += elapsed;
        self.total_events_processed += batch.len() as u64;

        if self.log_event_processing {
            debug!(
                count = batch.len(),
                elapsed_secs = elapsed.as_secs_f64(),
                "Processed deferred events"
            );
        }
    }

    fn dispatch(&mut self, event: &GlobalEvent) {
        if let Some(entries) = self.listeners.get_mut(&event.event_type) {
            let mut pruned = 0usize;
            entries.retain(|entry| match entry.upgrade() {
                Some(listener) => {
                    listener.on_event(event);
                    true
                }
                None => {
                    pruned += 1;
                    false
                }
            });
            if pruned > 0 {
                debug!(
                    event_type = %event.event_type,
                    pruned,
                    "Pruned dead listeners during dispatch"
                );
            }
        }

        if let Some(delegates) = self.delegates.get(&event.event_type) {
            for delegate in delegates {
                (delegate.callback)(event);
            }
        }

        if self.log_event_processing {
            trace!(event = %event.to_json(), "Processed event");
        }
    }

    // ------------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------------

    /// Register a listener for the given event types
    ///
    /// With an empty `event_types` the listener's own declared types are
    /// used, and if those are empty too it is registered for every type.
    /// Registering again for a type it already has is a no-op.
    pub fn register_listener<L>(&mut self, listener: &Arc<L>, event_types: &[EventType])
    where
        L: EventListener + 'static,
    {
        let weak: Weak<dyn EventListener> = Arc::downgrade(listener) as Weak<L>;
        self.register_weak_listener(weak, event_types);
    }

    /// Register a listener from a weak reference
    ///
    /// A reference that can no longer be upgraded is rejected with a warning.
    pub fn register_weak_listener(
        &mut self,
        listener: Weak<dyn EventListener>,
        event_types: &[EventType],
    ) {
        let Some(strong) = listener.upgrade() else {
            warn!("Attempted to register a listener that is no longer alive");
            return;
        };

        let mut types = event_types.to_vec();
        if types.is_empty() {
            types = strong.listened_event_types();
        }
        if types.is_empty() {
            types = EventType::ALL.to_vec();
        }

        for event_type in &types {
            let entries = self.listeners.entry(*event_type).or_default();
            if !entries.iter().any(|existing| Weak::ptr_eq(existing, &listener)) {
                entries.push(listener.clone());
            }
        }

        info!(
            listener = strong.listener_name(),
            event_types = types.len(),
            "Registered event listener"
        );
    }

    /// Remove a listener from every event type
    pub fn unregister_listener<L>(&mut self, listener: &Arc<L>)
    where
        L: EventListener + 'static,
    {
        let weak: Weak<dyn EventListener> = Arc::downgrade(listener) as Weak<L>;
        self.unregister_weak_listener(&weak);
    }

    /// Remove a listener from every event type, pruning dead entries found
    /// along the way
    pub fn unregister_weak_listener(&mut self, listener: &Weak<dyn EventListener>) {
        let Some(strong) = listener.upgrade() else {
            warn!("Attempted to unregister a listener that is no longer alive");
            return;
        };

        let mut removed = 0usize;
        for entries in self.listeners.values_mut() {
            let before = entries.len();
            entries.retain(|entry| entry.strong_count() > 0 && !Weak::ptr_eq(entry, listener));
            removed += before - entries.len();
        }
        self.listeners.retain(|_, entries| !entries.is_empty());

        info!(
            listener = strong.listener_name(),
            removed,
            "Unregistered event listener"
        );
    }

    /// Number of registrations (live or not yet pruned) for an event type
    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.listeners.get(&event_type).map_or(0, Vec::len)
    }

    // ------------------------------------------------------------------------
    // Delegates
    // ------------------------------------------------------------------------

    /// Register a closure for one event type
    pub fn register_delegate<F>(&mut self, event_type: EventType, callback: F) -> DelegateId
    where
        F: Fn(&GlobalEvent) + Send + Sync + 'static,
    {
        let id = DelegateId::new();
        self.delegates.entry(event_type).or_default().push(DelegateEntry {
            id,
            callback: Arc::new(callback),
        });
        info!(event_type = %event_type, delegate_id = %id, "Registered event delegate");
        id
    }

    /// Remove a previously registered closure. Returns false if it was not
    /// registered for that type.
    pub fn unregister_delegate(&mut self, event_type: EventType, id: DelegateId) -> bool {
        let Some(delegates) = self.delegates.get_mut(&event_type) else {
            return false;
        };
        let before = delegates.len();
        delegates.retain(|delegate| delegate.id != id);
        let removed = delegates.len() != before;
        if delegates.is_empty() {
            self.delegates.remove(&event_type);
        }
        if removed {
            info!(event_type = %event_type, delegate_id = %id, "Unregistered event delegate");
        }
        removed
    }

    // ------------------------------------------------------------------------
    // History and analytics
    // ------------------------------------------------------------------------

    fn add_to_history(&mut self, event: GlobalEvent) {
        self.history.push_back(event);
        self.trim_history();
    }

    fn trim_history(&mut self) {
        while self.history.len() > self.max_history_size {
            self.history.pop_front();
        }
    }

    /// Up to `max_count` events of exactly `event_type`, newest first
    pub fn recent_events(&self, event_type: EventType, max_count: usize) -> Vec<GlobalEvent> {
        self.history
            .iter()
            .rev()
            .filter(|event| event.event_type == event_type)
            .take(max_count)
            .cloned()
            .collect()
    }

    /// The last `max_count` events of any type, oldest first
    pub fn all_recent_events(&self, max_count: usize) -> Vec<GlobalEvent> {
        let start = self.history.len().saturating_sub(max_count);
        self.history.iter().skip(start).cloned().collect()
    }

    /// Number of events of `event_type` broadcast since the last clear
    pub fn event_count(&self, event_type: EventType) -> u64 {
        self.event_counts.get(&event_type).copied().unwrap_or(0)
    }

    /// Drop history and reset every counter
    pub fn clear_event_history(&mut self) {
        self.history.clear();
        self.event_counts.clear();
        info!("Event history cleared");
    }

    /// Human-readable listing of recent events
    ///
    /// `EventType::Custom` lists every type instead of filtering on Custom.
    pub fn recent_events_report(&self, event_type: EventType, count: usize) -> String {
        let events = if event_type == EventType::Custom {
            self.all_recent_events(count)
        } else {
            self.recent_events(event_type, count)
        };

        let mut report = format!("=== Recent Events ({}) ===\n", events.len());
        for event in &events {
            report.push_str(&format!(
                "[{}] {}: {} -> {} (Priority: {})\n",
                event.timestamp.format("%H:%M:%S%.3f"),
                event.event_type,
                event.source,
                event.target_label(),
                event.priority
            ));
            let mut payload: Vec<_> = event.payload.iter().collect();
            payload.sort();
            for (key, value) in payload {
                report.push_str(&format!("  {}: {}\n", key, value));
            }
        }
        report.push_str("=== End Recent Events ===");
        report
    }

    pub fn stats(&self) -> EventBusStats {
        let average = (self.total_events_processed > 0).then(|| {
            self.total_processing_time.as_secs_f64() / self.total_events_processed as f64
        });

        EventBusStats {
            queued_events: self.pending.len(),
            history_len: self.history.len(),
            max_history_size: self.max_history_size,
            total_events_processed: self.total_events_processed,
            total_processing_time_secs: self.total_processing_time.as_secs_f64(),
            average_processing_time_secs: average,
            listener_event_types: self.listeners.len(),
            delegate_event_types: self.delegates.len(),
            event_counts: self
                .event_counts
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(event_type, count)| (event_type.to_string(), *count))
                .collect(),
        }
    }

    /// Human-readable statistics summary
    pub fn stats_summary(&self) -> String {
        let stats = self.stats();
        let mut summary = String::from("=== Global Event Bus Statistics ===\n");
        summary.push_str(&format!("Events in Queue: {}\n", stats.queued_events));
        summary.push_str(&format!(
            "Events in History: {} / {}\n",
            stats.history_len, stats.max_history_size
        ));
        summary.push_str(&format!(
            "Total Events Processed: {}\n",
            stats.total_events_processed
        ));
        summary.push_str(&format!(
            "Total Processing Time: {:.4} seconds\n",
            stats.total_processing_time_secs
        ));
        if let Some(average) = stats.average_processing_time_secs {
            summary.push_str(&format!(
                "Average Processing Time: {:.6} seconds per event\n",
                average
            ));
        }
        summary.push_str(&format!(
            "Registered Listeners: {} event types\n",
            stats.listener_event_types
        ));
        summary.push_str(&format!(
            "Registered Delegates: {} event types\n",
            stats.delegate_event_types
        ));
        summary.push_str("\n=== Event Counts by Type ===\n");
        for (event_type, count) in &stats.event_counts {
            summary.push_str(&format!("{}: {}\n", event_type, count));
        }
        summary
    }

    // ------------------------------------------------------------------------
    // Accessors and debug toggles
    // ------------------------------------------------------------------------

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    /// Change the history bound, trimming the oldest entries if needed
    pub fn set_max_history_size(&mut self, max_history_size: usize) {
        self.max_history_size = max_history_size.max(1);
        self.trim_history();
    }

    pub fn set_event_logging(&mut self, enabled: bool) {
        self.log_events = enabled;
        info!(enabled, "Event logging toggled");
    }

    pub fn set_processing_logging(&mut self, enabled: bool) {
        self.log_event_processing = enabled;
        info!(enabled, "Event processing logging toggled");
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::from_settings(&CoordinatorSettings::default())
    }
}
