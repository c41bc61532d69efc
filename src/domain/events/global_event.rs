//! Global events - Notifications broadcast across world subsystems
//!
//! Events are announcements of things that already happened (a season
//! changed, a save finished, a faction declared war). Publishers never hold
//! references to the subsystems that observe them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::EventId;

/// All event types known to the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    // ========================================================================
    // Player Events
    // ========================================================================
    PlayerCommittedCrime,
    PlayerCompletedQuest,
    PlayerEnteredRegion,
    PlayerLeftRegion,
    PlayerDied,
    PlayerLevelUp,

    // ========================================================================
    // Faction Events
    // ========================================================================
    FactionWarDeclared,
    FactionAllianceFormed,
    FactionPeaceNegotiated,
    FactionReputationChanged,
    FactionLeadershipChanged,

    // ========================================================================
    // World Events
    // ========================================================================
    WorldStateChanged,
    WorldSaveRequested,
    WorldSaveCompleted,
    WorldLoadRequested,
    WorldLoadCompleted,

    // ========================================================================
    // Ecosystem Events
    // ========================================================================
    SeasonChanged,
    WeatherChanged,
    ResourceDepleted,
    ResourceDiscovered,
    AnimalPopulationChanged,
    EnvironmentalEventTriggered,

    // ========================================================================
    // NPC Events
    // ========================================================================
    NpcRoutineChanged,
    NpcMoraleChanged,
    NpcMemoryAdded,
    NpcDied,
    NpcSpawned,

    // ========================================================================
    // Combat Events
    // ========================================================================
    CombatStarted,
    CombatEnded,
    DragonSighted,

    // ========================================================================
    // Economy Events
    // ========================================================================
    TradeCompleted,
    MarketPriceChanged,

    // ========================================================================
    // Quest Events
    // ========================================================================
    QuestStarted,
    QuestCompleted,
    QuestFailed,

    /// Catch-all for extension events. Query helpers that take an event type
    /// as a filter treat `Custom` as "every type".
    Custom,
}

impl EventType {
    /// Every event type, in declaration order
    pub const ALL: [EventType; 36] = [
        EventType::PlayerCommittedCrime,
        EventType::PlayerCompletedQuest,
        EventType::PlayerEnteredRegion,
        EventType::PlayerLeftRegion,
        EventType::PlayerDied,
        EventType::PlayerLevelUp,
        EventType::FactionWarDeclared,
        EventType::FactionAllianceFormed,
        EventType::FactionPeaceNegotiated,
        EventType::FactionReputationChanged,
        EventType::FactionLeadershipChanged,
        EventType::WorldStateChanged,
        EventType::WorldSaveRequested,
        EventType::WorldSaveCompleted,
        EventType::WorldLoadRequested,
        EventType::WorldLoadCompleted,
        EventType::SeasonChanged,
        EventType::WeatherChanged,
        EventType::ResourceDepleted,
        EventType::ResourceDiscovered,
        EventType::AnimalPopulationChanged,
        EventType::EnvironmentalEventTriggered,
        EventType::NpcRoutineChanged,
        EventType::NpcMoraleChanged,
        EventType::NpcMemoryAdded,
        EventType::NpcDied,
        EventType::NpcSpawned,
        EventType::CombatStarted,
        EventType::CombatEnded,
        EventType::DragonSighted,
        EventType::TradeCompleted,
        EventType::MarketPriceChanged,
        EventType::QuestStarted,
        EventType::QuestCompleted,
        EventType::QuestFailed,
        EventType::Custom,
    ];

    /// Get the event type name
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PlayerCommittedCrime => "PlayerCommittedCrime",
            EventType::PlayerCompletedQuest => "PlayerCompletedQuest",
            EventType::PlayerEnteredRegion => "PlayerEnteredRegion",
            EventType::PlayerLeftRegion => "PlayerLeftRegion",
            EventType::PlayerDied => "PlayerDied",
            EventType::PlayerLevelUp => "PlayerLevelUp",
            EventType::FactionWarDeclared => "FactionWarDeclared",
            EventType::FactionAllianceFormed => "FactionAllianceFormed",
            EventType::FactionPeaceNegotiated => "FactionPeaceNegotiated",
            EventType::FactionReputationChanged => "FactionReputationChanged",
            EventType::FactionLeadershipChanged => "FactionLeadershipChanged",
            EventType::WorldStateChanged => "WorldStateChanged",
            EventType::WorldSaveRequested => "WorldSaveRequested",
            EventType::WorldSaveCompleted => "WorldSaveCompleted",
            EventType::WorldLoadRequested => "WorldLoadRequested",
            EventType::WorldLoadCompleted => "WorldLoadCompleted",
            EventType::SeasonChanged => "SeasonChanged",
            EventType::WeatherChanged => "WeatherChanged",
            EventType::ResourceDepleted => "ResourceDepleted",
            EventType::ResourceDiscovered => "ResourceDiscovered",
            EventType::AnimalPopulationChanged => "AnimalPopulationChanged",
            EventType::EnvironmentalEventTriggered => "EnvironmentalEventTriggered",
            EventType::NpcRoutineChanged => "NpcRoutineChanged",
            EventType::NpcMoraleChanged => "NpcMoraleChanged",
            EventType::NpcMemoryAdded => "NpcMemoryAdded",
            EventType::NpcDied => "NpcDied",
            EventType::NpcSpawned => "NpcSpawned",
            EventType::CombatStarted => "CombatStarted",
            EventType::CombatEnded => "CombatEnded",
            EventType::DragonSighted => "DragonSighted",
            EventType::TradeCompleted => "TradeCompleted",
            EventType::MarketPriceChanged => "MarketPriceChanged",
            EventType::QuestStarted => "QuestStarted",
            EventType::QuestCompleted => "QuestCompleted",
            EventType::QuestFailed => "QuestFailed",
            EventType::Custom => "Custom",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing priority of a deferred event
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EventPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl EventPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventPriority::Low => "Low",
            EventPriority::Normal => "Normal",
            EventPriority::High => "High",
            EventPriority::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for EventPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event travelling through the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalEvent {
    pub id: EventId,
    pub event_type: EventType,
    pub priority: EventPriority,
    /// Set by the bus when the event is broadcast
    pub timestamp: DateTime<Utc>,
    pub source: String,
    /// `None` means the event is addressed to every listener
    pub target: Option<String>,
    pub payload: HashMap<String, String>,
    /// Dispatch synchronously at broadcast time instead of on the next tick
    pub immediate: bool,
}

impl GlobalEvent {
    pub fn new(event_type: EventType, source: impl Into<String>) -> Self {
        Self {
            id: EventId::new(),
            event_type,
            priority: EventPriority::Normal,
            timestamp: Utc::now(),
            source: source.into(),
            target: None,
            payload: HashMap::new(),
            immediate: false,
        }
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn with_payload(mut self, payload: HashMap<String, String>) -> Self {
        self.payload = payload;
        self
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    pub fn data(&self, key: &str) -> Option<&str> {
        self.payload.get(key).map(String::as_str)
    }

    /// Target for display, "ALL" when the event is not addressed
    pub fn target_label(&self) -> &str {
        self.target.as_deref().unwrap_or("ALL")
    }

    /// Convert to a JSON value for logging and replay tooling
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id.to_string(),
            "type": self.event_type.as_str(),
            "priority": self.priority.as_str(),
            "timestamp": self.timestamp.to_rfc3339(),
            "source": &self.source,
            "target": &self.target,
            "payload": &self.payload,
            "immediate": self.immediate,
        })
    }
}
