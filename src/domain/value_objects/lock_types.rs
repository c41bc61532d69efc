//! Lock categories, priorities and the conflict matrix between them

use serde::{Deserialize, Serialize};

/// Category of shared world state a lock protects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LockType {
    Save,
    Load,
    EcosystemUpdate,
    FactionUpdate,
    QuestUpdate,
    /// Catch-all for subsystems that need a lock outside the built-in categories
    Custom,
}

impl LockType {
    /// Every lock type, in declaration order
    pub const ALL: [LockType; 6] = [
        LockType::Save,
        LockType::Load,
        LockType::EcosystemUpdate,
        LockType::FactionUpdate,
        LockType::QuestUpdate,
        LockType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LockType::Save => "Save",
            LockType::Load => "Load",
            LockType::EcosystemUpdate => "EcosystemUpdate",
            LockType::FactionUpdate => "FactionUpdate",
            LockType::QuestUpdate => "QuestUpdate",
            LockType::Custom => "Custom",
        }
    }

    /// Whether a request for `self` conflicts with an active lock of type `active`.
    ///
    /// The table is intentionally asymmetric: a requested Save or
    /// EcosystemUpdate only looks at its own row. Note that EcosystemUpdate is
    /// not declared to conflict with FactionUpdate or QuestUpdate even though
    /// all three touch region data; callers rely on the current scheduling.
    pub fn conflicts_with(&self, active: LockType) -> bool {
        match self {
            LockType::Save => matches!(
                active,
                LockType::EcosystemUpdate | LockType::Load | LockType::Save
            ),
            LockType::Load => true,
            LockType::EcosystemUpdate => matches!(active, LockType::Save | LockType::Load),
            LockType::FactionUpdate | LockType::QuestUpdate | LockType::Custom => *self == active,
        }
    }
}

impl std::fmt::Display for LockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling priority of a lock request. Higher values are granted first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum LockPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl LockPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockPriority::Low => "Low",
            LockPriority::Normal => "Normal",
            LockPriority::High => "High",
            LockPriority::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for LockPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
