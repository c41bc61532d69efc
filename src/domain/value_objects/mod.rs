//! Value objects - Immutable objects defined by their attributes

mod ids;
mod lock_types;
mod settings;

pub use ids::*;
pub use lock_types::{LockPriority, LockType};
pub use settings::CoordinatorSettings;
