//! Domain layer - Core coordination types with no runtime dependencies
//!
//! This layer contains:
//! - Entities: lock requests and active locks
//! - Value Objects: identifiers, lock categories, coordinator settings
//! - Domain Events: global bus events and lock table transitions

pub mod entities;
pub mod events;
pub mod value_objects;
