//! Domain entities - Core business objects with identity

mod lock_request;

pub use lock_request::{ActiveLock, LockRequest};
