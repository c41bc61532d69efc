//! Event listener port - Interface implemented by subsystems that observe the bus
//!
//! The bus only ever holds weak references to listeners. A subsystem keeps
//! its own `Arc` alive for as long as it wants to receive events; once the
//! last strong reference is dropped the bus prunes the registration on its
//! next dispatch or unregistration pass.

use crate::domain::events::{EventType, GlobalEvent};

/// Port for objects that receive global events
///
/// # Examples
///
/// ```ignore
/// struct WeatherHud;
///
/// impl EventListener for WeatherHud {
///     fn on_event(&self, event: &GlobalEvent) {
///         println!("weather is now {:?}", event.data("Weather"));
///     }
///
///     fn listened_event_types(&self) -> Vec<EventType> {
///         vec![EventType::WeatherChanged]
///     }
/// }
/// ```
pub trait EventListener: Send + Sync {
    /// Called once per matching event
    ///
    /// The listener must not try to reach back into the bus that is
    /// dispatching to it; the bus is exclusively borrowed during dispatch.
    fn on_event(&self, event: &GlobalEvent);

    /// Event types this listener wants when it registers without an
    /// explicit list. An empty list means every type.
    fn listened_event_types(&self) -> Vec<EventType> {
        Vec::new()
    }

    /// Name used in logs
    fn listener_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
