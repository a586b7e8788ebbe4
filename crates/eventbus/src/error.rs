//! Event-bus error types.

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the event bus itself (not subscriber failures, which
/// are isolated and never reach a caller — see [`crate::bus::EventBus::publish`]).
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
pub enum EventBusError {
    /// A subscriber panicked while handling an event.
    #[error("subscriber {subscription_id} panicked handling {event_type}: {message}")]
    SubscriberPanicked {
        /// The event type being delivered when the panic occurred.
        event_type: String,
        /// The id of the subscription that panicked.
        subscription_id: String,
        /// The panic payload, downcast to a string where possible.
        message: String,
    },
}
