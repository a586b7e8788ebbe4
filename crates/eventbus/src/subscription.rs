//! Subscriber registration and the [`Subscription`] capability handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use nebula_core::SubscriptionId;

use crate::bus::EventBus;

/// A subscriber's callback: takes the event payload, returns a future that
/// resolves once the subscriber has finished handling it.
pub type EventCallback = Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Options controlling how a subscription behaves.
#[derive(Clone, Copy, Debug)]
pub struct SubscribeOptions {
    /// Higher priority subscribers run first within a single `publish`.
    pub priority: i32,
    /// If `true`, the subscription is removed after its first invocation.
    pub once: bool,
    /// If `true` (the default), the callback runs concurrently with
    /// sibling subscribers; `publish` still waits for every subscriber
    /// to settle regardless of this flag.
    pub is_async: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            priority: 0,
            once: false,
            is_async: true,
        }
    }
}

/// An entry in the bus's subscriber table.
pub(crate) struct Subscriber {
    pub(crate) id: SubscriptionId,
    pub(crate) callback: EventCallback,
    pub(crate) priority: i32,
    pub(crate) once: bool,
    #[allow(dead_code)] // carried for fidelity with the spec; scheduling doesn't branch on it
    pub(crate) is_async: bool,
    pub(crate) seq: u64,
    pub(crate) active: Arc<AtomicBool>,
}

/// An opaque handle to an active subscription.
///
/// Its only powers are inspecting whether it is still active and
/// unsubscribing; the bus never exposes its subscriber table directly.
#[derive(Clone)]
pub struct Subscription {
    event_type: String,
    id: SubscriptionId,
    active: Arc<AtomicBool>,
    bus: EventBus,
}

impl Subscription {
    pub(crate) fn new(
        event_type: String,
        id: SubscriptionId,
        active: Arc<AtomicBool>,
        bus: EventBus,
    ) -> Self {
        Self {
            event_type,
            id,
            active,
            bus,
        }
    }

    /// The event type this subscription was registered under.
    #[must_use]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The subscription's unique id.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether this subscription is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn active_flag(&self) -> &Arc<AtomicBool> {
        &self.active
    }

    /// Remove this subscription from the bus. Idempotent.
    pub fn unsubscribe(&self) {
        self.bus.unsubscribe(self);
    }
}
