//! The process-wide publish/subscribe event bus.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use nebula_core::SubscriptionId;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EventBusError;
use crate::subscription::{EventCallback, SubscribeOptions, Subscriber, Subscription};

const SYSTEM_ERROR_EVENT: &str = "system:error";

struct Inner {
    subscribers: RwLock<HashMap<String, Vec<Subscriber>>>,
    seq: AtomicU64,
}

/// A process-wide, string-keyed publish/subscribe bus.
///
/// Cloning an `EventBus` is cheap and shares the same subscriber table;
/// every clone observes the same subscriptions.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    /// Construct an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                subscribers: RwLock::new(HashMap::new()),
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// Register a callback for `event_type`, returning a [`Subscription`]
    /// handle that can later be used to unsubscribe.
    pub fn subscribe(
        &self,
        event_type: impl Into<String>,
        callback: EventCallback,
        options: SubscribeOptions,
    ) -> Subscription {
        let event_type = event_type.into();
        let id = SubscriptionId::v4();
        let active = Arc::new(AtomicBool::new(true));
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);

        let subscriber = Subscriber {
            id,
            callback,
            priority: options.priority,
            once: options.once,
            is_async: options.is_async,
            seq,
            active: Arc::clone(&active),
        };

        let mut table = self.inner.subscribers.write();
        table.entry(event_type.clone()).or_default().push(subscriber);
        drop(table);

        Subscription::new(event_type, id, active, self.clone())
    }

    /// Remove a subscription. Idempotent; unsubscribing twice is a no-op.
    pub(crate) fn unsubscribe(&self, subscription: &Subscription) {
        subscription_deactivate(subscription);
        let mut table = self.inner.subscribers.write();
        if let Some(subs) = table.get_mut(subscription.event_type()) {
            subs.retain(|s| s.id != subscription.id());
            if subs.is_empty() {
                table.remove(subscription.event_type());
            }
        }
    }

    /// Whether any subscriber is registered for `event_type`.
    #[must_use]
    pub fn has_subscribers(&self, event_type: &str) -> bool {
        self.inner
            .subscribers
            .read()
            .get(event_type)
            .is_some_and(|s| !s.is_empty())
    }

    /// Count of subscribers currently registered for `event_type`.
    #[must_use]
    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.inner
            .subscribers
            .read()
            .get(event_type)
            .map_or(0, Vec::len)
    }

    /// Remove every subscriber for a single event type.
    pub fn clear_event_subscriptions(&self, event_type: &str) {
        if let Some(subs) = self.inner.subscribers.write().remove(event_type) {
            for s in subs {
                s.active.store(false, Ordering::Release);
            }
        }
    }

    /// Remove every subscriber for every event type.
    pub fn clear_all_subscriptions(&self) {
        let mut table = self.inner.subscribers.write();
        for subs in table.values() {
            for s in subs {
                s.active.store(false, Ordering::Release);
            }
        }
        table.clear();
    }

    /// Publish `payload` under `event_type`.
    ///
    /// Subscribers run concurrently, highest priority first (ties broken by
    /// registration order), and `publish` resolves only once every
    /// subscriber has settled. A subscriber panic is caught, isolated from
    /// its siblings, and re-published as `system:error` — unless the event
    /// being delivered was itself `system:error`, which guards against an
    /// infinite loop.
    pub async fn publish(&self, event_type: impl Into<String>, payload: Value) {
        let event_type = event_type.into();
        let failures = self.deliver_once(&event_type, payload).await;

        if event_type != SYSTEM_ERROR_EVENT {
            for err in failures {
                let payload =
                    serde_json::to_value(&err).unwrap_or_else(|_| Value::String(err.to_string()));
                // `deliver_once`, not `publish`: a self-recursive async fn call here
                // would give `publish`'s future an infinitely-sized, self-referential
                // type (the compiler reports this as a Send-bound overflow).
                self.deliver_once(SYSTEM_ERROR_EVENT, payload).await;
            }
        }
    }

    async fn deliver_once(&self, event_type: &str, payload: Value) -> Vec<EventBusError> {
        let snapshot = {
            let mut subs: Vec<Subscriber> = self
                .inner
                .subscribers
                .read()
                .get(event_type)
                .map(|v| v.iter().map(Subscriber::clone_handle).collect())
                .unwrap_or_default();
            subs.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
            subs
        };

        if snapshot.is_empty() {
            debug!(event_type = %event_type, "publish with no subscribers");
            return Vec::new();
        }

        let mut handles = Vec::with_capacity(snapshot.len());
        let mut once_ids = Vec::new();
        for sub in &snapshot {
            if sub.once {
                once_ids.push(sub.id);
            }
            let callback = Arc::clone(&sub.callback);
            let payload = payload.clone();
            let event_type_for_panic = event_type.to_string();
            let sub_id = sub.id;
            handles.push(tokio::spawn(async move {
                let fut = AssertUnwindSafe((callback)(payload)).catch_unwind();
                match fut.await {
                    Ok(()) => None,
                    Err(panic) => {
                        let message = panic_message(&panic);
                        warn!(
                            subscription_id = %sub_id,
                            event_type = %event_type_for_panic,
                            %message,
                            "subscriber panicked"
                        );
                        Some(EventBusError::SubscriberPanicked {
                            event_type: event_type_for_panic,
                            subscription_id: sub_id.to_string(),
                            message,
                        })
                    }
                }
            }));
        }

        let mut failures = Vec::new();
        for handle in handles {
            if let Ok(Some(err)) = handle.await {
                failures.push(err);
            }
        }

        if !once_ids.is_empty() {
            let mut table = self.inner.subscribers.write();
            if let Some(subs) = table.get_mut(event_type) {
                subs.retain(|s| !once_ids.contains(&s.id));
            }
        }

        failures
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriber {
    fn clone_handle(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
            priority: self.priority,
            once: self.once,
            is_async: self.is_async,
            seq: self.seq,
            active: Arc::clone(&self.active),
        }
    }
}

fn subscription_deactivate(subscription: &Subscription) {
    // The active flag lives on the Subscriber entry too; Subscription carries
    // its own handle to the same Arc<AtomicBool>, so this flips both views.
    subscription.active_flag().store(false, Ordering::Release);
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
