//! Process-wide event bus
//!
//! Views subscribe to the report events they care about and resynchronize
//! when another view changes shared state. Events are not persisted and are
//! delivered only to handlers registered at publish time.

use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use parking_lot::Mutex;

/// Identifier handed out for every subscription
pub type SubscriptionId = u64;

type HandlerMap = AHashMap<TypeId, Vec<(SubscriptionId, Arc<dyn EventHandler>)>>;

/// System-wide event bus
pub struct EventBus {
    handlers: Arc<Mutex<HandlerMap>>,
    next_id: AtomicU64,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &dyn Event);
}

/// Report events
pub mod events {
    use super::Event;
    use crate::model::FilterSet;

    /// The selected columns of a report were written or cleared
    #[derive(Debug, Clone)]
    pub struct FieldsChanged {
        pub report_id: String,
        pub selected_columns: Vec<String>,
    }

    /// The filter set of a report was written or cleared
    #[derive(Debug, Clone)]
    pub struct FiltersChanged {
        pub report_id: String,
        pub filters: Option<FilterSet>,
    }

    /// Kind of catalog mutation
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum CatalogChange {
        Added,
        Replaced,
        Deleted,
    }

    /// A custom report was added, replaced or deleted
    #[derive(Debug, Clone)]
    pub struct CatalogChanged {
        pub report_id: String,
        pub change: CatalogChange,
    }

    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(FieldsChanged, FiltersChanged, CatalogChanged);
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to events of a specific type until [`EventBus::unsubscribe`]
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self.handlers.lock();
        handlers
            .entry(TypeId::of::<E>())
            .or_insert_with(Vec::new)
            .push((id, Arc::from(handler)));
        id
    }

    /// Subscribe for the lifetime of the returned guard
    pub fn subscribe_scoped<E: Event>(&self, handler: Box<dyn EventHandler>) -> Subscription {
        let id = self.subscribe::<E>(handler);
        Subscription {
            handlers: Arc::downgrade(&self.handlers),
            type_id: TypeId::of::<E>(),
            id,
        }
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        handlers.values_mut().any(|list| remove_handler(list, id))
    }

    /// Publish an event to every current subscriber of its type.
    ///
    /// Handlers run after the bus lock is released, so they may publish or
    /// subscribe themselves. A handler added during dispatch first sees the
    /// next event.
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = TypeId::of::<E>();
        let targets: Vec<Arc<dyn EventHandler>> = match self.handlers.lock().get(&type_id) {
            Some(list) => list.iter().map(|(_, handler)| handler.clone()).collect(),
            None => return,
        };

        for handler in targets {
            handler.handle(&event);
        }
    }

    /// Number of live subscriptions for an event type
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.handlers
            .lock()
            .get(&TypeId::of::<E>())
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_handler(list: &mut Vec<(SubscriptionId, Arc<dyn EventHandler>)>, id: SubscriptionId) -> bool {
    let before = list.len();
    list.retain(|(sub_id, _)| *sub_id != id);
    list.len() != before
}

/// Subscription that is removed from the bus when dropped
pub struct Subscription {
    handlers: Weak<Mutex<HandlerMap>>,
    type_id: TypeId,
    id: SubscriptionId,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            if let Some(list) = handlers.lock().get_mut(&self.type_id) {
                remove_handler(list, self.id);
            }
        }
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: Fn(&dyn Event) + Send + Sync,
{
    fn handle(&self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: Fn(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}

/// Create an event handler that only sees events of type `E`
pub fn typed_handler<E, F>(f: F) -> Box<dyn EventHandler>
where
    E: Event,
    F: Fn(&E) + Send + Sync + 'static,
{
    handler_from_fn(move |event: &dyn Event| {
        if let Some(event) = event.as_any().downcast_ref::<E>() {
            f(event);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::events::{FieldsChanged, FiltersChanged};
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn fields_event(id: &str) -> FieldsChanged {
        FieldsChanged {
            report_id: id.to_string(),
            selected_columns: vec!["a".to_string()],
        }
    }

    #[test]
    fn test_publish_reaches_typed_subscribers_only() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        bus.subscribe::<FieldsChanged>(typed_handler(move |e: &FieldsChanged| {
            assert_eq!(e.report_id, "r1");
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(fields_event("r1"));
        bus.publish(FiltersChanged {
            report_id: "r1".to_string(),
            filters: None,
        });

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_use_the_bus() {
        let bus = Arc::new(EventBus::new());
        let filters_seen = Arc::new(AtomicUsize::new(0));

        let counter = filters_seen.clone();
        bus.subscribe::<FiltersChanged>(typed_handler(move |_: &FiltersChanged| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        // Relays every fields event as a filters event and subscribes again
        let relay = Arc::downgrade(&bus);
        bus.subscribe::<FieldsChanged>(typed_handler(move |e: &FieldsChanged| {
            if let Some(bus) = relay.upgrade() {
                bus.publish(FiltersChanged {
                    report_id: e.report_id.clone(),
                    filters: None,
                });
                bus.subscribe::<FiltersChanged>(typed_handler(|_: &FiltersChanged| {}));
            }
        }));

        bus.publish(fields_event("r1"));
        assert_eq!(filters_seen.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count::<FiltersChanged>(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let id = bus.subscribe::<FieldsChanged>(typed_handler(move |_: &FieldsChanged| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(fields_event("r1"));
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_scoped_subscription_ends_on_drop() {
        let bus = EventBus::new();
        {
            let _sub = bus.subscribe_scoped::<FieldsChanged>(typed_handler(|_: &FieldsChanged| {}));
            assert_eq!(bus.subscriber_count::<FieldsChanged>(), 1);
        }
        assert_eq!(bus.subscriber_count::<FieldsChanged>(), 0);
    }
}
