//! Typed publish/subscribe channels.
//!
//! Every channel carries one closed event type. Subscribers get an `mpsc`
//! receiver and drain it from the cooperative update loop, so a publisher never
//! re-enters the subscriber while it is running.

use crate::graph::{GraphId, GraphLink};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};

/// Identity of one subscription on one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A live subscription: its id (for unsubscribing) and the inbox
#[derive(Debug)]
pub struct Subscription<E> {
    id: SubscriptionId,
    inbox: Receiver<E>,
}

impl<E> Subscription<E> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Take every event delivered so far, oldest first
    pub fn drain(&self) -> Vec<E> {
        self.inbox.try_iter().collect()
    }
}

struct BusInner<E> {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Sender<E>)>,
}

/// Cheaply cloneable handle to a single event channel.
///
/// Clones share the same subscriber list.
pub struct EventBus<E> {
    inner: Rc<RefCell<BusInner<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(BusInner {
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription<E> {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, tx));
        Subscription { id, inbox: rx }
    }

    /// Remove a subscriber. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(sid, _)| *sid != id);
        inner.subscribers.len() != before
    }

    /// Deliver an event to every subscriber. Subscribers whose receiver was
    /// dropped are pruned.
    pub fn publish(&self, event: E) {
        self.inner
            .borrow_mut()
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

/// External "graph fully loaded" notification, keyed by graph identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphReady(pub GraphId);

/// Tooltip request sent to the host. The hidden variant only carries `is_visible = false`.
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipEvent {
    pub is_visible: bool,
    pub from: Option<String>,
    pub to: Option<String>,
    pub x: f32,
    pub y: f32,
}

impl TooltipEvent {
    pub fn shown(link: &GraphLink, x: f32, y: f32) -> Self {
        Self {
            is_visible: true,
            from: Some(link.from_id.clone()),
            to: Some(link.to_id.clone()),
            x,
            y,
        }
    }

    pub fn hidden() -> Self {
        Self {
            is_visible: false,
            from: None,
            to: None,
            x: 0.0,
            y: 0.0,
        }
    }
}

/// Domain events the scene raises for the host application
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// A link was clicked
    ShowDetails(GraphLink),
    /// Pointer entered or left a link
    ShowTooltip(TooltipEvent),
}

/// The shared bus between the host application and the renderer
#[derive(Clone, Default)]
pub struct HostBus {
    pub graph_ready: EventBus<GraphReady>,
    pub ui: EventBus<UiEvent>,
}

impl HostBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_every_subscriber_in_order() {
        let bus: EventBus<u32> = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(1);
        bus.publish(2);

        assert_eq!(a.drain(), vec![1, 2]);
        assert_eq!(b.drain(), vec![1, 2]);
        assert!(a.drain().is_empty());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus: EventBus<&'static str> = EventBus::new();
        let sub = bus.subscribe();

        assert!(bus.unsubscribe(sub.id()));
        assert!(!bus.unsubscribe(sub.id()));

        bus.publish("late");
        assert!(sub.drain().is_empty());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let bus: EventBus<u8> = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        bus.publish(7);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.drain(), vec![7]);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let bus: EventBus<u8> = EventBus::new();
        let clone = bus.clone();
        let sub = bus.subscribe();

        clone.publish(3);
        assert_eq!(sub.drain(), vec![3]);
    }
}
