use std::fmt;

use crate::config::InteractableConfig;
use crate::interactor::DetectionMode;
use crate::replication::{ReplicatedField, ReplicatedInteractable};
use crate::world::{InteractableId, InteractorId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Box<dyn FnMut(&E)>;

/// Multi-subscriber channel. `emit` calls every listener synchronously, in
/// subscription order, on the caller's thread.
pub struct Broadcast<E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
}

impl<E> Default for Broadcast<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for Broadcast<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcast")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> Broadcast<E> {
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapChanged {
    pub is_overlapping: bool,
    pub interactor: InteractorId,
    pub interactable: InteractableId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoverChanged {
    pub is_hovering: bool,
    pub interactor: InteractorId,
    pub interactable: InteractableId,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressChanged {
    pub percent: f32,
    pub interactable: InteractableId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interacted {
    pub interactor: InteractorId,
    pub interactable: InteractableId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataRefreshed {
    pub interactable: InteractableId,
    pub config: InteractableConfig,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateSynced {
    pub interactable: InteractableId,
    pub field: ReplicatedField,
    pub state: ReplicatedInteractable,
}

#[derive(Debug, Default)]
pub struct InteractableEvents {
    pub data_refresh: Broadcast<DataRefreshed>,
    pub visibility: Broadcast<bool>,
    pub overlap_changed: Broadcast<OverlapChanged>,
    pub hover_changed: Broadcast<HoverChanged>,
    pub progress_changed: Broadcast<ProgressChanged>,
    pub interacted: Broadcast<Interacted>,
    pub notice: Broadcast<String>,
    pub state_sync: Broadcast<StateSynced>,
}

#[derive(Debug, Default)]
pub struct InteractorEvents {
    pub interacted: Broadcast<Interacted>,
    pub detection_mode_changed: Broadcast<DetectionMode>,
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn emit_reaches_all_listeners_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut channel = Broadcast::<u32>::default();
        let first = Rc::clone(&log);
        channel.subscribe(move |value| first.borrow_mut().push(("first", *value)));
        let second = Rc::clone(&log);
        channel.subscribe(move |value| second.borrow_mut().push(("second", *value)));

        channel.emit(&7);

        assert_eq!(*log.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let hits = Rc::new(RefCell::new(0));
        let mut channel = Broadcast::<()>::default();
        let counter = Rc::clone(&hits);
        let id = channel.subscribe(move |_| *counter.borrow_mut() += 1);

        channel.emit(&());
        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));
        channel.emit(&());

        assert_eq!(*hits.borrow(), 1);
        assert_eq!(channel.listener_count(), 0);
    }
}
