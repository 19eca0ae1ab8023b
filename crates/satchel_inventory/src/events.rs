//! Inventory events

use crate::grid::GridPosition;
use crate::instance::InstanceId;

/// Events fired synchronously after each successful mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryEvent {
    /// New instance placed
    ItemAdded {
        instance: InstanceId,
        guid: String,
        quantity: u16,
        position: GridPosition,
    },
    /// Instance destroyed; `quantity` is what it held at that moment
    ItemRemoved {
        instance: InstanceId,
        guid: String,
        quantity: u16,
    },
    /// Instance quantity changed without creating or destroying it
    StackChanged {
        instance: InstanceId,
        guid: String,
        old_quantity: u16,
        new_quantity: u16,
    },
    /// Total carried quantity of an item after an operation
    InventoryChanged { guid: String, total: u32 },
    /// Instance moved, possibly between inventory and container
    ItemMoved {
        instance: InstanceId,
        from: GridPosition,
        to: GridPosition,
        into_container: bool,
    },
    /// Instance bound to a shortcut slot
    ShortcutBound { slot: usize, instance: InstanceId },
    /// Shortcut slot cleared
    ShortcutUnbound { slot: usize, instance: InstanceId },
    /// Locked slots opened up
    Expanded { unlocked: usize },
    ContainerOpened { name: String },
    ContainerClosed { name: String },
}

/// Event listener
pub type EventHandler = Box<dyn FnMut(&InventoryEvent) + Send>;

/// Listener handle returned by `subscribe`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

/// Ordered listener list
#[derive(Default)]
pub(crate) struct EventDispatcher {
    handlers: Vec<(SubscriberId, EventHandler)>,
    next_subscriber_id: u64,
}

impl EventDispatcher {
    pub fn subscribe(&mut self, handler: EventHandler) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber_id);
        self.next_subscriber_id += 1;
        self.handlers.push((id, handler));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sid, _)| *sid != id);
        self.handlers.len() != before
    }

    pub fn emit(&mut self, event: InventoryEvent) {
        for (_, handler) in &mut self.handlers {
            handler(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_dispatch_order_and_unsubscribe() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::default();

        let first = {
            let seen = seen.clone();
            dispatcher.subscribe(Box::new(move |_| seen.lock().push(1)))
        };
        {
            let seen = seen.clone();
            dispatcher.subscribe(Box::new(move |_| seen.lock().push(2)));
        }

        dispatcher.emit(InventoryEvent::Expanded { unlocked: 1 });
        assert_eq!(*seen.lock(), vec![1, 2]);

        assert!(dispatcher.unsubscribe(first));
        assert!(!dispatcher.unsubscribe(first));
        dispatcher.emit(InventoryEvent::Expanded { unlocked: 1 });
        assert_eq!(*seen.lock(), vec![1, 2, 2]);
        assert_eq!(dispatcher.len(), 1);
    }
}
