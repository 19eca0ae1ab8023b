//! Callbacks into the player layer
//!
//! The inventory decides *when* to equip, heal or fire combine events;
//! the implementor decides what that means in the game.

use crate::instance::ItemInstance;

/// Player-side collaborator of the inventory
pub trait PlayerHooks: Send {
    /// Equip player item `index`
    fn equip(&mut self, index: usize);

    fn is_equipped(&self, index: usize) -> bool {
        self.equipped_index() == Some(index)
    }

    /// Currently equipped player item
    fn equipped_index(&self) -> Option<usize>;

    /// Put away the equipped player item
    fn deselect(&mut self);

    /// Whether the equipped player item accepts a combine right now
    fn can_combine(&self) -> bool {
        false
    }

    /// An item was combined into the equipped player item
    fn notify_combine(&mut self, _consumed: &ItemInstance) {}

    /// A combine rule with `event_after_combine` fired
    fn combine_event(&mut self, _active: &str, _second: &str) {}

    /// Restore health; return `false` to refuse (e.g. already full)
    fn heal(&mut self, _points: u32) -> bool {
        false
    }

    /// An item with `UsableType::CustomEvent` was used
    fn custom_use(&mut self, _item: &ItemInstance) {}
}

/// Hooks for an inventory without a player attached
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPlayerHooks;

impl PlayerHooks for NoPlayerHooks {
    fn equip(&mut self, _index: usize) {}

    fn equipped_index(&self) -> Option<usize> {
        None
    }

    fn deselect(&mut self) {}
}
