//! Quick-access shortcut slots

use crate::config::SHORTCUT_SLOTS;
use crate::error::{InventoryError, Result};
use crate::instance::InstanceId;

/// Fixed set of shortcut bindings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shortcuts {
    slots: [Option<InstanceId>; SHORTCUT_SLOTS],
}

impl Shortcuts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instance bound to a slot
    pub fn get(&self, index: usize) -> Option<InstanceId> {
        self.slots.get(index).copied().flatten()
    }

    /// Slot an instance is bound to
    pub fn slot_of(&self, id: InstanceId) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(id))
    }

    /// Bind `id` to `index`, clearing any other slot holding it.
    ///
    /// Returns the instance previously bound to `index`.
    pub(crate) fn bind(&mut self, index: usize, id: InstanceId) -> Result<Option<InstanceId>> {
        if index >= SHORTCUT_SLOTS {
            return Err(InventoryError::InvalidShortcut(index));
        }
        if let Some(previous) = self.slot_of(id) {
            self.slots[previous] = None;
        }
        Ok(self.slots[index].replace(id))
    }

    /// Clear the slot holding `id`, returning its index
    pub(crate) fn unbind_if_bound(&mut self, id: InstanceId) -> Option<usize> {
        let slot = self.slot_of(id)?;
        self.slots[slot] = None;
        Some(slot)
    }

    /// Bound (slot, instance) pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, InstanceId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|id| (i, id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_unbind() {
        let mut shortcuts = Shortcuts::new();
        let id = InstanceId::from_raw(4);

        assert_eq!(shortcuts.bind(2, id), Ok(None));
        assert_eq!(shortcuts.get(2), Some(id));
        assert_eq!(shortcuts.slot_of(id), Some(2));

        assert_eq!(shortcuts.unbind_if_bound(id), Some(2));
        assert_eq!(shortcuts.unbind_if_bound(id), None);
        assert_eq!(shortcuts.get(2), None);
    }

    #[test]
    fn test_rebind_moves_instance() {
        let mut shortcuts = Shortcuts::new();
        let a = InstanceId::from_raw(1);
        let b = InstanceId::from_raw(2);

        shortcuts.bind(0, a).unwrap();
        shortcuts.bind(1, b).unwrap();
        assert_eq!(shortcuts.bind(1, a), Ok(Some(b)));

        assert_eq!(shortcuts.get(0), None);
        assert_eq!(shortcuts.iter().collect::<Vec<_>>(), vec![(1, a)]);
    }

    #[test]
    fn test_invalid_slot() {
        let mut shortcuts = Shortcuts::new();
        assert_eq!(
            shortcuts.bind(SHORTCUT_SLOTS, InstanceId::from_raw(0)),
            Err(InventoryError::InvalidShortcut(SHORTCUT_SLOTS))
        );
    }
}
