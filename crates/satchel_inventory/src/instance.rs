//! Placed item instances

use crate::custom_data::CustomData;
use crate::grid::GridPosition;
use crate::item::{ItemDefinition, Orientation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a placed instance, unique within one inventory session
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u64);

impl InstanceId {
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sequential instance ID allocator
#[derive(Debug, Clone, Default)]
pub struct InstanceIdAllocator {
    next: u64,
}

impl InstanceIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next ID
    pub fn next(&mut self) -> InstanceId {
        let id = InstanceId(self.next);
        self.next += 1;
        id
    }
}

/// Which storage owns an instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Carried in the player inventory
    Inventory,
    /// Stored in the open container under this store GUID
    Container(String),
}

/// A placed, quantity-bearing occurrence of an item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemInstance {
    pub id: InstanceId,
    /// GUID of the item definition
    pub guid: String,
    /// Always at least 1 while the instance exists
    pub quantity: u16,
    pub orientation: Orientation,
    /// Top-left cell in grid coordinates
    pub position: GridPosition,
    pub custom_data: CustomData,
    pub owner: Owner,
    /// Footprint cached from the definition
    pub(crate) width: u16,
    pub(crate) height: u16,
}

impl ItemInstance {
    pub(crate) fn new(
        id: InstanceId,
        def: &ItemDefinition,
        quantity: u16,
        orientation: Orientation,
        position: GridPosition,
        custom_data: CustomData,
        owner: Owner,
    ) -> Self {
        Self {
            id,
            guid: def.guid.clone(),
            quantity,
            orientation,
            position,
            custom_data,
            owner,
            width: def.width,
            height: def.height,
        }
    }

    /// Effective (columns, rows) after rotation
    pub fn footprint(&self) -> (u16, u16) {
        self.orientation.apply(self.width, self.height)
    }

    /// Every cell this instance covers, row-major
    pub fn cells(&self) -> Vec<GridPosition> {
        let (w, h) = self.footprint();
        let mut cells = Vec::with_capacity(w as usize * h as usize);
        for dy in 0..h {
            for dx in 0..w {
                cells.push(GridPosition::new(self.position.x + dx, self.position.y + dy));
            }
        }
        cells
    }

    pub fn is_in_container(&self) -> bool {
        matches!(self.owner, Owner::Container(_))
    }

    /// Store GUID if owned by a container
    pub fn store_guid(&self) -> Option<&str> {
        match &self.owner {
            Owner::Container(guid) => Some(guid),
            Owner::Inventory => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator() {
        let mut ids = InstanceIdAllocator::new();
        let a = ids.next();
        let b = ids.next();
        assert_ne!(a, b);
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert_eq!(b.to_string(), "#1");
    }

    #[test]
    fn test_cells_follow_orientation() {
        let def = ItemDefinition::new("rifle", "Rifle").with_size(3, 1);
        let mut instance = ItemInstance::new(
            InstanceId::from_raw(0),
            &def,
            1,
            Orientation::Horizontal,
            GridPosition::new(1, 2),
            CustomData::default(),
            Owner::Inventory,
        );

        assert_eq!(
            instance.cells(),
            vec![GridPosition::new(1, 2), GridPosition::new(2, 2), GridPosition::new(3, 2)]
        );

        instance.orientation = Orientation::Vertical;
        assert_eq!(instance.footprint(), (1, 3));
        assert_eq!(instance.cells().last(), Some(&GridPosition::new(1, 4)));
        assert!(!instance.is_in_container());
    }
}
