//! Secondary storage grids (chests, lockers, ...)

use crate::catalog::ItemCatalog;
use crate::custom_data::CustomData;
use crate::error::{InventoryError, Result};
use crate::grid::{GridPosition, SlotGrid};
use crate::instance::InstanceId;
use crate::item::Orientation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An item stored in a container, in container-local coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerItem {
    pub guid: String,
    pub quantity: u16,
    pub orientation: Orientation,
    pub position: GridPosition,
    #[serde(default)]
    pub custom_data: CustomData,
}

/// Named storage grid, independent of the player's inventory.
///
/// Contents are keyed by a store GUID that identifies each stored item
/// across save/load, distinct from the item's own GUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    name: String,
    rows: u16,
    columns: u16,
    items: BTreeMap<String, ContainerItem>,
}

impl Container {
    /// Create an empty container
    pub fn new(name: impl Into<String>, rows: u16, columns: u16) -> Self {
        Self {
            name: name.into(),
            rows,
            columns,
            items: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    /// Stored items keyed by store GUID
    pub fn items(&self) -> &BTreeMap<String, ContainerItem> {
        &self.items
    }

    pub fn get(&self, store_guid: &str) -> Option<&ContainerItem> {
        self.items.get(store_guid)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Fresh store GUID
    pub fn new_store_guid() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Insert or replace a stored item
    pub(crate) fn store(&mut self, store_guid: impl Into<String>, item: ContainerItem) {
        self.items.insert(store_guid.into(), item);
    }

    /// Remove a stored item
    pub(crate) fn remove(&mut self, store_guid: &str) -> Option<ContainerItem> {
        self.items.remove(store_guid)
    }

    /// Occupancy of this container's own grid, with stored items given
    /// throwaway IDs in key order. `skip` leaves one entry out.
    fn placement_grid(&self, catalog: &ItemCatalog, skip: Option<&str>) -> Result<SlotGrid> {
        let mut grid = SlotGrid::new(self.rows, self.columns, 0);
        let entries = self
            .items
            .iter()
            .filter(|(store_guid, _)| Some(store_guid.as_str()) != skip);
        for (i, (store_guid, item)) in entries.enumerate() {
            let def = catalog.require(&item.guid)?;
            let (w, h) = def.footprint(item.orientation);
            if !grid.region_fits(item.position, w, h, None) {
                return Err(InventoryError::Decode(format!(
                    "container '{}' item '{}' does not fit at ({}, {})",
                    self.name, store_guid, item.position.x, item.position.y
                )));
            }
            grid.occupy(item.position, w, h, InstanceId::from_raw(i as u64));
        }
        Ok(grid)
    }

    /// Store an item at the first free position, returning its store GUID
    pub fn insert(
        &mut self,
        catalog: &ItemCatalog,
        guid: &str,
        quantity: u16,
        custom_data: CustomData,
    ) -> Result<String> {
        let def = catalog.require(guid)?;
        if quantity == 0 {
            return Err(InventoryError::ZeroQuantity(guid.to_string()));
        }
        let quantity = quantity.min(def.stack_limit());
        let grid = self.placement_grid(catalog, None)?;

        let (position, orientation) = grid
            .find_free_space(def.width, def.height, None)
            .ok_or_else(|| InventoryError::CapacityExhausted {
                guid: guid.to_string(),
                quantity: quantity as u32,
            })?;

        let store_guid = Self::new_store_guid();
        log::debug!(
            "Stored {}x '{}' in container '{}' at ({}, {})",
            quantity,
            guid,
            self.name,
            position.x,
            position.y
        );
        self.store(
            store_guid.clone(),
            ContainerItem {
                guid: guid.to_string(),
                quantity,
                orientation,
                position,
                custom_data,
            },
        );
        Ok(store_guid)
    }

    /// Store an item at an explicit position
    pub fn place(
        &mut self,
        catalog: &ItemCatalog,
        store_guid: impl Into<String>,
        item: ContainerItem,
    ) -> Result<()> {
        let store_guid = store_guid.into();
        let def = catalog.require(&item.guid)?;
        if item.quantity == 0 || item.quantity > def.stack_limit() {
            return Err(InventoryError::Decode(format!(
                "invalid quantity {} for '{}'",
                item.quantity, item.guid
            )));
        }

        let (w, h) = def.footprint(item.orientation);
        let grid = self.placement_grid(catalog, Some(store_guid.as_str()))?;
        if !grid.region_fits(item.position, w, h, None) {
            return Err(InventoryError::InvalidCoordinates {
                x: item.position.x,
                y: item.position.y,
            });
        }

        self.store(store_guid, item);
        Ok(())
    }

    /// Total stored quantity of an item
    pub fn count(&self, guid: &str) -> u32 {
        self.items
            .values()
            .filter(|i| i.guid == guid)
            .map(|i| i.quantity as u32)
            .sum()
    }
}
