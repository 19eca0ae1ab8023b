//! Save records
//!
//! Loading reproduces the saved placement exactly instead of searching for
//! free space again, and rejects malformed records without touching the
//! live inventory.

use crate::catalog::ItemCatalog;
use crate::container::{Container, ContainerItem};
use crate::custom_data::CustomData;
use crate::error::{InventoryError, Result};
use crate::grid::{GridPosition, SlotGrid};
use crate::instance::{InstanceId, InstanceIdAllocator, ItemInstance, Owner};
use crate::inventory::{place_on, Inventory};
use crate::item::{ItemDefinition, Orientation};
use crate::shortcut::Shortcuts;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Persisted item instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedItem {
    pub guid: String,
    pub quantity: u16,
    pub orientation: Orientation,
    pub position: GridPosition,
    #[serde(default)]
    pub custom_data: CustomData,
    /// Bound shortcut slot
    #[serde(default)]
    pub shortcut: Option<usize>,
}

/// Persisted player inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySave {
    /// Unlocked inventory cells, including expansions
    pub unlocked_slots: usize,
    /// Carried items in placement order
    pub items: Vec<SavedItem>,
}

/// Persisted container keyed by store GUID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSave {
    pub name: String,
    pub rows: u16,
    pub columns: u16,
    pub items: BTreeMap<String, SavedItem>,
}

/// Grid, carried items, shortcuts and ID allocator rebuilt from a save
type Rebuilt = (
    SlotGrid,
    BTreeMap<InstanceId, ItemInstance>,
    Shortcuts,
    InstanceIdAllocator,
);

fn decode_error(context: &str, err: InventoryError) -> InventoryError {
    match err {
        InventoryError::Decode(_) => err,
        other => InventoryError::Decode(format!("{}: {}", context, other)),
    }
}

fn check_quantity(def: &ItemDefinition, quantity: u16) -> Result<()> {
    if quantity == 0 || quantity > def.stack_limit() {
        return Err(InventoryError::Decode(format!(
            "'{}' cannot hold {} units",
            def.guid, quantity
        )));
    }
    Ok(())
}

impl Inventory {
    /// Snapshot of the carried items. An open container is not included;
    /// save it from the value returned by `close_container`.
    pub fn save(&self) -> InventorySave {
        let items = self
            .carrying
            .values()
            .map(|instance| SavedItem {
                guid: instance.guid.clone(),
                quantity: instance.quantity,
                orientation: instance.orientation,
                position: instance.position,
                custom_data: instance.custom_data.clone(),
                shortcut: self.shortcuts.slot_of(instance.id),
            })
            .collect();

        InventorySave {
            unlocked_slots: self.grid.unlocked_slots(),
            items,
        }
    }

    /// Replace the carried items with a saved snapshot.
    ///
    /// The snapshot is rebuilt on a fresh grid first; any invalid record
    /// fails with `Decode` and leaves the inventory as it was.
    pub fn load(&mut self, save: &InventorySave) -> Result<()> {
        if let Some(open) = &self.open {
            return Err(InventoryError::ContainerAlreadyOpen(
                open.container.name().to_string(),
            ));
        }

        match self.rebuild(save) {
            Ok((grid, carrying, shortcuts, ids)) => {
                let guids: BTreeSet<String> = self
                    .carrying
                    .values()
                    .chain(carrying.values())
                    .map(|i| i.guid.clone())
                    .collect();

                self.grid = grid;
                self.carrying = carrying;
                self.shortcuts = shortcuts;
                self.ids = ids;
                log::info!(
                    "Loaded inventory with {} items and {} unlocked slots",
                    self.carrying.len(),
                    save.unlocked_slots
                );
                for guid in guids {
                    self.emit_total(&guid);
                }
                Ok(())
            }
            Err(e) => {
                log::warn!("Failed to load inventory: {}", e);
                Err(e)
            }
        }
    }

    fn rebuild(&self, save: &InventorySave) -> Result<Rebuilt> {
        let mut grid = SlotGrid::new(self.config.rows, self.config.columns, self.config.locked_rows);
        let initial = grid.unlocked_slots();
        if save.unlocked_slots < initial {
            return Err(InventoryError::Decode(format!(
                "{} unlocked slots is below the configured {}",
                save.unlocked_slots, initial
            )));
        }
        let wanted = save.unlocked_slots - initial;
        if grid.expand(wanted) != wanted {
            return Err(InventoryError::Decode(format!(
                "{} unlocked slots exceed the grid",
                save.unlocked_slots
            )));
        }

        let mut carrying = BTreeMap::new();
        let mut shortcuts = Shortcuts::new();
        let mut ids = InstanceIdAllocator::new();

        for item in &save.items {
            let def = self
                .catalog
                .require(&item.guid)
                .map_err(|e| decode_error("inventory item", e))?;
            check_quantity(def, item.quantity)?;

            let id = ids.next();
            let instance = place_on(
                &mut grid,
                def,
                id,
                item.quantity,
                item.orientation,
                item.position,
                item.custom_data.clone(),
                Owner::Inventory,
            )
            .map_err(|e| decode_error(&item.guid, e))?;

            if let Some(slot) = item.shortcut {
                if !def.flags.bind_shortcut {
                    return Err(InventoryError::Decode(format!(
                        "'{}' cannot be bound to a shortcut",
                        item.guid
                    )));
                }
                let replaced = shortcuts
                    .bind(slot, id)
                    .map_err(|e| decode_error(&item.guid, e))?;
                if replaced.is_some() {
                    return Err(InventoryError::Decode(format!(
                        "shortcut {} is bound twice",
                        slot
                    )));
                }
            }
            carrying.insert(id, instance);
        }

        Ok((grid, carrying, shortcuts, ids))
    }
}

impl Container {
    /// Snapshot of the stored items
    pub fn save(&self) -> ContainerSave {
        let items = self
            .items()
            .iter()
            .map(|(store_guid, item)| {
                (
                    store_guid.clone(),
                    SavedItem {
                        guid: item.guid.clone(),
                        quantity: item.quantity,
                        orientation: item.orientation,
                        position: item.position,
                        custom_data: item.custom_data.clone(),
                        shortcut: None,
                    },
                )
            })
            .collect();

        ContainerSave {
            name: self.name().to_string(),
            rows: self.rows(),
            columns: self.columns(),
            items,
        }
    }

    /// Rebuild a container, validating every stored item against the catalog
    pub fn from_save(save: &ContainerSave, catalog: &ItemCatalog) -> Result<Self> {
        if save.rows == 0 || save.columns == 0 {
            return Err(InventoryError::Decode(format!(
                "container '{}' has no slots",
                save.name
            )));
        }

        let mut container = Container::new(save.name.clone(), save.rows, save.columns);
        for (store_guid, item) in &save.items {
            let stored = ContainerItem {
                guid: item.guid.clone(),
                quantity: item.quantity,
                orientation: item.orientation,
                position: item.position,
                custom_data: item.custom_data.clone(),
            };
            container
                .place(catalog, store_guid.clone(), stored)
                .map_err(|e| decode_error(&format!("container '{}'", save.name), e))?;
        }
        Ok(container)
    }
}
