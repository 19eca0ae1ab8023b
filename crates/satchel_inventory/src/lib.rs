//! Satchel Inventory - Grid Inventory System
//!
//! This crate provides a grid-based item inventory in the style of
//! survival-horror games: items occupy rectangular regions of slots,
//! stack up to a per-item limit, move in and out of containers and
//! combine into new items.
//!
//! # Features
//!
//! - Rectangular multi-cell items with horizontal/vertical orientation
//! - Stack top-up closest-to-full first, atomic adds
//! - Locked rows unlocked by expansion
//! - Container overlay with ownership transfer on move
//! - Combine rules: consume, craft, transform, fire events
//! - Four shortcut slots
//! - Save records with strict validation on load
//!
//! # Example
//!
//! ```ignore
//! use satchel_inventory::prelude::*;
//!
//! let catalog = ItemCatalog::from_json_str(&std::fs::read_to_string("items.json")?)?;
//! let mut inventory = Inventory::new(InventoryConfig::default(), catalog)?;
//!
//! inventory.add_item("potion", 3, CustomData::empty())?;
//!
//! let chest = Container::new("chest", 4, 3);
//! inventory.open_container(chest)?;
//! ```

pub mod catalog;
pub mod combine;
pub mod config;
pub mod container;
pub mod custom_data;
pub mod error;
pub mod events;
pub mod grid;
pub mod hooks;
pub mod instance;
pub mod inventory;
pub mod item;
pub mod persist;
pub mod shared;
pub mod shortcut;

pub mod prelude {
    pub use crate::catalog::{CatalogProvider, ItemCatalog, JsonCatalogFile};
    pub use crate::combine::CombineOutcome;
    pub use crate::config::{InventoryConfig, SHORTCUT_SLOTS};
    pub use crate::container::{Container, ContainerItem};
    pub use crate::custom_data::CustomData;
    pub use crate::error::InventoryError;
    pub use crate::events::{EventHandler, InventoryEvent, SubscriberId};
    pub use crate::grid::{GridPosition, Region, SlotGrid, SlotState};
    pub use crate::hooks::{NoPlayerHooks, PlayerHooks};
    pub use crate::instance::{InstanceId, ItemInstance, Owner};
    pub use crate::inventory::{AddOutcome, DroppedItem, Inventory, UseOutcome};
    pub use crate::item::{
        CombineRule, InheritSource, ItemDefinition, ItemFlags, Orientation, UsableType,
    };
    pub use crate::persist::{ContainerSave, InventorySave, SavedItem};
    pub use crate::shared::SharedInventory;
    pub use crate::shortcut::Shortcuts;
}

pub use prelude::*;
