//! Satchel GameState - Inventory Persistence
//!
//! This crate writes inventory and container save records to named slots
//! on disk and reads them back.
//!
//! # Features
//!
//! - JSON (human readable) or binary (bincode) save files
//! - Save format versioning
//! - Quicksave and rotating autosaves
//! - Slot listing for load menus
//!
//! # Example
//!
//! ```ignore
//! use satchel_gamestate::prelude::*;
//!
//! let mut saves = SaveManager::new("saves").with_format(SaveFormat::Json);
//!
//! let data = SaveData::capture("Chapter 2", &inventory, [&chest]);
//! saves.save("slot1", &data)?;
//!
//! let loaded = saves.load("slot1")?;
//! loaded.restore_inventory(&mut inventory)?;
//! let containers = loaded.restore_containers(inventory.catalog())?;
//! ```

pub mod save;

pub mod prelude {
    pub use crate::save::{SaveData, SaveError, SaveFormat, SaveHeader, SaveManager, SaveSlot};
}

pub use prelude::*;
