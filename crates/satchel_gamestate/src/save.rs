//! Save/load system

use satchel_inventory::catalog::ItemCatalog;
use satchel_inventory::container::Container;
use satchel_inventory::error::InventoryError;
use satchel_inventory::inventory::Inventory;
use satchel_inventory::persist::{ContainerSave, InventorySave};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

/// Save system errors
#[derive(Debug, Error)]
pub enum SaveError {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
    /// Version mismatch
    #[error("Version mismatch: save version {0}, current version {1}")]
    VersionMismatch(u32, u32),
    /// Slot not found
    #[error("Save slot not found: {0}")]
    SlotNotFound(String),
    /// Corrupted save
    #[error("Corrupted save data")]
    Corrupted,
    /// Records rejected by the inventory
    #[error("Invalid inventory record: {0}")]
    Inventory(#[from] InventoryError),
}

/// Save file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveFormat {
    /// JSON (human readable)
    Json,
    /// Binary (compact)
    Binary,
}

impl Default for SaveFormat {
    fn default() -> Self {
        Self::Binary
    }
}

impl SaveFormat {
    fn extension(self) -> &'static str {
        match self {
            SaveFormat::Json => "json",
            SaveFormat::Binary => "sav",
        }
    }
}

/// Save data header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveHeader {
    /// Save format version
    pub version: u32,
    /// Save name/title
    pub name: String,
    /// Save timestamp (Unix timestamp)
    pub timestamp: u64,
    /// Current level/area
    pub level: String,
}

impl SaveHeader {
    /// Create a new header
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: SAVE_VERSION,
            name: name.into(),
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            level: String::new(),
        }
    }

    /// Set current level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Complete save data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Save header
    pub header: SaveHeader,
    /// Player inventory
    pub inventory: InventorySave,
    /// Containers keyed by name
    pub containers: BTreeMap<String, ContainerSave>,
}

impl SaveData {
    /// Create save data around an inventory record
    pub fn new(name: impl Into<String>, inventory: InventorySave) -> Self {
        Self {
            header: SaveHeader::new(name),
            inventory,
            containers: BTreeMap::new(),
        }
    }

    /// Snapshot an inventory and a set of containers
    pub fn capture<'a>(
        name: impl Into<String>,
        inventory: &Inventory,
        containers: impl IntoIterator<Item = &'a Container>,
    ) -> Self {
        let mut data = Self::new(name, inventory.save());
        for container in containers {
            data = data.with_container(container);
        }
        data
    }

    /// Add a container snapshot
    pub fn with_container(mut self, container: &Container) -> Self {
        self.containers
            .insert(container.name().to_string(), container.save());
        self
    }

    /// Set current level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.header.level = level.into();
        self
    }

    /// Load the inventory record into `inventory`
    pub fn restore_inventory(&self, inventory: &mut Inventory) -> Result<(), SaveError> {
        inventory.load(&self.inventory)?;
        Ok(())
    }

    /// Rebuild every saved container
    pub fn restore_containers(&self, catalog: &ItemCatalog) -> Result<BTreeMap<String, Container>, SaveError> {
        self.containers
            .iter()
            .map(|(name, save)| -> Result<(String, Container), SaveError> {
                Ok((name.clone(), Container::from_save(save, catalog)?))
            })
            .collect()
    }
}

/// Save slot info (for displaying in UI)
#[derive(Debug, Clone)]
pub struct SaveSlot {
    /// Slot identifier
    pub id: String,
    /// Save header (or None if empty)
    pub header: Option<SaveHeader>,
    /// File path
    pub path: PathBuf,
    /// Whether slot is occupied
    pub occupied: bool,
}

impl SaveSlot {
    /// Create an empty slot
    pub fn empty(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            header: None,
            path: path.into(),
            occupied: false,
        }
    }

    /// Create an occupied slot
    pub fn occupied(id: impl Into<String>, path: impl Into<PathBuf>, header: SaveHeader) -> Self {
        Self {
            id: id.into(),
            header: Some(header),
            path: path.into(),
            occupied: true,
        }
    }
}

/// Save manager
pub struct SaveManager {
    /// Base save directory
    save_dir: PathBuf,
    /// Save file format
    format: SaveFormat,
    /// Current save version
    version: u32,
    /// Cached slot info
    slots: HashMap<String, SaveSlot>,
    /// Maximum number of auto-saves
    max_autosaves: usize,
}

impl SaveManager {
    /// Create a new save manager
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            format: SaveFormat::Binary,
            version: SAVE_VERSION,
            slots: HashMap::new(),
            max_autosaves: 3,
        }
    }

    /// Set save format
    pub fn with_format(mut self, format: SaveFormat) -> Self {
        self.format = format;
        self
    }

    /// Set version
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Set max autosaves
    pub fn with_max_autosaves(mut self, max: usize) -> Self {
        self.max_autosaves = max.max(1);
        self
    }

    /// Ensure save directory exists
    pub fn ensure_dir(&self) -> Result<(), SaveError> {
        fs::create_dir_all(&self.save_dir)?;
        Ok(())
    }

    /// Get save file path for a slot
    fn slot_path(&self, slot: &str) -> PathBuf {
        self.save_dir
            .join(format!("{}.{}", slot, self.format.extension()))
    }

    /// Save to slot
    pub fn save(&mut self, slot: &str, data: &SaveData) -> Result<(), SaveError> {
        self.ensure_dir()?;

        let path = self.slot_path(slot);

        let bytes = match self.format {
            SaveFormat::Json => serde_json::to_vec_pretty(data)
                .map_err(|e| SaveError::Serialization(e.to_string()))?,
            SaveFormat::Binary => bincode::serialize(data)
                .map_err(|e| SaveError::Serialization(e.to_string()))?,
        };

        fs::write(&path, bytes)?;
        log::info!(
            "Saved '{}' to slot '{}' ({} items, {} containers)",
            data.header.name,
            slot,
            data.inventory.items.len(),
            data.containers.len()
        );

        // Update cache
        self.slots.insert(
            slot.to_string(),
            SaveSlot::occupied(slot, path, data.header.clone()),
        );

        Ok(())
    }

    /// Load from slot
    pub fn load(&self, slot: &str) -> Result<SaveData, SaveError> {
        let path = self.slot_path(slot);

        if !path.exists() {
            return Err(SaveError::SlotNotFound(slot.to_string()));
        }

        let bytes = fs::read(&path)?;
        if bytes.is_empty() {
            log::warn!("Save slot '{}' is empty", slot);
            return Err(SaveError::Corrupted);
        }

        let data: SaveData = match self.format {
            SaveFormat::Json => serde_json::from_slice(&bytes)
                .map_err(|e| SaveError::Deserialization(e.to_string()))?,
            SaveFormat::Binary => bincode::deserialize(&bytes)
                .map_err(|e| SaveError::Deserialization(e.to_string()))?,
        };

        // Check version
        if data.header.version > self.version {
            log::warn!(
                "Save slot '{}' has version {}, newer than {}",
                slot,
                data.header.version,
                self.version
            );
            return Err(SaveError::VersionMismatch(data.header.version, self.version));
        }

        Ok(data)
    }

    /// Delete a save slot
    pub fn delete(&mut self, slot: &str) -> Result<(), SaveError> {
        let path = self.slot_path(slot);

        if path.exists() {
            fs::remove_file(&path)?;
        }

        self.slots.remove(slot);
        Ok(())
    }

    /// Check if slot exists
    pub fn exists(&self, slot: &str) -> bool {
        self.slot_path(slot).exists()
    }

    /// Get slot info
    pub fn get_slot(&mut self, slot: &str) -> Result<SaveSlot, SaveError> {
        if let Some(cached) = self.slots.get(slot) {
            return Ok(cached.clone());
        }

        let path = self.slot_path(slot);

        if !path.exists() {
            return Ok(SaveSlot::empty(slot, path));
        }

        let data = self.load(slot)?;
        let slot_info = SaveSlot::occupied(slot, path, data.header);
        self.slots.insert(slot.to_string(), slot_info.clone());

        Ok(slot_info)
    }

    /// List all save slots, newest first
    pub fn list_slots(&mut self) -> Result<Vec<SaveSlot>, SaveError> {
        self.ensure_dir()?;

        let mut slots = Vec::new();
        let ext = self.format.extension();

        for entry in fs::read_dir(&self.save_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().map(|e| e == ext).unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    match self.get_slot(stem) {
                        Ok(slot) => slots.push(slot),
                        Err(e) => log::warn!("Skipping save slot '{}': {}", stem, e),
                    }
                }
            }
        }

        slots.sort_by(|a, b| {
            let ts_a = a.header.as_ref().map(|h| h.timestamp).unwrap_or(0);
            let ts_b = b.header.as_ref().map(|h| h.timestamp).unwrap_or(0);
            ts_b.cmp(&ts_a).then_with(|| a.id.cmp(&b.id))
        });

        Ok(slots)
    }

    /// Auto-save into the first empty or oldest autosave slot
    pub fn autosave(&mut self, data: &SaveData) -> Result<String, SaveError> {
        let mut autosaves = Vec::with_capacity(self.max_autosaves);
        for i in 0..self.max_autosaves {
            let slot = format!("autosave_{}", i);
            let timestamp = self
                .get_slot(&slot)?
                .header
                .map(|h| h.timestamp);
            autosaves.push((timestamp, slot));
        }

        // Empty slots (None) sort before any timestamp
        autosaves.sort();
        let slot = autosaves
            .into_iter()
            .next()
            .map(|(_, slot)| slot)
            .unwrap_or_else(|| "autosave_0".to_string());
        self.save(&slot, data)?;

        Ok(slot)
    }

    /// Quick save
    pub fn quicksave(&mut self, data: &SaveData) -> Result<(), SaveError> {
        self.save("quicksave", data)
    }

    /// Quick load
    pub fn quickload(&self) -> Result<SaveData, SaveError> {
        self.load("quicksave")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_inventory::prelude::*;
    use std::env::temp_dir;

    fn catalog() -> ItemCatalog {
        ItemCatalog::new(vec![
            ItemDefinition::new("ammo", "Ammo").stackable(20),
            ItemDefinition::new("lantern", "Lantern").with_size(1, 2).player_item(0).bindable(),
            ItemDefinition::new("photo", "Photo"),
        ])
        .unwrap()
    }

    fn inventory() -> Inventory {
        Inventory::new(InventoryConfig::new(4, 4).with_locked_rows(1), catalog()).unwrap()
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = temp_dir().join(format!("satchel_test_saves_{}", name));
        let _ = fs::remove_dir_all(&dir); // Clean up
        dir
    }

    fn sample() -> (Inventory, Container) {
        let mut inv = inventory();
        inv.expand(2, false);
        let lantern = inv.add_item("lantern", 1, CustomData::empty()).unwrap().created[0];
        inv.bind_shortcut(1, lantern).unwrap();
        inv.add_item("ammo", 33, CustomData::new(r#"{"caliber":12}"#)).unwrap();

        let mut drawer = Container::new("drawer", 2, 2);
        drawer
            .insert(inv.catalog(), "photo", 1, CustomData::new("torn"))
            .unwrap();
        (inv, drawer)
    }

    #[test]
    fn test_save_header() {
        let header = SaveHeader::new("My Save").with_level("mansion");

        assert_eq!(header.name, "My Save");
        assert_eq!(header.level, "mansion");
        assert_eq!(header.version, SAVE_VERSION);
    }

    #[test]
    fn test_round_trip_both_formats() {
        for format in [SaveFormat::Json, SaveFormat::Binary] {
            let save_dir = scratch_dir(&format!("{:?}", format));
            let mut manager = SaveManager::new(&save_dir).with_format(format);
            let (inv, drawer) = sample();

            let data = SaveData::capture("Hall", &inv, [&drawer]).with_level("hall");
            manager.save("slot1", &data).unwrap();
            assert!(manager.exists("slot1"));

            let loaded = manager.load("slot1").unwrap();
            assert_eq!(loaded, data);

            let mut restored = inventory();
            loaded.restore_inventory(&mut restored).unwrap();
            assert_eq!(restored.save(), inv.save());
            assert_eq!(restored.unlocked_slots(), 14);
            assert_eq!(restored.shortcut(1).map(|i| i.guid.as_str()), Some("lantern"));

            let containers = loaded.restore_containers(restored.catalog()).unwrap();
            assert_eq!(containers.get("drawer"), Some(&drawer));

            manager.delete("slot1").unwrap();
            assert!(!manager.exists("slot1"));
            let _ = fs::remove_dir_all(&save_dir); // Clean up
        }
    }

    #[test]
    fn test_missing_slot_and_version() {
        let save_dir = scratch_dir("version");
        let mut manager = SaveManager::new(&save_dir).with_format(SaveFormat::Json);
        assert!(matches!(manager.load("nope"), Err(SaveError::SlotNotFound(_))));

        let mut data = SaveData::new("Future", inventory().save());
        data.header.version = SAVE_VERSION + 1;
        manager.save("future", &data).unwrap();
        assert!(matches!(
            manager.load("future"),
            Err(SaveError::VersionMismatch(v, SAVE_VERSION)) if v == SAVE_VERSION + 1
        ));

        fs::write(save_dir.join("empty.json"), b"").unwrap();
        assert!(matches!(manager.load("empty"), Err(SaveError::Corrupted)));
        let _ = fs::remove_dir_all(&save_dir); // Clean up
    }

    #[test]
    fn test_invalid_records_rejected() {
        let (inv, _) = sample();
        let mut data = SaveData::new("Broken", inv.save());
        data.inventory.items[0].guid = "ghost".into();

        let mut target = inventory();
        assert!(matches!(
            data.restore_inventory(&mut target),
            Err(SaveError::Inventory(InventoryError::Decode(_)))
        ));
        assert_eq!(target.instances().count(), 0);
    }

    #[test]
    fn test_quicksave_and_listing() {
        let save_dir = scratch_dir("listing");
        let mut manager = SaveManager::new(&save_dir).with_max_autosaves(2);
        let data = SaveData::new("Quick", inventory().save());

        manager.quicksave(&data).unwrap();
        assert_eq!(manager.quickload().unwrap(), data);

        assert_eq!(manager.autosave(&data).unwrap(), "autosave_0");
        assert_eq!(manager.autosave(&data).unwrap(), "autosave_1");

        let ids: Vec<String> = manager
            .list_slots()
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&"quicksave".to_string()));
        let _ = fs::remove_dir_all(&save_dir); // Clean up
    }
}
