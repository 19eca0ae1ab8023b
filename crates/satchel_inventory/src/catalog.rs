//! Item catalog

use crate::error::{InventoryError, Result};
use crate::item::ItemDefinition;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Source of item definitions, read once at startup
pub trait CatalogProvider {
    fn load_catalog(&self) -> Result<ItemCatalog>;
}

/// Read-only map of item GUID to definition
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: BTreeMap<String, ItemDefinition>,
}

#[derive(Deserialize)]
struct CatalogJson {
    items: Vec<ItemDefinition>,
}

impl ItemCatalog {
    /// Build and validate a catalog.
    ///
    /// Every combine rule must reference items that exist; a catalog that
    /// fails here is a configuration error and should abort startup.
    pub fn new(definitions: impl IntoIterator<Item = ItemDefinition>) -> Result<Self> {
        let mut items = BTreeMap::new();
        for def in definitions {
            if def.guid.is_empty() {
                return Err(InventoryError::InvalidCatalog("item with empty GUID".into()));
            }
            if def.width == 0 || def.height == 0 {
                return Err(InventoryError::InvalidCatalog(format!(
                    "'{}' has zero size {}x{}",
                    def.guid, def.width, def.height
                )));
            }
            if let Some(previous) = items.insert(def.guid.clone(), def) {
                return Err(InventoryError::InvalidCatalog(format!(
                    "duplicate GUID '{}'",
                    previous.guid
                )));
            }
        }

        let catalog = Self { items };
        catalog.check_references()?;
        log::info!("Loaded item catalog with {} definitions", catalog.len());
        Ok(catalog)
    }

    fn check_references(&self) -> Result<()> {
        for def in self.items.values() {
            for rule in &def.combine_rules {
                if !self.items.contains_key(&rule.partner) {
                    return Err(InventoryError::UnknownItem(rule.partner.clone()));
                }
                if let Some(result) = &rule.result {
                    if !self.items.contains_key(result) {
                        return Err(InventoryError::UnknownItem(result.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    /// Parse `{ "items": [...] }`
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: CatalogJson = serde_json::from_str(content)
            .map_err(|e| InventoryError::InvalidCatalog(e.to_string()))?;
        Self::new(raw.items)
    }

    /// Look up a definition
    pub fn get(&self, guid: &str) -> Option<&ItemDefinition> {
        self.items.get(guid)
    }

    /// Look up a definition, failing on unknown GUIDs
    pub fn require(&self, guid: &str) -> Result<&ItemDefinition> {
        self.items
            .get(guid)
            .ok_or_else(|| InventoryError::UnknownItem(guid.to_string()))
    }

    pub fn contains(&self, guid: &str) -> bool {
        self.items.contains_key(guid)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Definitions in GUID order
    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.values()
    }
}

/// Catalog stored as a JSON file
#[derive(Debug, Clone)]
pub struct JsonCatalogFile {
    path: PathBuf,
}

impl JsonCatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogProvider for JsonCatalogFile {
    fn load_catalog(&self) -> Result<ItemCatalog> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            InventoryError::InvalidCatalog(format!("{}: {}", self.path.display(), e))
        })?;
        ItemCatalog::from_json_str(&content)
    }
}
