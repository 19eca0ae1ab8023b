//! Inventory configuration

use crate::error::{InventoryError, Result};
use serde::{Deserialize, Serialize};

/// Number of quick-access shortcut slots
pub const SHORTCUT_SLOTS: usize = 4;

/// Main grid configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Grid rows
    pub rows: u16,

    /// Grid columns
    pub columns: u16,

    /// Rows at the bottom of the grid that start locked and are
    /// opened up by expansion
    pub locked_rows: u16,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            rows: 5,
            columns: 5,
            locked_rows: 0,
        }
    }
}

impl InventoryConfig {
    /// Create a configuration with the given size
    pub fn new(rows: u16, columns: u16) -> Self {
        Self {
            rows,
            columns,
            ..Default::default()
        }
    }

    /// Set grid size
    pub fn with_size(mut self, rows: u16, columns: u16) -> Self {
        self.rows = rows;
        self.columns = columns;
        self
    }

    /// Set number of initially locked rows
    pub fn with_locked_rows(mut self, locked_rows: u16) -> Self {
        self.locked_rows = locked_rows;
        self
    }

    /// Parse from TOML and validate
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: InventoryConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject grids that cannot hold anything
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.columns == 0 {
            return Err(InventoryError::InvalidConfig(format!(
                "grid must be at least 1x1, got {}x{}",
                self.columns, self.rows
            )));
        }
        if self.locked_rows > self.rows {
            return Err(InventoryError::InvalidConfig(format!(
                "{} locked rows exceed {} rows",
                self.locked_rows, self.rows
            )));
        }
        Ok(())
    }

    /// Cells unlocked before any expansion
    pub fn initial_unlocked_slots(&self) -> usize {
        (self.rows - self.locked_rows) as usize * self.columns as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InventoryConfig::default();
        assert_eq!(config.rows, 5);
        assert_eq!(config.columns, 5);
        assert!(config.validate().is_ok());
        assert_eq!(config.initial_unlocked_slots(), 25);
    }

    #[test]
    fn test_from_toml() {
        let config = InventoryConfig::from_toml_str(
            r#"
            rows = 6
            columns = 4
            locked_rows = 2
            "#,
        )
        .unwrap();

        assert_eq!(config, InventoryConfig::new(6, 4).with_locked_rows(2));
        assert_eq!(config.initial_unlocked_slots(), 16);
    }

    #[test]
    fn test_toml_defaults_missing_fields() {
        let config = InventoryConfig::from_toml_str("columns = 8").unwrap();
        assert_eq!(config.rows, 5);
        assert_eq!(config.columns, 8);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            InventoryConfig::new(0, 3).validate(),
            Err(InventoryError::InvalidConfig(_))
        ));
        assert!(InventoryConfig::new(2, 2).with_locked_rows(3).validate().is_err());
        assert!(InventoryConfig::from_toml_str("rows = \"x\"").is_err());
    }
}
