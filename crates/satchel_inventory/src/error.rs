//! Error types for the inventory

use crate::instance::InstanceId;
use thiserror::Error;

/// Result type for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Errors that can occur while manipulating an inventory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Item GUID is not present in the catalog
    #[error("Item '{0}' is not in the catalog")]
    UnknownItem(String),

    /// Catalog failed validation
    #[error("Invalid item catalog: {0}")]
    InvalidCatalog(String),

    /// No free region is large enough
    #[error("No space for {quantity}x '{guid}'")]
    CapacityExhausted { guid: String, quantity: u32 },

    /// Placement outside the grid, across a locked cell or over another item
    #[error("Invalid coordinates ({x}, {y})")]
    InvalidCoordinates { x: u16, y: u16 },

    /// Instance does not exist
    #[error("Instance {0} not found")]
    UnknownInstance(InstanceId),

    /// Requested quantity is zero
    #[error("Cannot add zero units of '{0}'")]
    ZeroQuantity(String),

    /// Neither item declares a rule for the other
    #[error("No combine rule between '{active}' and '{second}'")]
    NoCombineRule { active: String, second: String },

    /// Crafting needs more units than the instance carries
    #[error("'{guid}' needs {required} units, has {available}")]
    InsufficientQuantity {
        guid: String,
        required: u16,
        available: u16,
    },

    /// The item's flags forbid the action
    #[error("'{guid}' cannot be {action}")]
    NotPermitted { guid: String, action: &'static str },

    /// Operation needs an open container
    #[error("No container is open")]
    ContainerNotOpen,

    /// A container is already overlaid on the grid
    #[error("Container '{0}' is already open")]
    ContainerAlreadyOpen(String),

    /// Shortcut index out of range
    #[error("Shortcut slot {0} does not exist")]
    InvalidShortcut(usize),

    /// Configuration rejected
    #[error("Invalid inventory config: {0}")]
    InvalidConfig(String),

    /// Malformed persistence record
    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<toml::de::Error> for InventoryError {
    fn from(e: toml::de::Error) -> Self {
        InventoryError::InvalidConfig(e.to_string())
    }
}

impl From<serde_json::Error> for InventoryError {
    fn from(e: serde_json::Error) -> Self {
        InventoryError::Decode(e.to_string())
    }
}
