//! Thread-safe inventory handle

use crate::inventory::Inventory;
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle serializing access to one inventory.
///
/// Each `with` call holds the lock for the whole operation, so operations
/// never interleave. Calling `with` again from inside the closure
/// deadlocks; use `try_with` where re-entry is possible.
#[derive(Clone)]
pub struct SharedInventory {
    inner: Arc<Mutex<Inventory>>,
}

impl SharedInventory {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inventory)),
        }
    }

    /// Run `f` with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut Inventory) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Run `f` if no other operation is in progress
    pub fn try_with<R>(&self, f: impl FnOnce(&mut Inventory) -> R) -> Option<R> {
        let mut guard = self.inner.try_lock()?;
        Some(f(&mut guard))
    }

    /// Recover the inventory if this is the last handle
    pub fn into_inner(self) -> Result<Inventory, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<Inventory> for SharedInventory {
    fn from(inventory: Inventory) -> Self {
        Self::new(inventory)
    }
}
