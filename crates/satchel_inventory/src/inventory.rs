//! Inventory core

use crate::catalog::ItemCatalog;
use crate::config::InventoryConfig;
use crate::container::{Container, ContainerItem};
use crate::custom_data::CustomData;
use crate::error::{InventoryError, Result};
use crate::events::{EventDispatcher, InventoryEvent, SubscriberId};
use crate::grid::{GridPosition, Region, SlotGrid};
use crate::hooks::{NoPlayerHooks, PlayerHooks};
use crate::instance::{InstanceId, InstanceIdAllocator, ItemInstance, Owner};
use crate::item::{ItemDefinition, Orientation, UsableType};
use crate::shortcut::Shortcuts;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Occupant written into scratch grids while planning placements
const PLAN_PLACEHOLDER: InstanceId = InstanceId::from_raw(u64::MAX);

/// Instances touched by a successful add
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOutcome {
    /// Existing stacks that were topped up, fullest first
    pub stacked: Vec<InstanceId>,
    /// New instances, in placement order
    pub created: Vec<InstanceId>,
}

impl AddOutcome {
    /// Last instance touched
    pub fn last(&self) -> Option<InstanceId> {
        self.created.last().or(self.stacked.last()).copied()
    }
}

/// Result of using an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseOutcome {
    /// Player item equipped
    Equipped(usize),
    /// Health restored and one unit consumed
    Healed(u32),
    /// Custom handler invoked and one unit consumed
    CustomEvent,
    /// Player refused (e.g. health already full); nothing consumed
    Refused,
}

/// Item removed from the inventory into the world
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedItem {
    pub guid: String,
    pub quantity: u16,
    pub custom_data: CustomData,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StackTopUp {
    pub instance: InstanceId,
    pub amount: u16,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Placement {
    pub position: GridPosition,
    pub orientation: Orientation,
    pub quantity: u16,
}

/// Fully placed add, computed before anything is mutated
#[derive(Debug, Clone)]
pub(crate) struct AddPlan {
    pub guid: String,
    pub custom_data: CustomData,
    pub top_ups: Vec<StackTopUp>,
    pub placements: Vec<Placement>,
}

/// Container overlaid on the grid
pub(crate) struct OpenContainer {
    pub container: Container,
    pub items: BTreeMap<InstanceId, ItemInstance>,
}

/// Validate and occupy the footprint of a new instance
pub(crate) fn place_on(
    grid: &mut SlotGrid,
    def: &ItemDefinition,
    id: InstanceId,
    quantity: u16,
    orientation: Orientation,
    position: GridPosition,
    custom_data: CustomData,
    owner: Owner,
) -> Result<ItemInstance> {
    let (w, h) = def.footprint(orientation);
    if !grid.region_fits(position, w, h, None) {
        return Err(InventoryError::InvalidCoordinates {
            x: position.x,
            y: position.y,
        });
    }
    grid.occupy(position, w, h, id);
    Ok(ItemInstance::new(
        id,
        def,
        quantity,
        orientation,
        position,
        custom_data,
        owner,
    ))
}

/// Container-local copy of an overlaid instance
fn to_container_item(instance: &ItemInstance, offset: u16) -> ContainerItem {
    ContainerItem {
        guid: instance.guid.clone(),
        quantity: instance.quantity,
        orientation: instance.orientation,
        position: GridPosition::new(instance.position.x - offset, instance.position.y),
        custom_data: instance.custom_data.clone(),
    }
}

/// Grid inventory with stacking, an optional open container and
/// shortcut bindings
pub struct Inventory {
    pub(crate) config: InventoryConfig,
    pub(crate) catalog: ItemCatalog,
    pub(crate) grid: SlotGrid,
    /// Carried instances, keyed in placement order
    pub(crate) carrying: BTreeMap<InstanceId, ItemInstance>,
    pub(crate) open: Option<OpenContainer>,
    pub(crate) shortcuts: Shortcuts,
    pub(crate) ids: InstanceIdAllocator,
    pub(crate) hooks: Box<dyn PlayerHooks>,
    events: EventDispatcher,
}

impl fmt::Debug for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inventory")
            .field("config", &self.config)
            .field("carrying", &self.carrying.len())
            .field("container", &self.open.as_ref().map(|o| o.container.name()))
            .field("listeners", &self.events.len())
            .finish()
    }
}

impl Inventory {
    /// Create an empty inventory
    pub fn new(config: InventoryConfig, catalog: ItemCatalog) -> Result<Self> {
        config.validate()?;
        let grid = SlotGrid::new(config.rows, config.columns, config.locked_rows);

        Ok(Self {
            config,
            catalog,
            grid,
            carrying: BTreeMap::new(),
            open: None,
            shortcuts: Shortcuts::new(),
            ids: InstanceIdAllocator::new(),
            hooks: Box::new(NoPlayerHooks),
            events: EventDispatcher::default(),
        })
    }

    /// Attach player hooks
    pub fn with_hooks(mut self, hooks: impl PlayerHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn set_hooks(&mut self, hooks: Box<dyn PlayerHooks>) {
        self.hooks = hooks;
    }

    /// Register an event listener
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriberId
    where
        F: FnMut(&InventoryEvent) + Send + 'static,
    {
        self.events.subscribe(Box::new(handler))
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.events.unsubscribe(id)
    }

    pub(crate) fn emit(&mut self, event: InventoryEvent) {
        self.events.emit(event);
    }

    /// Fire `InventoryChanged` with the current carried total
    pub(crate) fn emit_total(&mut self, guid: &str) {
        let total = self.count(guid);
        self.events.emit(InventoryEvent::InventoryChanged {
            guid: guid.to_string(),
            total,
        });
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    pub fn shortcuts(&self) -> &Shortcuts {
        &self.shortcuts
    }

    pub fn hooks(&self) -> &dyn PlayerHooks {
        self.hooks.as_ref()
    }

    /// Instance by ID, carried or in the open container
    pub fn instance(&self, id: InstanceId) -> Option<&ItemInstance> {
        self.carrying
            .get(&id)
            .or_else(|| self.open.as_ref()?.items.get(&id))
    }

    pub(crate) fn instance_mut(&mut self, id: InstanceId) -> Option<&mut ItemInstance> {
        if self.carrying.contains_key(&id) {
            return self.carrying.get_mut(&id);
        }
        self.open.as_mut()?.items.get_mut(&id)
    }

    pub(crate) fn require(&self, id: InstanceId) -> Result<&ItemInstance> {
        self.instance(id).ok_or(InventoryError::UnknownInstance(id))
    }

    /// Carried instances in placement order
    pub fn instances(&self) -> impl Iterator<Item = &ItemInstance> {
        self.carrying.values()
    }

    /// Instances of the open container
    pub fn container_instances(&self) -> impl Iterator<Item = &ItemInstance> {
        self.open.iter().flat_map(|o| o.items.values())
    }

    /// Instance covering a cell
    pub fn instance_at(&self, position: GridPosition) -> Option<&ItemInstance> {
        self.grid.occupant(position).and_then(|id| self.instance(id))
    }

    /// Total carried quantity of an item
    pub fn count(&self, guid: &str) -> u32 {
        self.carrying
            .values()
            .filter(|i| i.guid == guid)
            .map(|i| i.quantity as u32)
            .sum()
    }

    pub fn has_item(&self, guid: &str) -> bool {
        self.carrying.values().any(|i| i.guid == guid)
    }

    /// Free inventory cells
    pub fn free_cells(&self) -> usize {
        self.grid.free_cells(Region::Inventory)
    }

    /// Container currently overlaid on the grid
    pub fn current_container(&self) -> Option<&Container> {
        self.open.as_ref().map(|o| &o.container)
    }

    pub fn is_container_open(&self) -> bool {
        self.open.is_some()
    }

    // ------------------------------------------------------------------
    // Adding
    // ------------------------------------------------------------------

    /// Plan an add against `grid`.
    ///
    /// Existing stacks with matching custom data are topped up closest to
    /// full first; the remainder is split into new instances placed in
    /// inventory columns. `pending` lists units about to be removed from
    /// existing instances, which are planned as already gone.
    pub(crate) fn plan_add(
        &self,
        grid: &SlotGrid,
        guid: &str,
        quantity: u32,
        custom_data: CustomData,
        pending: &BTreeMap<InstanceId, u16>,
    ) -> Result<AddPlan> {
        let def = self.catalog.require(guid)?;
        if quantity == 0 {
            return Err(InventoryError::ZeroQuantity(guid.to_string()));
        }
        let limit = def.stack_limit();
        let mut remaining = quantity;
        let mut top_ups = Vec::new();

        if def.flags.stackable {
            let mut stacks: Vec<(u16, InstanceId)> = self
                .carrying
                .values()
                .filter(|i| i.guid == guid && i.custom_data == custom_data)
                .filter_map(|i| {
                    let removed = pending.get(&i.id).copied().unwrap_or(0);
                    let quantity = i.quantity.saturating_sub(removed);
                    (quantity > 0 && quantity < limit).then_some((quantity, i.id))
                })
                .collect();
            stacks.sort_by_key(|&(quantity, id)| (limit - quantity, id));

            for (quantity, id) in stacks {
                if remaining == 0 {
                    break;
                }
                let amount = ((limit - quantity) as u32).min(remaining) as u16;
                top_ups.push(StackTopUp {
                    instance: id,
                    amount,
                });
                remaining -= amount as u32;
            }
        }

        let mut scratch = grid.clone();
        let mut placements = Vec::new();
        while remaining > 0 {
            let Some((position, orientation)) =
                scratch.find_free_space(def.width, def.height, Some(Region::Inventory))
            else {
                return Err(InventoryError::CapacityExhausted {
                    guid: guid.to_string(),
                    quantity: remaining,
                });
            };
            let amount = remaining.min(limit as u32) as u16;
            let (w, h) = def.footprint(orientation);
            scratch.occupy(position, w, h, PLAN_PLACEHOLDER);
            placements.push(Placement {
                position,
                orientation,
                quantity: amount,
            });
            remaining -= amount as u32;
        }

        Ok(AddPlan {
            guid: guid.to_string(),
            custom_data,
            top_ups,
            placements,
        })
    }

    /// Apply a plan computed against the current grid
    pub(crate) fn commit_add(&mut self, plan: AddPlan) -> Result<AddOutcome> {
        let def = self.catalog.require(&plan.guid)?;
        let mut outcome = AddOutcome::default();

        for top_up in plan.top_ups {
            if let Some(instance) = self.carrying.get_mut(&top_up.instance) {
                let old_quantity = instance.quantity;
                instance.quantity = old_quantity + top_up.amount;
                log::debug!(
                    "Stacked {} onto '{}' {} ({} -> {})",
                    top_up.amount,
                    plan.guid,
                    top_up.instance,
                    old_quantity,
                    instance.quantity
                );
                self.events.emit(InventoryEvent::StackChanged {
                    instance: top_up.instance,
                    guid: plan.guid.clone(),
                    old_quantity,
                    new_quantity: instance.quantity,
                });
                outcome.stacked.push(top_up.instance);
            }
        }

        for placement in plan.placements {
            let id = self.ids.next();
            let instance = place_on(
                &mut self.grid,
                def,
                id,
                placement.quantity,
                placement.orientation,
                placement.position,
                plan.custom_data.clone(),
                Owner::Inventory,
            )?;
            log::debug!(
                "Placed {}x '{}' {} at ({}, {}) {:?}",
                placement.quantity,
                plan.guid,
                id,
                placement.position.x,
                placement.position.y,
                placement.orientation
            );
            self.events.emit(InventoryEvent::ItemAdded {
                instance: id,
                guid: plan.guid.clone(),
                quantity: placement.quantity,
                position: placement.position,
            });
            self.carrying.insert(id, instance);
            outcome.created.push(id);
        }

        self.emit_total(&plan.guid);
        Ok(outcome)
    }

    /// Add `quantity` units of an item.
    ///
    /// Either every unit is placed or nothing changes and
    /// `CapacityExhausted` is returned.
    pub fn add_item(
        &mut self,
        guid: &str,
        quantity: u32,
        custom_data: impl Into<CustomData>,
    ) -> Result<AddOutcome> {
        let plan = match self.plan_add(&self.grid, guid, quantity, custom_data.into(), &BTreeMap::new()) {
            Ok(plan) => plan,
            Err(e) => {
                log::warn!("Cannot add {}x '{}': {}", quantity, guid, e);
                return Err(e);
            }
        };
        self.commit_add(plan)
    }

    /// Whether `add_item` would succeed
    pub fn can_add(&self, guid: &str, quantity: u32) -> bool {
        self.plan_add(&self.grid, guid, quantity, CustomData::empty(), &BTreeMap::new())
            .is_ok()
    }

    /// Create an instance at an explicit position without searching.
    ///
    /// Positions in container columns store the item in the open
    /// container. The quantity is clamped to the item's stack limit.
    pub fn create_item(
        &mut self,
        guid: &str,
        quantity: u16,
        orientation: Orientation,
        position: GridPosition,
        custom_data: impl Into<CustomData>,
    ) -> Result<InstanceId> {
        let def = self.catalog.require(guid)?;
        if quantity == 0 {
            return Err(InventoryError::ZeroQuantity(guid.to_string()));
        }
        let quantity = quantity.min(def.stack_limit());
        let owner = match self.grid.region_of(position.x) {
            Region::Inventory => Owner::Inventory,
            Region::Container if self.open.is_some() => Owner::Container(Container::new_store_guid()),
            Region::Container => return Err(InventoryError::ContainerNotOpen),
        };

        let id = self.ids.next();
        let instance = place_on(
            &mut self.grid,
            def,
            id,
            quantity,
            orientation,
            position,
            custom_data.into(),
            owner,
        )?;

        self.emit(InventoryEvent::ItemAdded {
            instance: id,
            guid: guid.to_string(),
            quantity,
            position,
        });

        let offset = self.grid.inventory_columns();
        if let Owner::Container(store_guid) = instance.owner.clone() {
            if let Some(open) = self.open.as_mut() {
                open.container
                    .store(store_guid, to_container_item(&instance, offset));
                open.items.insert(id, instance);
            }
        } else {
            self.carrying.insert(id, instance);
            self.emit_total(guid);
        }
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Removing
    // ------------------------------------------------------------------

    /// Destroy an instance, freeing its cells and any shortcut binding.
    /// Returns the quantity it held.
    pub(crate) fn destroy(&mut self, id: InstanceId) -> Result<u16> {
        let instance = match self.carrying.remove(&id) {
            Some(instance) => instance,
            None => self
                .open
                .as_mut()
                .and_then(|o| o.items.remove(&id))
                .ok_or(InventoryError::UnknownInstance(id))?,
        };

        self.grid.vacate(id);
        if let Some(slot) = self.shortcuts.unbind_if_bound(id) {
            self.emit(InventoryEvent::ShortcutUnbound { slot, instance: id });
        }
        if let (Owner::Container(store_guid), Some(open)) = (&instance.owner, self.open.as_mut()) {
            open.container.remove(store_guid);
        }

        log::debug!("Removed {}x '{}' {}", instance.quantity, instance.guid, id);
        self.emit(InventoryEvent::ItemRemoved {
            instance: id,
            guid: instance.guid.clone(),
            quantity: instance.quantity,
        });
        if !instance.is_in_container() {
            self.emit_total(&instance.guid);
        }
        Ok(instance.quantity)
    }

    /// Write an overlaid instance back into its container
    fn sync_container_item(&mut self, id: InstanceId) {
        let offset = self.grid.inventory_columns();
        if let Some(open) = self.open.as_mut() {
            if let Some(instance) = open.items.get(&id) {
                if let Owner::Container(store_guid) = &instance.owner {
                    open.container
                        .store(store_guid.clone(), to_container_item(instance, offset));
                }
            }
        }
    }

    /// Change an instance's quantity in place (never to zero)
    fn change_quantity(&mut self, id: InstanceId, new_quantity: u16) -> Result<()> {
        let instance = self
            .instance_mut(id)
            .ok_or(InventoryError::UnknownInstance(id))?;
        let old_quantity = instance.quantity;
        if old_quantity == new_quantity {
            return Ok(());
        }
        instance.quantity = new_quantity;
        let guid = instance.guid.clone();
        let in_container = instance.is_in_container();

        self.emit(InventoryEvent::StackChanged {
            instance: id,
            guid: guid.clone(),
            old_quantity,
            new_quantity,
        });
        if in_container {
            self.sync_container_item(id);
        } else {
            self.emit_total(&guid);
        }
        Ok(())
    }

    /// Take `amount` units from an instance, destroying it at zero.
    /// Returns the remaining quantity.
    pub(crate) fn decrement(&mut self, id: InstanceId, amount: u16) -> Result<u16> {
        let quantity = self.require(id)?.quantity;
        if amount >= quantity {
            self.destroy(id)?;
            return Ok(0);
        }
        self.change_quantity(id, quantity - amount)?;
        Ok(quantity - amount)
    }

    /// Remove the first carried instance of an item entirely.
    /// Returns the quantity removed (0 if none was carried).
    pub fn remove_item(&mut self, guid: &str) -> u16 {
        let Some(id) = self.carrying.values().find(|i| i.guid == guid).map(|i| i.id) else {
            return 0;
        };
        self.destroy(id).unwrap_or(0)
    }

    /// Remove an instance entirely, returning its quantity
    pub fn remove_instance(&mut self, id: InstanceId) -> Result<u16> {
        self.destroy(id)
    }

    /// Remove `amount` units from an instance, returning what is left
    pub fn remove_quantity(&mut self, id: InstanceId, amount: u16) -> Result<u16> {
        self.decrement(id, amount)
    }

    /// Remove `amount` units of an item across all carried instances,
    /// emptying the smallest stacks first. Returns the amount removed.
    pub fn remove_quantity_many(&mut self, guid: &str, amount: u32) -> u32 {
        let mut stacks: Vec<(u16, InstanceId)> = self
            .carrying
            .values()
            .filter(|i| i.guid == guid)
            .map(|i| (i.quantity, i.id))
            .collect();
        stacks.sort();

        let mut remaining = amount;
        for (quantity, id) in stacks {
            if remaining == 0 {
                break;
            }
            let take = (quantity as u32).min(remaining) as u16;
            if self.decrement(id, take).is_ok() {
                remaining -= take as u32;
            }
        }
        amount - remaining
    }

    /// Set an instance's quantity, clamped to its stack limit.
    /// Zero destroys the instance.
    pub fn set_quantity(&mut self, id: InstanceId, quantity: u16) -> Result<()> {
        if quantity == 0 {
            self.destroy(id)?;
            return Ok(());
        }
        let guid = self.require(id)?.guid.clone();
        let limit = self.catalog.require(&guid)?.stack_limit();
        self.change_quantity(id, quantity.min(limit))
    }

    // ------------------------------------------------------------------
    // Moving
    // ------------------------------------------------------------------

    /// Move an instance so its top-left cell lands on `to`.
    ///
    /// Moving across the inventory/container boundary transfers ownership:
    /// items entering the container lose their shortcut binding and, if
    /// they are the equipped player item, are put away first.
    pub fn move_item(&mut self, id: InstanceId, to: GridPosition, orientation: Orientation) -> Result<()> {
        let instance = self.require(id)?;
        let from = instance.position;
        let guid = instance.guid.clone();
        let (w, h) = orientation.apply(instance.width, instance.height);

        if !self.grid.region_fits(to, w, h, Some(id)) {
            log::warn!("Rejected move of '{}' {} to ({}, {})", guid, id, to.x, to.y);
            return Err(InventoryError::InvalidCoordinates { x: to.x, y: to.y });
        }

        let from_region = self.grid.region_of(from.x);
        let to_region = self.grid.region_of(to.x);
        let offset = self.grid.inventory_columns();
        if (from_region == Region::Container || to_region == Region::Container) && self.open.is_none() {
            return Err(InventoryError::ContainerNotOpen);
        }

        self.grid.vacate(id);
        self.grid.occupy(to, w, h, id);

        match (from_region, to_region) {
            (Region::Inventory, Region::Inventory) => {
                if let Some(instance) = self.carrying.get_mut(&id) {
                    instance.position = to;
                    instance.orientation = orientation;
                }
            }
            (Region::Container, Region::Container) => {
                if let Some(instance) = self.open.as_mut().and_then(|o| o.items.get_mut(&id)) {
                    instance.position = to;
                    instance.orientation = orientation;
                }
                self.sync_container_item(id);
            }
            (Region::Inventory, Region::Container) => {
                let mut instance = self
                    .carrying
                    .remove(&id)
                    .ok_or(InventoryError::UnknownInstance(id))?;
                instance.position = to;
                instance.orientation = orientation;
                let store_guid = Container::new_store_guid();
                instance.owner = Owner::Container(store_guid.clone());

                if let Some(slot) = self.shortcuts.unbind_if_bound(id) {
                    self.emit(InventoryEvent::ShortcutUnbound { slot, instance: id });
                }
                if let Some(index) = self.catalog.get(&guid).and_then(ItemDefinition::equips) {
                    if self.hooks.is_equipped(index) {
                        log::debug!("Deselecting player item {} stored in container", index);
                        self.hooks.deselect();
                    }
                }

                if let Some(open) = self.open.as_mut() {
                    open.container
                        .store(store_guid, to_container_item(&instance, offset));
                    open.items.insert(id, instance);
                }
            }
            (Region::Container, Region::Inventory) => {
                let open = self.open.as_mut().ok_or(InventoryError::ContainerNotOpen)?;
                let mut instance = open
                    .items
                    .remove(&id)
                    .ok_or(InventoryError::UnknownInstance(id))?;
                if let Owner::Container(store_guid) = &instance.owner {
                    open.container.remove(store_guid);
                }
                instance.position = to;
                instance.orientation = orientation;
                instance.owner = Owner::Inventory;
                self.carrying.insert(id, instance);
            }
        }

        log::debug!(
            "Moved '{}' {} from ({}, {}) to ({}, {})",
            guid,
            id,
            from.x,
            from.y,
            to.x,
            to.y
        );
        self.emit(InventoryEvent::ItemMoved {
            instance: id,
            from,
            to,
            into_container: to_region == Region::Container,
        });
        if from_region != to_region {
            self.emit_total(&guid);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expansion
    // ------------------------------------------------------------------

    /// Unlock `count` slots, or `count` rows when `by_rows` is set.
    /// Returns the number of slots unlocked.
    pub fn expand(&mut self, count: usize, by_rows: bool) -> usize {
        let slots = if by_rows {
            count * self.grid.inventory_columns() as usize
        } else {
            count
        };
        let unlocked = self.grid.expand(slots);
        if unlocked > 0 {
            log::info!("Expanded inventory by {} slots", unlocked);
            self.emit(InventoryEvent::Expanded { unlocked });
        }
        unlocked
    }

    pub fn unlocked_slots(&self) -> usize {
        self.grid.unlocked_slots()
    }

    // ------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------

    /// Overlay a container's columns to the right of the inventory.
    ///
    /// The inventory holds the container until `close_container`.
    pub fn open_container(&mut self, container: Container) -> Result<()> {
        if let Some(open) = &self.open {
            return Err(InventoryError::ContainerAlreadyOpen(open.container.name().to_string()));
        }

        let offset = self.grid.inventory_columns();
        let mut grid = self.grid.clone();
        grid.set_overlay(container.columns(), container.rows())?;

        let mut items = BTreeMap::new();
        let mut ids = self.ids.clone();
        for (store_guid, stored) in container.items() {
            let def = self.catalog.require(&stored.guid)?;
            if stored.quantity == 0 || stored.quantity > def.stack_limit() {
                return Err(InventoryError::Decode(format!(
                    "container '{}' item '{}' holds {} units",
                    container.name(),
                    store_guid,
                    stored.quantity
                )));
            }
            let position =
                GridPosition::new(stored.position.x.saturating_add(offset), stored.position.y);
            let instance = place_on(
                &mut grid,
                def,
                ids.next(),
                stored.quantity,
                stored.orientation,
                position,
                stored.custom_data.clone(),
                Owner::Container(store_guid.clone()),
            )
            .map_err(|_| {
                InventoryError::Decode(format!(
                    "container '{}' item '{}' does not fit",
                    container.name(),
                    store_guid
                ))
            })?;
            // A container item in inventory columns would straddle the overlay
            if grid.region_of(instance.position.x) != Region::Container {
                return Err(InventoryError::Decode(format!(
                    "container '{}' item '{}' is outside the container",
                    container.name(),
                    store_guid
                )));
            }
            items.insert(instance.id, instance);
        }

        let name = container.name().to_string();
        log::debug!("Opened container '{}' with {} items", name, items.len());
        self.grid = grid;
        self.ids = ids;
        self.open = Some(OpenContainer { container, items });
        self.emit(InventoryEvent::ContainerOpened { name });
        Ok(())
    }

    /// Remove the overlay and hand the container back with its contents
    pub fn close_container(&mut self) -> Option<Container> {
        let open = self.open.take()?;
        for id in open.items.keys() {
            self.grid.vacate(*id);
        }
        self.grid.clear_overlay();

        let name = open.container.name().to_string();
        log::debug!("Closed container '{}'", name);
        self.emit(InventoryEvent::ContainerClosed { name });
        Some(open.container)
    }

    // ------------------------------------------------------------------
    // Shortcuts
    // ------------------------------------------------------------------

    /// Bind a carried instance to a shortcut slot
    pub fn bind_shortcut(&mut self, index: usize, id: InstanceId) -> Result<()> {
        let instance = self
            .carrying
            .get(&id)
            .ok_or(InventoryError::UnknownInstance(id))?;
        let def = self.catalog.require(&instance.guid)?;
        if !def.flags.bind_shortcut {
            return Err(InventoryError::NotPermitted {
                guid: def.guid.clone(),
                action: "bound to a shortcut",
            });
        }

        let previous_slot = self.shortcuts.slot_of(id);
        let replaced = self.shortcuts.bind(index, id)?;
        if let Some(slot) = previous_slot.filter(|s| *s != index) {
            self.emit(InventoryEvent::ShortcutUnbound { slot, instance: id });
        }
        if let Some(old) = replaced.filter(|old| *old != id) {
            self.emit(InventoryEvent::ShortcutUnbound { slot: index, instance: old });
        }
        self.emit(InventoryEvent::ShortcutBound { slot: index, instance: id });
        Ok(())
    }

    /// Clear the shortcut bound to an instance
    pub fn unbind_shortcut(&mut self, id: InstanceId) -> Option<usize> {
        let slot = self.shortcuts.unbind_if_bound(id)?;
        self.emit(InventoryEvent::ShortcutUnbound { slot, instance: id });
        Some(slot)
    }

    /// Instance bound to a shortcut slot
    pub fn shortcut(&self, index: usize) -> Option<&ItemInstance> {
        self.shortcuts.get(index).and_then(|id| self.carrying.get(&id))
    }

    // ------------------------------------------------------------------
    // Use, drop, discard
    // ------------------------------------------------------------------

    fn carried_definition(&self, id: InstanceId) -> Result<&ItemDefinition> {
        let instance = self
            .carrying
            .get(&id)
            .ok_or(InventoryError::UnknownInstance(id))?;
        self.catalog.require(&instance.guid)
    }

    /// Use a carried item
    pub fn use_item(&mut self, id: InstanceId) -> Result<UseOutcome> {
        let def = self.carried_definition(id)?;
        let not_usable = InventoryError::NotPermitted {
            guid: def.guid.clone(),
            action: "used",
        };
        if !def.flags.usable {
            return Err(not_usable);
        }
        let (usable_type, player_item, points) =
            (def.usable_type, def.player_item_index, def.health_points);

        match (usable_type, player_item) {
            (UsableType::PlayerItem, Some(index)) => {
                self.hooks.equip(index);
                Ok(UseOutcome::Equipped(index))
            }
            (UsableType::HealthItem, _) => {
                if self.hooks.heal(points) {
                    self.decrement(id, 1)?;
                    Ok(UseOutcome::Healed(points))
                } else {
                    Ok(UseOutcome::Refused)
                }
            }
            (UsableType::CustomEvent, _) => {
                if let Some(instance) = self.carrying.get(&id) {
                    self.hooks.custom_use(instance);
                }
                self.decrement(id, 1)?;
                Ok(UseOutcome::CustomEvent)
            }
            _ => Err(not_usable),
        }
    }

    /// Destroy a carried instance the player threw away
    pub fn discard_item(&mut self, id: InstanceId) -> Result<u16> {
        let def = self.carried_definition(id)?;
        if !def.flags.discardable {
            return Err(InventoryError::NotPermitted {
                guid: def.guid.clone(),
                action: "discarded",
            });
        }
        self.destroy(id)
    }

    /// Remove a carried instance so the world layer can spawn it
    pub fn drop_item(&mut self, id: InstanceId) -> Result<DroppedItem> {
        let def = self.carried_definition(id)?;
        if !def.flags.droppable {
            return Err(InventoryError::NotPermitted {
                guid: def.guid.clone(),
                action: "dropped",
            });
        }
        let custom_data = self.require(id)?.custom_data.clone();
        let guid = def.guid.clone();
        let quantity = self.destroy(id)?;
        Ok(DroppedItem {
            guid,
            quantity,
            custom_data,
        })
    }

    // ------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------

    /// Check that no cells overlap and that grid occupancy and the owning
    /// collections agree exactly
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(InventoryError::Decode(msg));
        let mut expected = BTreeSet::new();

        let owned = self
            .carrying
            .values()
            .map(|i| (i, Region::Inventory))
            .chain(self.container_instances().map(|i| (i, Region::Container)));

        for (instance, region) in owned {
            if instance.is_in_container() != (region == Region::Container) {
                return fail(format!("{} has the wrong owner", instance.id));
            }
            let limit = match self.catalog.get(&instance.guid) {
                Some(def) => def.stack_limit(),
                None => return fail(format!("{} has unknown item '{}'", instance.id, instance.guid)),
            };
            if instance.quantity == 0 || instance.quantity > limit {
                return fail(format!("{} holds {} units", instance.id, instance.quantity));
            }
            for cell in instance.cells() {
                if self.grid.occupant(cell) != Some(instance.id) {
                    return fail(format!("{} does not own ({}, {})", instance.id, cell.x, cell.y));
                }
                if self.grid.region_of(cell.x) != region {
                    return fail(format!("{} crosses the container boundary", instance.id));
                }
                if !expected.insert(cell) {
                    return fail(format!("({}, {}) is claimed twice", cell.x, cell.y));
                }
            }
        }

        for (position, cell) in self.grid.cells() {
            if cell.occupant.is_some() != expected.contains(&position) {
                return fail(format!("orphaned occupancy at ({}, {})", position.x, position.y));
            }
        }
        Ok(())
    }
}
