//! Slot grid and free-space search
//!
//! The grid covers the player's inventory columns and, while a container
//! is open, the container's columns appended to the right. Items occupy
//! rectangular regions and never straddle the inventory/container boundary.

use crate::error::{InventoryError, Result};
use crate::instance::InstanceId;
use crate::item::Orientation;
use serde::{Deserialize, Serialize};

/// Position in the grid (top-left cell of an item)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: u16,
    pub y: u16,
}

impl GridPosition {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// State of a single slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    /// Not usable until the inventory is expanded
    Locked,
    /// Player inventory slot
    Inventory,
    /// Slot of an open container
    Container,
}

/// Grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub state: SlotState,
    pub occupant: Option<InstanceId>,
}

impl Cell {
    const fn new(state: SlotState) -> Self {
        Self {
            state,
            occupant: None,
        }
    }
}

/// Column region of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Inventory,
    Container,
}

/// Container columns currently appended to the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Overlay {
    columns: u16,
    rows: u16,
}

/// 2D array of slots
#[derive(Debug, Clone)]
pub struct SlotGrid {
    /// Inventory columns
    columns: u16,
    /// Inventory rows
    rows: u16,
    overlay: Option<Overlay>,
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl SlotGrid {
    /// Create a grid whose last `locked_rows` rows start locked
    pub fn new(rows: u16, columns: u16, locked_rows: u16) -> Self {
        let unlocked_rows = rows.saturating_sub(locked_rows);
        let mut cells = Vec::with_capacity(rows as usize * columns as usize);
        for y in 0..rows {
            let state = if y < unlocked_rows {
                SlotState::Inventory
            } else {
                SlotState::Locked
            };
            cells.extend((0..columns).map(|_| Cell::new(state)));
        }

        Self {
            columns,
            rows,
            overlay: None,
            width: columns,
            height: rows,
            cells,
        }
    }

    /// Total columns including any overlay
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Total rows including any overlay
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Columns belonging to the player inventory
    pub fn inventory_columns(&self) -> u16 {
        self.columns
    }

    pub fn inventory_rows(&self) -> u16 {
        self.rows
    }

    /// (columns, rows) of the open container overlay
    pub fn overlay_size(&self) -> Option<(u16, u16)> {
        self.overlay.map(|o| (o.columns, o.rows))
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn in_bounds(&self, pos: GridPosition) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    /// Cell at a position
    pub fn cell(&self, pos: GridPosition) -> Option<&Cell> {
        if self.in_bounds(pos) {
            Some(&self.cells[self.index(pos.x, pos.y)])
        } else {
            None
        }
    }

    /// Occupant of a cell
    pub fn occupant(&self, pos: GridPosition) -> Option<InstanceId> {
        self.cell(pos).and_then(|c| c.occupant)
    }

    /// Region a column belongs to
    #[inline]
    pub fn region_of(&self, x: u16) -> Region {
        if x < self.columns {
            Region::Inventory
        } else {
            Region::Container
        }
    }

    /// Whether a `width` x `height` rectangle at `pos` is free.
    ///
    /// Cells occupied by `ignore` count as free, which lets a move
    /// re-validate an item against its own footprint.
    pub fn region_fits(
        &self,
        pos: GridPosition,
        width: u16,
        height: u16,
        ignore: Option<InstanceId>,
    ) -> bool {
        if width == 0 || height == 0 {
            return false;
        }

        let (Some(right), Some(bottom)) = (pos.x.checked_add(width - 1), pos.y.checked_add(height - 1))
        else {
            return false;
        };
        if right >= self.width || bottom >= self.height {
            return false;
        }
        if self.region_of(pos.x) != self.region_of(right) {
            return false;
        }

        for y in pos.y..=bottom {
            for x in pos.x..=right {
                let cell = &self.cells[self.index(x, y)];
                if cell.state == SlotState::Locked {
                    return false;
                }
                match cell.occupant {
                    Some(id) if Some(id) != ignore => return false,
                    _ => {}
                }
            }
        }
        true
    }

    /// First free region for a `width` x `height` item.
    ///
    /// Scans origins row by row. At each origin the horizontal orientation
    /// is tried first, then the vertical one for non-square items. With
    /// `region` set, only origins in that column region are considered.
    pub fn find_free_space(
        &self,
        width: u16,
        height: u16,
        region: Option<Region>,
    ) -> Option<(GridPosition, Orientation)> {
        for y in 0..self.height {
            for x in 0..self.width {
                if region.is_some_and(|r| r != self.region_of(x)) {
                    continue;
                }
                let pos = GridPosition::new(x, y);
                if self.region_fits(pos, width, height, None) {
                    return Some((pos, Orientation::Horizontal));
                }
                if width != height && self.region_fits(pos, height, width, None) {
                    return Some((pos, Orientation::Vertical));
                }
            }
        }
        None
    }

    /// Mark a rectangle as occupied by `id`
    pub(crate) fn occupy(&mut self, pos: GridPosition, width: u16, height: u16, id: InstanceId) {
        for y in pos.y..pos.y + height {
            for x in pos.x..pos.x + width {
                let index = self.index(x, y);
                self.cells[index].occupant = Some(id);
            }
        }
    }

    /// Clear every cell occupied by `id`, returning how many were freed
    pub(crate) fn vacate(&mut self, id: InstanceId) -> usize {
        let mut freed = 0;
        for cell in &mut self.cells {
            if cell.occupant == Some(id) {
                cell.occupant = None;
                freed += 1;
            }
        }
        freed
    }

    /// Unlock up to `count` locked inventory cells in row-major order,
    /// starting from the first locked row. Returns how many were unlocked.
    pub(crate) fn expand(&mut self, count: usize) -> usize {
        let mut unlocked = 0;
        'rows: for y in 0..self.rows {
            for x in 0..self.columns {
                if unlocked == count {
                    break 'rows;
                }
                let index = self.index(x, y);
                if self.cells[index].state == SlotState::Locked {
                    self.cells[index].state = SlotState::Inventory;
                    unlocked += 1;
                }
            }
        }
        unlocked
    }

    /// Unlocked cells in the inventory region
    pub fn unlocked_slots(&self) -> usize {
        self.region_cells(Region::Inventory)
            .filter(|(_, c)| c.state != SlotState::Locked)
            .count()
    }

    /// Unlocked, unoccupied cells in a region
    pub fn free_cells(&self, region: Region) -> usize {
        self.region_cells(region)
            .filter(|(_, c)| c.state != SlotState::Locked && c.occupant.is_none())
            .count()
    }

    fn region_cells(&self, region: Region) -> impl Iterator<Item = (GridPosition, &Cell)> {
        self.cells().filter(move |(pos, _)| self.region_of(pos.x) == region)
    }

    /// All cells with their positions, row-major
    pub fn cells(&self) -> impl Iterator<Item = (GridPosition, &Cell)> {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(i, cell)| {
            let x = (i % width as usize) as u16;
            let y = (i / width as usize) as u16;
            (GridPosition::new(x, y), cell)
        })
    }

    /// Append `columns` x `rows` container slots to the right.
    ///
    /// The grid grows to the taller of the two regions; cells outside a
    /// region's own rows are locked.
    pub(crate) fn set_overlay(&mut self, columns: u16, rows: u16) -> Result<()> {
        let width = self.columns.checked_add(columns).ok_or_else(|| {
            InventoryError::InvalidConfig(format!(
                "{} container columns do not fit beside {} inventory columns",
                columns, self.columns
            ))
        })?;
        let height = self.rows.max(rows);
        let mut cells = Vec::with_capacity(width as usize * height as usize);

        for y in 0..height {
            for x in 0..width {
                let cell = if x < self.columns {
                    if y < self.rows {
                        self.cells[self.index(x, y)]
                    } else {
                        Cell::new(SlotState::Locked)
                    }
                } else if y < rows {
                    Cell::new(SlotState::Container)
                } else {
                    Cell::new(SlotState::Locked)
                };
                cells.push(cell);
            }
        }

        self.cells = cells;
        self.width = width;
        self.height = height;
        self.overlay = Some(Overlay { columns, rows });
        Ok(())
    }

    /// Shrink back to the inventory region
    pub(crate) fn clear_overlay(&mut self) {
        if self.overlay.is_none() {
            return;
        }

        let mut cells = Vec::with_capacity(self.rows as usize * self.columns as usize);
        for y in 0..self.rows {
            for x in 0..self.columns {
                cells.push(self.cells[self.index(x, y)]);
            }
        }

        self.cells = cells;
        self.width = self.columns;
        self.height = self.rows;
        self.overlay = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> InstanceId {
        InstanceId::from_raw(n)
    }

    #[test]
    fn test_grid_creation() {
        let grid = SlotGrid::new(4, 3, 1);

        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.unlocked_slots(), 9);
        assert_eq!(grid.cell(GridPosition::new(0, 3)).unwrap().state, SlotState::Locked);
        assert!(grid.cell(GridPosition::new(3, 0)).is_none());
    }

    #[test]
    fn test_find_free_space_row_major() {
        let mut grid = SlotGrid::new(3, 3, 0);
        grid.occupy(GridPosition::new(0, 0), 1, 1, id(1));

        let (pos, orientation) = grid.find_free_space(1, 1, None).unwrap();
        assert_eq!(pos, GridPosition::new(1, 0));
        assert_eq!(orientation, Orientation::Horizontal);
    }

    #[test]
    fn test_find_free_space_rotates_at_same_origin() {
        // Only column 0 is free: a 2x1 item must stand up
        let mut grid = SlotGrid::new(3, 3, 0);
        for y in 0..3 {
            grid.occupy(GridPosition::new(1, y), 2, 1, id(10 + y as u64));
        }

        let (pos, orientation) = grid.find_free_space(2, 1, None).unwrap();
        assert_eq!(pos, GridPosition::new(0, 0));
        assert_eq!(orientation, Orientation::Vertical);
    }

    #[test]
    fn test_find_free_space_full() {
        let mut grid = SlotGrid::new(2, 2, 0);
        grid.occupy(GridPosition::new(0, 0), 2, 2, id(1));
        assert!(grid.find_free_space(1, 1, None).is_none());
    }

    #[test]
    fn test_locked_cells_not_free() {
        let grid = SlotGrid::new(2, 2, 1);
        assert!(!grid.region_fits(GridPosition::new(0, 0), 1, 2, None));
        assert!(grid.find_free_space(1, 2, None).is_some_and(|(_, o)| o == Orientation::Vertical));
    }

    #[test]
    fn test_region_fits_ignores_self() {
        let mut grid = SlotGrid::new(3, 3, 0);
        grid.occupy(GridPosition::new(0, 0), 2, 1, id(1));

        assert!(!grid.region_fits(GridPosition::new(1, 0), 2, 1, None));
        assert!(grid.region_fits(GridPosition::new(1, 0), 2, 1, Some(id(1))));
        assert!(!grid.region_fits(GridPosition::new(2, 0), 2, 1, Some(id(1))));
    }

    #[test]
    fn test_vacate() {
        let mut grid = SlotGrid::new(3, 3, 0);
        grid.occupy(GridPosition::new(1, 1), 2, 2, id(7));
        assert_eq!(grid.free_cells(Region::Inventory), 5);

        assert_eq!(grid.vacate(id(7)), 4);
        assert_eq!(grid.free_cells(Region::Inventory), 9);
    }

    #[test]
    fn test_expand() {
        let mut grid = SlotGrid::new(3, 2, 2);
        assert_eq!(grid.unlocked_slots(), 2);

        assert_eq!(grid.expand(3), 3);
        assert_eq!(grid.unlocked_slots(), 5);
        assert_eq!(grid.cell(GridPosition::new(0, 2)).unwrap().state, SlotState::Inventory);
        assert_eq!(grid.cell(GridPosition::new(1, 2)).unwrap().state, SlotState::Locked);

        // Only one locked cell left
        assert_eq!(grid.expand(10), 1);
        assert_eq!(grid.expand(1), 0);
    }

    #[test]
    fn test_overlay_boundary() {
        let mut grid = SlotGrid::new(2, 2, 0);
        grid.set_overlay(3, 4).unwrap();

        assert_eq!(grid.width(), 5);
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.cell(GridPosition::new(2, 3)).unwrap().state, SlotState::Container);
        assert_eq!(grid.cell(GridPosition::new(0, 3)).unwrap().state, SlotState::Locked);
        assert_eq!(grid.region_of(1), Region::Inventory);
        assert_eq!(grid.region_of(2), Region::Container);

        // 2-wide item straddling columns 1 and 2
        assert!(!grid.region_fits(GridPosition::new(1, 0), 2, 1, None));
        assert!(grid.region_fits(GridPosition::new(2, 0), 2, 1, None));

        let (pos, _) = grid.find_free_space(1, 1, Some(Region::Container)).unwrap();
        assert_eq!(pos, GridPosition::new(2, 0));
    }

    #[test]
    fn test_overlay_restores_inventory_cells() {
        let mut grid = SlotGrid::new(2, 2, 1);
        grid.occupy(GridPosition::new(1, 0), 1, 1, id(3));

        grid.set_overlay(2, 1).unwrap();
        assert_eq!(grid.occupant(GridPosition::new(1, 0)), Some(id(3)));
        assert_eq!(grid.cell(GridPosition::new(3, 1)).unwrap().state, SlotState::Locked);

        grid.expand(1);
        grid.clear_overlay();

        assert_eq!(grid.width(), 2);
        assert!(!grid.has_overlay());
        assert_eq!(grid.occupant(GridPosition::new(1, 0)), Some(id(3)));
        assert_eq!(grid.unlocked_slots(), 3);
    }

    #[test]
    fn test_overlay_too_wide() {
        let mut grid = SlotGrid::new(2, 3, 0);

        assert!(matches!(
            grid.set_overlay(u16::MAX, 1),
            Err(InventoryError::InvalidConfig(_))
        ));
        assert!(!grid.has_overlay());
        assert_eq!(grid.width(), 3);
    }
}
