use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Cell;

/// Ordered storage for persistent menu content, keyed by absolute slot
/// index (`page * slots_per_page + page_relative_slot`).
///
/// No bounds checking happens here; callers own the page geometry.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SlotMap {
    cells: BTreeMap<i32, Cell>,
}

impl SlotMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, slot: i32, cell: Cell) {
        self.cells.insert(slot, cell);
    }

    pub fn get(&self, slot: i32) -> Option<&Cell> {
        self.cells.get(&slot)
    }

    pub fn remove(&mut self, slot: i32) -> Option<Cell> {
        self.cells.remove(&slot)
    }

    pub fn clear_slots(&mut self, slots: &[i32]) {
        for slot in slots {
            self.cells.remove(slot);
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Ascending iteration over all occupied slots.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &Cell)> {
        self.cells.iter().map(|(slot, cell)| (*slot, cell))
    }

    /// Occupied slots within one page window, in ascending order.
    pub fn page_window(
        &self,
        page: i32,
        slots_per_page: i32,
    ) -> impl Iterator<Item = (i32, &Cell)> {
        let start = page * slots_per_page;
        self.cells
            .range(start..start + slots_per_page)
            .map(|(slot, cell)| (*slot, cell))
    }

    pub fn min_slot(&self) -> Option<i32> {
        self.cells.keys().next().copied()
    }

    pub fn max_slot(&self) -> Option<i32> {
        self.cells.keys().next_back().copied()
    }
}
