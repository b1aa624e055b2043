//! The time×panel assignment matrix.
//!
//! The grid guarantees structure only: no cell is ever overwritten by an
//! insert and no cell lives outside the current dimensions. It does not stop
//! a team from occupying two cells; that is the job of the collision scan and
//! of the caller's used-set check.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{Result, SchedulerError};
use super::types::{Assignment, AssignmentKey, CellRef};

/// What a shift-insert did to the grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InsertOutcome {
    /// Occupants pushed one row down to make room
    pub shifted: usize,
    /// Rows appended to the whole grid because the column was full
    pub rows_appended: usize,
}

impl InsertOutcome {
    fn merge(&mut self, other: InsertOutcome) {
        self.shifted += other.shifted;
        self.rows_appended += other.rows_appended;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    cells: Vec<Vec<Option<Assignment>>>,
    panels: usize,
}

impl Grid {
    /// Creates an empty grid of `slots` rows and `panels` columns
    pub fn new(slots: usize, panels: usize) -> Self {
        Self {
            cells: vec![vec![None; panels]; slots],
            panels,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.cells.len()
    }

    pub fn panel_count(&self) -> usize {
        self.panels
    }

    fn check(&self, slot: usize, panel: usize) -> Result<()> {
        if slot >= self.slot_count() || panel >= self.panels {
            return Err(SchedulerError::OutOfRangeCell {
                slot,
                panel,
                slots: self.slot_count(),
                panels: self.panels,
            });
        }
        Ok(())
    }

    pub fn get(&self, slot: usize, panel: usize) -> Option<&Assignment> {
        self.cells.get(slot)?.get(panel)?.as_ref()
    }

    pub fn is_empty_at(&self, slot: usize, panel: usize) -> bool {
        self.get(slot, panel).is_none()
    }

    /// Row `slot` as a slice of cells, one per panel
    pub fn row(&self, slot: usize) -> Option<&[Option<Assignment>]> {
        self.cells.get(slot).map(|r| r.as_slice())
    }

    /// Occupied cells in row-major order
    pub fn assignments(&self) -> impl Iterator<Item = (CellRef, &Assignment)> + '_ {
        self.cells.iter().enumerate().flat_map(|(slot, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(panel, cell)| cell.as_ref().map(|a| (CellRef::new(slot, panel), a)))
        })
    }

    pub fn occupied_count(&self) -> usize {
        self.assignments().count()
    }

    /// Keys currently on the grid. Always derived, never stored.
    pub fn used_keys(&self) -> BTreeSet<AssignmentKey> {
        self.assignments().map(|(_, a)| a.key.clone()).collect()
    }

    pub fn contains_key(&self, key: &AssignmentKey) -> bool {
        self.assignments().any(|(_, a)| &a.key == key)
    }

    fn append_row(&mut self) {
        self.cells.push(vec![None; self.panels]);
    }

    /// Appends empty rows until the grid has at least `slots` rows
    pub(crate) fn grow_to(&mut self, slots: usize) {
        while self.slot_count() < slots {
            self.append_row();
        }
    }

    /// Places an assignment, shifting occupants of the column down if the
    /// target is taken.
    ///
    /// The first empty cell at or below `slot` absorbs the shift. If the column
    /// is full to the bottom a new row is appended to every column.
    pub fn place_at(&mut self, slot: usize, panel: usize, assignment: Assignment) -> Result<InsertOutcome> {
        self.check(slot, panel)?;
        if self.cells[slot][panel].is_none() {
            self.cells[slot][panel] = Some(assignment);
            return Ok(InsertOutcome::default());
        }

        let mut outcome = InsertOutcome::default();
        let free_row = (slot + 1..self.slot_count()).find(|&row| self.cells[row][panel].is_none());
        let free_row = match free_row {
            Some(row) => row,
            None => {
                self.append_row();
                outcome.rows_appended = 1;
                self.slot_count() - 1
            }
        };

        for row in (slot + 1..=free_row).rev() {
            self.cells[row][panel] = self.cells[row - 1][panel].take();
            outcome.shifted += 1;
        }
        self.cells[slot][panel] = Some(assignment);
        Ok(outcome)
    }

    /// Moves the occupant of `from` to `to` with shift-insert semantics.
    ///
    /// The source is vacated before the destination is scanned, so a move down
    /// its own column does not treat the moving cell as an obstacle. Moving from
    /// an empty cell does nothing and returns `None`.
    pub fn move_at(&mut self, from: CellRef, to: CellRef) -> Result<Option<InsertOutcome>> {
        self.check(from.slot, from.panel)?;
        self.check(to.slot, to.panel)?;
        let moving = match self.cells[from.slot][from.panel].take() {
            Some(a) => a,
            None => return Ok(None),
        };
        let outcome = self.place_at(to.slot, to.panel, moving)?;
        Ok(Some(outcome))
    }

    /// Clears one cell, returning what was there
    pub fn remove_at(&mut self, slot: usize, panel: usize) -> Result<Option<Assignment>> {
        self.check(slot, panel)?;
        Ok(self.cells[slot][panel].take())
    }

    /// Empties every cell, keeping the dimensions. Returns the released keys.
    pub fn clear_all(&mut self) -> Vec<AssignmentKey> {
        let mut released = Vec::new();
        for row in self.cells.iter_mut() {
            for cell in row.iter_mut() {
                if let Some(a) = cell.take() {
                    released.push(a.key);
                }
            }
        }
        released
    }

    /// Appends one empty panel column
    pub fn add_panel(&mut self) {
        for row in self.cells.iter_mut() {
            row.push(None);
        }
        self.panels += 1;
    }

    /// Inserts a batch vertically into one column, item `i` at `start_slot + i`,
    /// each with shift-insert semantics. Rows are appended when the batch runs
    /// past the bottom of the grid.
    pub fn bulk_column_insert(
        &mut self,
        start_slot: usize,
        panel: usize,
        batch: Vec<Assignment>,
    ) -> Result<InsertOutcome> {
        self.check(start_slot, panel)?;
        let mut total = InsertOutcome::default();
        for (offset, assignment) in batch.into_iter().enumerate() {
            let target = start_slot + offset;
            while target >= self.slot_count() {
                self.append_row();
                total.rows_appended += 1;
            }
            total.merge(self.place_at(target, panel, assignment)?);
        }
        Ok(total)
    }

    /// Rebuilds the matrix at new dimensions, copying by coordinate.
    ///
    /// Cells outside the new bounds are dropped and handed back to the caller;
    /// they are not re-placed.
    pub fn resize(&mut self, slots: usize, panels: usize) -> Vec<Assignment> {
        let mut resized = Grid::new(slots, panels);
        let mut dropped = Vec::new();
        for (slot, row) in std::mem::take(&mut self.cells).into_iter().enumerate() {
            for (panel, cell) in row.into_iter().enumerate() {
                let Some(assignment) = cell else { continue };
                if slot < slots && panel < panels {
                    resized.cells[slot][panel] = Some(assignment);
                } else {
                    dropped.push(assignment);
                }
            }
        }
        *self = resized;
        dropped
    }

    /// Writes an assignment into an empty cell without shifting. Used when
    /// rebuilding a grid from persisted rows.
    pub(crate) fn set_if_empty(&mut self, slot: usize, panel: usize, assignment: Assignment) -> Result<bool> {
        self.check(slot, panel)?;
        if self.cells[slot][panel].is_some() {
            return Ok(false);
        }
        self.cells[slot][panel] = Some(assignment);
        Ok(true)
    }
}
