//! The organizer's editing session.
//!
//! Owns the schedule window, the slot sequence, the grid and the roster. Every
//! mutation runs to completion and returns an [`EditReport`] describing which
//! teams were placed or released and which cells now collide, so callers can
//! update their views without any shared event channel.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, SchedulerError};
use crate::export::{export_rows, grid_from_rows, PanelRow};
use crate::pool::TeamPool;
use crate::schedule::{
    calculate_time_slots, detect_collisions, label_for_row, plan, Assignment, AssignmentKey, CellRef,
    DistributionMode, Grid, InsertOutcome, PlanSummary, PriorityRule, ScheduleConfig, Team, TimeSlot,
};
use crate::store::{GridStore, ScheduleConfigStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EditReport {
    pub placed: Vec<AssignmentKey>,
    pub released: Vec<AssignmentKey>,
    pub shifted: usize,
    pub rows_appended: usize,
    pub collisions: BTreeSet<CellRef>,
}

impl EditReport {
    fn from_insert(outcome: InsertOutcome) -> Self {
        Self {
            shifted: outcome.shifted,
            rows_appended: outcome.rows_appended,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Workspace {
    config: ScheduleConfig,
    slots: Vec<TimeSlot>,
    grid: Grid,
    pool: TeamPool,
    priority: PriorityRule,
}

impl Workspace {
    pub fn new(config: ScheduleConfig, panels: usize, pool: TeamPool, priority: PriorityRule) -> Result<Self> {
        let slots = calculate_time_slots(&config)?;
        let grid = Grid::new(slots.len(), panels);
        Ok(Self {
            config,
            slots,
            grid,
            pool,
            priority,
        })
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn pool(&self) -> &TeamPool {
        &self.pool
    }

    /// Label of every grid row, including rows appended past the window
    pub fn row_labels(&self) -> Vec<String> {
        (0..self.grid.slot_count())
            .map(|row| match self.slots.get(row) {
                Some(slot) => slot.label.clone(),
                None => label_for_row(&self.config, row).unwrap_or_else(|_| format!("+{}", row)),
            })
            .collect()
    }

    pub fn used_keys(&self) -> BTreeSet<AssignmentKey> {
        self.grid.used_keys()
    }

    /// Roster teams that are not on the grid, in roster order
    pub fn unassigned_teams(&self) -> Vec<&Team> {
        let used = self.used_keys();
        self.pool.teams().iter().filter(|t| !used.contains(&t.key())).collect()
    }

    pub fn collisions(&self) -> BTreeSet<CellRef> {
        detect_collisions(&self.grid)
    }

    fn finish(&self, mut report: EditReport) -> EditReport {
        report.collisions = self.collisions();
        report
    }

    /// Resolves a roster team that is not on the grid yet
    fn available_team(&self, key: &AssignmentKey) -> Result<Assignment> {
        let team = self
            .pool
            .get(key)
            .ok_or_else(|| SchedulerError::UnknownTeam(key.clone()))?;
        if self.grid.contains_key(key) {
            return Err(SchedulerError::TeamAlreadyPlaced(key.clone()));
        }
        Ok(Assignment::from(team))
    }

    /// Replaces the roster. Teams already on the grid stay where they are.
    pub fn replace_roster(&mut self, pool: TeamPool) {
        info!(teams = pool.len(), "Roster replaced");
        self.pool = pool;
    }

    /// Applies a new schedule window. The grid keeps cells by row index and
    /// drops rows that no longer exist. On an invalid window nothing changes.
    pub fn update_schedule(&mut self, config: ScheduleConfig) -> Result<EditReport> {
        let slots = calculate_time_slots(&config)?;
        let dropped = self.grid.resize(slots.len(), self.grid.panel_count());
        if !dropped.is_empty() {
            warn!(dropped = dropped.len(), "Schedule change dropped placed teams");
        }
        self.config = config;
        self.slots = slots;
        Ok(self.finish(EditReport {
            released: dropped.into_iter().map(|a| a.key).collect(),
            ..EditReport::default()
        }))
    }

    pub fn place(&mut self, slot: usize, panel: usize, key: &AssignmentKey) -> Result<EditReport> {
        let assignment = self.available_team(key)?;
        let outcome = self.grid.place_at(slot, panel, assignment)?;
        let mut report = EditReport::from_insert(outcome);
        report.placed.push(key.clone());
        Ok(self.finish(report))
    }

    pub fn move_team(&mut self, from: CellRef, to: CellRef) -> Result<EditReport> {
        let outcome = self.grid.move_at(from, to)?;
        Ok(self.finish(outcome.map(EditReport::from_insert).unwrap_or_default()))
    }

    pub fn remove(&mut self, slot: usize, panel: usize) -> Result<EditReport> {
        let removed = self.grid.remove_at(slot, panel)?;
        Ok(self.finish(EditReport {
            released: removed.into_iter().map(|a| a.key).collect(),
            ..EditReport::default()
        }))
    }

    pub fn clear(&mut self) -> EditReport {
        let released = self.grid.clear_all();
        self.finish(EditReport {
            released,
            ..EditReport::default()
        })
    }

    pub fn add_panel(&mut self) -> EditReport {
        self.grid.add_panel();
        self.finish(EditReport::default())
    }

    /// Inserts several roster teams down one panel column. Every key is
    /// checked before the grid is touched.
    pub fn bulk_insert(&mut self, start_slot: usize, panel: usize, keys: &[AssignmentKey]) -> Result<EditReport> {
        let mut batch = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            if keys[..i].contains(key) {
                return Err(SchedulerError::TeamAlreadyPlaced(key.clone()));
            }
            batch.push(self.available_team(key)?);
        }
        let outcome = self.grid.bulk_column_insert(start_slot, panel, batch)?;
        let mut report = EditReport::from_insert(outcome);
        report.placed = keys.to_vec();
        Ok(self.finish(report))
    }

    /// Replaces the grid with an automatic assignment of the whole roster
    pub fn auto_plan(&mut self, panels: usize, mode: DistributionMode, seed: u64) -> (PlanSummary, EditReport) {
        let released = self.grid.used_keys().into_iter().collect();
        let outcome = plan(self.pool.teams(), &self.slots, panels, mode, seed, &self.priority);
        self.grid = outcome.grid;
        let placed = self.grid.used_keys().into_iter().collect();
        let report = self.finish(EditReport {
            placed,
            released,
            ..EditReport::default()
        });
        (outcome.summary, report)
    }

    /// Rows for the export surface and the grid store
    pub fn export_rows(&self) -> Vec<PanelRow> {
        export_rows(&self.grid, &self.row_labels(), self.slots.len(), self.config.duration)
    }

    /// Persists the schedule window and the grid. Local state is untouched
    /// whether or not the stores succeed.
    pub fn save(&self, config_store: &dyn ScheduleConfigStore, grid_store: &dyn GridStore) -> Result<usize> {
        let rows = self.export_rows();
        config_store.save(&self.config)?;
        grid_store.replace_all(&rows)?;
        info!(rows = rows.len(), "Saved panel assignments");
        Ok(rows.len())
    }

    /// Rebuilds the session from the stores. Rows appended past the window
    /// come back at their saved row; persisted rows whose label is not part of
    /// the stored schedule are dropped and returned.
    pub fn load(
        config_store: &dyn ScheduleConfigStore,
        grid_store: &dyn GridStore,
        min_panels: usize,
        pool: TeamPool,
        priority: PriorityRule,
    ) -> Result<(Self, Vec<PanelRow>)> {
        let config = config_store.load()?;
        let rows = grid_store.load_all()?;
        let mut workspace = Self::new(config, min_panels, pool, priority)?;
        let imported = grid_from_rows(&rows, &workspace.config, &workspace.slots, min_panels);
        workspace.grid = imported.grid;
        Ok((workspace, imported.dropped))
    }
}
