use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SchedulerError};
use crate::schedule::{label_for_row, Assignment, AssignmentKey, Grid, ScheduleConfig, TimeSlot};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// One placed team as stored and exported: slot label, 1-based panel number
/// and the team fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelRow {
    pub id: usize,
    pub duration: i64,
    pub time: String,
    pub panel: usize,
    pub teams_data_id: String,
    pub team_name: String,
    pub team_id: String,
    pub problem_statement_id: Option<String>,
    pub theme: String,
    /// 0-based grid row at save time
    #[serde(default)]
    pub slot: Option<usize>,
    /// Row was added past the schedule window by a shift-insert
    #[serde(default)]
    pub appended: bool,
}

impl PanelRow {
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey::new(self.teams_data_id.clone(), self.team_id.clone())
    }

    fn to_assignment(&self) -> Assignment {
        Assignment {
            key: self.key(),
            team_name: self.team_name.clone(),
            theme: self.theme.clone(),
            problem_statement_id: self.problem_statement_id.clone(),
        }
    }
}

/// Flattens a grid into rows, row-major.
///
/// `labels` names each grid row; rows without a label are skipped. Rows at or
/// past `window` were appended by a shift-insert and are flagged as such.
pub fn export_rows(grid: &Grid, labels: &[String], window: usize, duration: i64) -> Vec<PanelRow> {
    grid.assignments()
        .filter_map(|(cell, a)| labels.get(cell.slot).map(|time| (cell, time.clone(), a)))
        .enumerate()
        .map(|(i, (cell, time, a))| PanelRow {
            id: i + 1,
            duration,
            time,
            panel: cell.panel + 1,
            teams_data_id: a.key.roster_id.clone(),
            team_name: a.team_name.clone(),
            team_id: a.key.team_id.clone(),
            problem_statement_id: a.problem_statement_id.clone(),
            theme: a.theme.clone(),
            slot: Some(cell.slot),
            appended: cell.slot >= window,
        })
        .collect()
}

/// Result of rebuilding a grid from persisted rows
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub grid: Grid,
    /// Rows whose slot label is not part of the current schedule
    pub dropped: Vec<PanelRow>,
}

/// The row's saved grid position, if that position still carries the row's
/// label under `config`. Positions past the window count only for rows that
/// were appended there, and never reach into the next day.
fn saved_slot(row: &PanelRow, config: &ScheduleConfig, slots: &[TimeSlot]) -> Option<usize> {
    let slot = row.slot?;
    let label = match slots.get(slot) {
        Some(s) => s.label.clone(),
        None if row.appended && (slot as i64).saturating_mul(config.duration) < MINUTES_PER_DAY => {
            label_for_row(config, slot).ok()?
        }
        None => return None,
    };
    (label == row.time.trim()).then_some(slot)
}

/// Rebuilds a grid from persisted rows against the current schedule.
///
/// A row goes back to its saved position when that position still has the
/// same label, appending rows for positions a shift-insert had added. Other
/// rows are matched by label to the first empty cell of their 1-based panel.
/// Panel numbers beyond `min_panels` widen the grid. Rows whose label is not in
/// the schedule, whose panel is 0, or that find no empty cell are dropped.
pub fn grid_from_rows(
    rows: &[PanelRow],
    config: &ScheduleConfig,
    slots: &[TimeSlot],
    min_panels: usize,
) -> ImportOutcome {
    let panels = rows
        .iter()
        .map(|r| r.panel)
        .max()
        .unwrap_or(0)
        .max(min_panels);
    let mut grid = Grid::new(slots.len(), panels);
    let mut by_label = Vec::new();
    let mut dropped = Vec::new();

    // Positioned rows first so a label match cannot take their cell.
    for row in rows {
        let (Some(slot), Some(panel)) = (saved_slot(row, config, slots), row.panel.checked_sub(1)) else {
            by_label.push(row);
            continue;
        };
        grid.grow_to(slot + 1);
        if !grid.set_if_empty(slot, panel, row.to_assignment()).unwrap_or(false) {
            dropped.push(row.clone());
        }
    }

    for row in by_label {
        let time = row.time.trim();
        let target = row.panel.checked_sub(1).and_then(|panel| {
            slots
                .iter()
                .enumerate()
                .find(|(slot, s)| s.label == time && grid.is_empty_at(*slot, panel))
                .map(|(slot, _)| (slot, panel))
        });
        let placed = match target {
            Some((slot, panel)) => grid.set_if_empty(slot, panel, row.to_assignment()).unwrap_or(false),
            None => false,
        };
        if !placed {
            dropped.push(row.clone());
        }
    }

    if !dropped.is_empty() {
        info!(dropped = dropped.len(), "Dropped persisted rows that no longer match the schedule");
    }
    ImportOutcome { grid, dropped }
}

/// Panel numbers that have at least one row, ascending
pub fn available_panels(rows: &[PanelRow]) -> Vec<usize> {
    rows.iter().map(|r| r.panel).collect::<BTreeSet<_>>().into_iter().collect()
}

pub fn rows_for_panel(rows: &[PanelRow], panel: usize) -> Vec<PanelRow> {
    rows.iter().filter(|r| r.panel == panel).cloned().collect()
}

pub fn rows_for_theme(rows: &[PanelRow], theme: &str) -> Vec<PanelRow> {
    rows.iter().filter(|r| r.theme == theme).cloned().collect()
}

/// Writes rows as CSV with a header line
pub fn write_rows_csv<W: Write>(rows: &[PanelRow], out: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(out);
    for row in rows {
        wtr.serialize(row)
            .map_err(|e| SchedulerError::PersistenceUnavailable(format!("CSV write failed: {}", e)))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn rows_to_csv_string(rows: &[PanelRow]) -> Result<String> {
    let mut buf = Vec::new();
    write_rows_csv(rows, &mut buf)?;
    String::from_utf8(buf).map_err(|e| SchedulerError::PersistenceUnavailable(e.to_string()))
}

/// File-system safe name for a theme export ("Travel & Tourism" -> "Travel_Tourism")
pub fn theme_file_stem(theme: &str) -> String {
    let stem: Vec<&str> = theme
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect();
    if stem.is_empty() {
        "theme".to_string()
    } else {
        stem.join("_")
    }
}

/// Writes `panel_<n>.csv` for every panel with rows, plus `all_panels.csv`.
/// Returns the files written.
pub fn export_panels_to_dir(rows: &[PanelRow], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for panel in available_panels(rows) {
        let path = dir.join(format!("panel_{}.csv", panel));
        write_rows_csv(&rows_for_panel(rows, panel), std::fs::File::create(&path)?)?;
        debug!(path = %path.display(), "Wrote panel export");
        written.push(path);
    }
    let all = dir.join("all_panels.csv");
    write_rows_csv(rows, std::fs::File::create(&all)?)?;
    written.push(all);
    Ok(written)
}

/// Writes `<theme>.csv` with the rows of one theme
pub fn export_theme_to_dir(rows: &[PanelRow], theme: &str, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.csv", theme_file_stem(theme)));
    write_rows_csv(&rows_for_theme(rows, theme), std::fs::File::create(&path)?)?;
    Ok(path)
}
