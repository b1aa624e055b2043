use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::schedule::{Assignment, CellRef, Grid, PlanSummary};

/// Formats a team for a grid cell: "Team Name (teamId)"
pub fn format_team(assignment: &Assignment) -> String {
    format!("{} ({})", assignment.team_name, assignment.key.team_id)
}

/// Renders the grid as a plain-text table, one line per time slot.
/// Colliding cells are prefixed with `!`.
pub fn render_grid(grid: &Grid, labels: &[String], collisions: &BTreeSet<CellRef>) -> String {
    let mut out = String::new();
    let header: Vec<String> = (1..=grid.panel_count()).map(|p| format!("Panel {}", p)).collect();
    let _ = writeln!(out, "{:<8}| {}", "Time", header.join(" | "));

    for slot in 0..grid.slot_count() {
        let label = labels.get(slot).map(String::as_str).unwrap_or("?");
        let cells: Vec<String> = (0..grid.panel_count())
            .map(|panel| match grid.get(slot, panel) {
                Some(a) if collisions.contains(&CellRef::new(slot, panel)) => format!("!{}", format_team(a)),
                Some(a) => format_team(a),
                None => "[EMPTY]".to_string(),
            })
            .collect();
        let _ = writeln!(out, "{:<8}| {}", label, cells.join(" | "));
    }
    out
}

/// Prints the grid and any collision warning
pub fn print_grid(grid: &Grid, labels: &[String], collisions: &BTreeSet<CellRef>) {
    println!("\n=== Panel Schedule ===");
    println!("Teams placed: {}", grid.occupied_count());
    if !collisions.is_empty() {
        println!("⚠️  {} cells share a team within the same time slot", collisions.len());
    }
    print!("{}", render_grid(grid, labels, collisions));
}

/// Prints the automatic assignment summary
pub fn print_plan_summary(summary: &PlanSummary) {
    println!("\n=== Automation Result ===");
    println!("Teams placed: {}", summary.teams_placed);
    println!("Total available slots: {}", summary.total_slots);
    println!("Distribution: {}", summary.distribution);
    println!("Priority team placed: {}", if summary.priority_placed { "Yes" } else { "No" });
    if summary.panels_increased {
        println!(
            "Panels auto-increased: {} -> {}",
            summary.original_panels, summary.final_panels
        );
    }
    if !summary.unplaced.is_empty() {
        println!("Unassigned teams ({}):", summary.unplaced.len());
        for key in &summary.unplaced {
            println!("  - {}", key);
        }
    }
}
