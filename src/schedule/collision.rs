use std::collections::{BTreeSet, HashMap};

use super::grid::Grid;
use super::types::CellRef;

/// Finds cells whose team appears more than once in the same time row.
///
/// Only the bare team id is compared, not the full assignment key, so teams
/// from different rosters that share a numeric id are reported too. Repeats
/// across different rows are never reported. The result is advisory.
pub fn detect_collisions(grid: &Grid) -> BTreeSet<CellRef> {
    let mut collisions = BTreeSet::new();
    for slot in 0..grid.slot_count() {
        let Some(row) = grid.row(slot) else { continue };
        let mut by_team: HashMap<&str, Vec<usize>> = HashMap::new();
        for (panel, cell) in row.iter().enumerate() {
            if let Some(assignment) = cell {
                by_team.entry(assignment.team_id().trim()).or_default().push(panel);
            }
        }
        for panels in by_team.values().filter(|p| p.len() > 1) {
            collisions.extend(panels.iter().map(|&panel| CellRef::new(slot, panel)));
        }
    }
    collisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::types::{Assignment, AssignmentKey};

    fn team(roster: &str, id: &str) -> Assignment {
        Assignment {
            key: AssignmentKey::new(roster, id),
            team_name: format!("Team {}", id),
            theme: String::new(),
            problem_statement_id: None,
        }
    }

    #[test]
    fn test_empty_grid_has_no_collisions() {
        assert!(detect_collisions(&Grid::new(4, 4)).is_empty());
    }

    #[test]
    fn test_same_row_duplicate_marks_every_cell() {
        let mut grid = Grid::new(2, 4);
        grid.place_at(0, 0, team("1", "100")).unwrap();
        grid.place_at(0, 2, team("1", "100")).unwrap();
        grid.place_at(0, 3, team("1", "100")).unwrap();
        grid.place_at(0, 1, team("2", "200")).unwrap();

        let found = detect_collisions(&grid);

        assert_eq!(
            found,
            [CellRef::new(0, 0), CellRef::new(0, 2), CellRef::new(0, 3)].into_iter().collect()
        );
    }

    #[test]
    fn test_bare_team_id_is_compared_across_rosters() {
        let mut grid = Grid::new(1, 2);
        grid.place_at(0, 0, team("17", "42")).unwrap();
        grid.place_at(0, 1, team("93", "42")).unwrap();
        assert_eq!(detect_collisions(&grid).len(), 2);
    }

    #[test]
    fn test_cross_row_repeats_are_not_collisions() {
        let mut grid = Grid::new(2, 2);
        grid.place_at(0, 0, team("1", "100")).unwrap();
        grid.place_at(1, 1, team("1", "100")).unwrap();
        assert!(detect_collisions(&grid).is_empty());
    }

    #[test]
    fn test_every_collision_has_a_partner() {
        let mut grid = Grid::new(3, 3);
        grid.place_at(0, 0, team("1", "5")).unwrap();
        grid.place_at(0, 1, team("2", "5")).unwrap();
        grid.place_at(2, 1, team("3", "9")).unwrap();
        grid.place_at(2, 2, team("3", "9")).unwrap();
        grid.place_at(1, 0, team("4", "9")).unwrap();

        let found = detect_collisions(&grid);
        for cell in &found {
            let id = grid.get(cell.slot, cell.panel).unwrap().team_id();
            let partners = found
                .iter()
                .filter(|c| c.slot == cell.slot && grid.get(c.slot, c.panel).unwrap().team_id() == id)
                .count();
            assert!(partners >= 2);
        }
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn test_clear_all_resolves_collisions() {
        let mut grid = Grid::new(1, 2);
        grid.place_at(0, 0, team("1", "100")).unwrap();
        grid.place_at(0, 1, team("1", "100")).unwrap();
        grid.clear_all();
        assert!(detect_collisions(&grid).is_empty());
    }
}
