use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::grid::Grid;
use super::random::{shuffle, Lcg, UnitRandom};
use super::types::{Assignment, AssignmentKey, DistributionMode, Team, TimeSlot};

/// Decides which team is forced into the first cell.
///
/// A team matches if it carries the `priority` flag or its name contains the
/// configured token, compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRule {
    pub token: Option<String>,
}

impl PriorityRule {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn matches(&self, team: &Team) -> bool {
        if team.priority {
            return true;
        }
        match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => team.name.to_lowercase().contains(&token.to_lowercase()),
            _ => false,
        }
    }
}

/// Summary reported back to the organizer after an automatic pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub teams_placed: usize,
    pub total_slots: usize,
    pub distribution: DistributionMode,
    pub priority_placed: bool,
    pub panels_increased: bool,
    pub original_panels: usize,
    pub final_panels: usize,
    pub seed: u64,
    /// Teams held back by the per-theme cap
    pub unplaced: Vec<AssignmentKey>,
}

#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub grid: Grid,
    pub summary: PlanSummary,
}

/// Panel count needed so every team gets a cell. Never below `requested`.
pub fn effective_panel_count(team_count: usize, slot_count: usize, requested: usize) -> usize {
    if slot_count == 0 || team_count <= slot_count * requested {
        return requested;
    }
    requested.max(team_count.div_ceil(slot_count))
}

/// Partitions teams by theme in order of first appearance. A team with no
/// theme forms a group of its own.
fn group_by_theme(teams: Vec<Team>) -> Vec<Vec<Team>> {
    let mut groups: Vec<(Option<String>, Vec<Team>)> = Vec::new();
    for team in teams {
        let theme = team.theme.trim();
        if theme.is_empty() {
            groups.push((None, vec![team]));
            continue;
        }
        match groups.iter_mut().find(|(t, _)| t.as_deref() == Some(theme)) {
            Some((_, members)) => members.push(team),
            None => {
                let key = Some(theme.to_string());
                groups.push((key, vec![team]));
            }
        }
    }
    groups.into_iter().map(|(_, members)| members).collect()
}

/// Plans with the LCG seeded from `seed`
pub fn plan(
    teams: &[Team],
    time_slots: &[TimeSlot],
    requested_panels: usize,
    mode: DistributionMode,
    seed: u64,
    priority: &PriorityRule,
) -> PlanOutcome {
    let mut rng = Lcg::new(seed);
    let mut outcome = plan_with_rng(teams, time_slots, requested_panels, mode, &mut rng, priority);
    outcome.summary.seed = seed;
    outcome
}

/// Builds a complete grid from the roster.
///
/// The priority team (if any) takes the first cell of panel 1. The panel count
/// grows when the roster does not fit, and the remaining teams fill the grid
/// row by row in shuffled order.
pub fn plan_with_rng<R: UnitRandom + ?Sized>(
    teams: &[Team],
    time_slots: &[TimeSlot],
    requested_panels: usize,
    mode: DistributionMode,
    rng: &mut R,
    priority: &PriorityRule,
) -> PlanOutcome {
    let mut remaining: Vec<Team> = teams.to_vec();
    let priority_team = remaining
        .iter()
        .position(|t| priority.matches(t))
        .map(|index| remaining.remove(index));

    let team_count = remaining.len() + usize::from(priority_team.is_some());
    let final_panels = effective_panel_count(team_count, time_slots.len(), requested_panels);
    if final_panels != requested_panels {
        info!(
            requested = requested_panels,
            effective = final_panels,
            teams = team_count,
            "Increased panel count to fit roster"
        );
    }
    if team_count == 0 {
        warn!("Planning with an empty roster");
    }

    let mut unplaced = Vec::new();
    let ordered: Vec<Team> = match mode {
        DistributionMode::ThemeBased => {
            let mut groups = group_by_theme(remaining);
            let per_theme_cap = if groups.is_empty() {
                0
            } else {
                time_slots.len().div_ceil(groups.len())
            };
            debug!(themes = groups.len(), cap = per_theme_cap, "Theme grouping");
            let mut ordered = Vec::new();
            for group in groups.iter_mut() {
                shuffle(group, rng);
                let overflow = group.split_off(per_theme_cap.min(group.len()));
                unplaced.extend(overflow.iter().map(Team::key));
                ordered.append(group);
            }
            ordered
        }
        DistributionMode::Random => {
            shuffle(&mut remaining, rng);
            remaining
        }
    };

    let mut grid = Grid::new(time_slots.len(), final_panels);
    let mut queue = ordered.iter();
    let mut teams_placed = 0;
    let mut priority_placed = false;

    'rows: for slot in 0..time_slots.len() {
        for panel in 0..final_panels {
            let next = match (&priority_team, slot, panel) {
                (Some(team), 0, 0) => {
                    priority_placed = true;
                    Some(team)
                }
                _ => queue.next(),
            };
            match next {
                Some(team) => {
                    if grid.set_if_empty(slot, panel, Assignment::from(team)).unwrap_or(false) {
                        teams_placed += 1;
                    }
                }
                None => break 'rows,
            }
        }
    }

    // Cells always outnumber teams, so this only fires with zero slots or panels.
    unplaced.extend(queue.map(Team::key));
    if let (Some(team), false) = (&priority_team, priority_placed) {
        unplaced.push(team.key());
    }

    info!(
        placed = teams_placed,
        unplaced = unplaced.len(),
        panels = final_panels,
        mode = %mode,
        "Automatic panel assignment complete"
    );

    PlanOutcome {
        grid,
        summary: PlanSummary {
            teams_placed,
            total_slots: time_slots.len() * final_panels,
            distribution: mode,
            priority_placed,
            panels_increased: final_panels != requested_panels,
            original_panels: requested_panels,
            final_panels,
            seed: 0,
            unplaced,
        },
    }
}
