//! The roster of assignable teams and the read-only roster interface.

use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::schedule::{AssignmentKey, Team};

/// Read-only access to teams grouped by theme
pub trait RosterSource {
    /// Theme names in roster order
    fn themes(&self) -> Vec<String>;

    fn fetch_teams_by_theme(&self, theme: &str) -> Result<Vec<Team>>;
}

/// In-memory roster loaded from an upload
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamPool {
    teams: Vec<Team>,
}

impl TeamPool {
    pub fn new(teams: Vec<Team>) -> Self {
        Self { teams }
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn get(&self, key: &AssignmentKey) -> Option<&Team> {
        self.teams
            .iter()
            .find(|t| t.roster_id == key.roster_id && t.team_id == key.team_id)
    }

    /// Gathers every team by walking the themes of a roster source. A theme
    /// that fails to load counts as empty.
    pub fn collect_from<S: RosterSource + ?Sized>(source: &S) -> Self {
        let mut teams = Vec::new();
        for theme in source.themes() {
            match source.fetch_teams_by_theme(&theme) {
                Ok(mut batch) => teams.append(&mut batch),
                Err(e) => warn!(theme = %theme, error = %e, "Failed to fetch teams for theme"),
            }
        }
        Self { teams }
    }
}

impl RosterSource for TeamPool {
    fn themes(&self) -> Vec<String> {
        let mut themes: Vec<String> = Vec::new();
        for team in &self.teams {
            if !themes.iter().any(|t| t == &team.theme) {
                themes.push(team.theme.clone());
            }
        }
        themes
    }

    fn fetch_teams_by_theme(&self, theme: &str) -> Result<Vec<Team>> {
        Ok(self
            .teams
            .iter()
            .filter(|t| t.theme == theme)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchedulerError;

    fn team(roster: &str, theme: &str) -> Team {
        Team {
            roster_id: roster.to_string(),
            team_id: format!("{}0", roster),
            name: format!("Team {}", roster),
            theme: theme.to_string(),
            problem_statement_id: None,
            priority: false,
        }
    }

    struct FlakySource;

    impl RosterSource for FlakySource {
        fn themes(&self) -> Vec<String> {
            vec!["ok".to_string(), "broken".to_string()]
        }

        fn fetch_teams_by_theme(&self, theme: &str) -> Result<Vec<Team>> {
            match theme {
                "ok" => Ok(vec![team("1", "ok"), team("2", "ok")]),
                _ => Err(SchedulerError::PersistenceUnavailable("timeout".to_string())),
            }
        }
    }

    #[test]
    fn test_themes_in_roster_order() {
        let pool = TeamPool::new(vec![team("1", "B"), team("2", "A"), team("3", "B")]);
        assert_eq!(pool.themes(), vec!["B", "A"]);
        assert_eq!(pool.fetch_teams_by_theme("B").unwrap().len(), 2);
        assert!(pool.fetch_teams_by_theme("Z").unwrap().is_empty());
    }

    #[test]
    fn test_lookup_by_key() {
        let pool = TeamPool::new(vec![team("1", "A")]);
        assert!(pool.get(&AssignmentKey::new("1", "10")).is_some());
        assert!(pool.get(&AssignmentKey::new("1", "11")).is_none());
    }

    #[test]
    fn test_failed_theme_counts_as_empty() {
        let pool = TeamPool::collect_from(&FlakySource);
        assert_eq!(pool.len(), 2);
    }
}
