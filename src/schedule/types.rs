use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Composite identity of a team across the grid: roster id + team id.
///
/// Team ids are only unique within a theme, so the roster id is what keeps two
/// teams with the same numeric id apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentKey {
    pub roster_id: String,
    pub team_id: String,
}

impl AssignmentKey {
    pub fn new(roster_id: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            roster_id: roster_id.into(),
            team_id: team_id.into(),
        }
    }
}

impl fmt::Display for AssignmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.roster_id, self.team_id)
    }
}

impl FromStr for AssignmentKey {
    type Err = String;

    /// Parses `"<rosterId>-<teamId>"`. The roster id never contains a dash.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (roster_id, team_id) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("Assignment key '{}' is missing a '-'", s))?;
        if roster_id.is_empty() || team_id.is_empty() {
            return Err(format!("Assignment key '{}' has an empty part", s));
        }
        Ok(AssignmentKey::new(roster_id, team_id))
    }
}

/// A team loaded from the roster. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub roster_id: String,
    pub team_id: String,
    pub name: String,
    pub theme: String,
    pub problem_statement_id: Option<String>,
    #[serde(default)]
    pub priority: bool,
}

impl Team {
    pub fn key(&self) -> AssignmentKey {
        AssignmentKey::new(self.roster_id.clone(), self.team_id.clone())
    }
}

/// A team bound to one grid cell, with display fields copied from the roster
/// so the grid renders without the roster at hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub key: AssignmentKey,
    pub team_name: String,
    pub theme: String,
    pub problem_statement_id: Option<String>,
}

impl Assignment {
    /// The bare team id, which is what collision detection compares.
    pub fn team_id(&self) -> &str {
        &self.key.team_id
    }
}

impl From<&Team> for Assignment {
    fn from(team: &Team) -> Self {
        Assignment {
            key: team.key(),
            team_name: team.name.clone(),
            theme: team.theme.clone(),
            problem_statement_id: team.problem_statement_id.clone(),
        }
    }
}

/// One time row of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub index: usize,
    pub label: String,
}

/// Schedule window and pitch length. Overwritten wholesale on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    pub start_time: String,
    pub end_time: String,
    pub duration: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start_time: "08:00".to_string(),
            end_time: "17:00".to_string(),
            duration: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionMode {
    #[default]
    ThemeBased,
    Random,
}

impl FromStr for DistributionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "theme" | "theme-based" | "theme_based" => Ok(DistributionMode::ThemeBased),
            "random" => Ok(DistributionMode::Random),
            other => Err(format!("Unknown distribution mode: {}", other)),
        }
    }
}

impl fmt::Display for DistributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionMode::ThemeBased => write!(f, "theme-based"),
            DistributionMode::Random => write!(f, "random"),
        }
    }
}

/// Zero-based grid coordinate. Panel 0 is shown to organizers as "Panel 1".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub slot: usize,
    pub panel: usize,
}

impl CellRef {
    pub fn new(slot: usize, panel: usize) -> Self {
        Self { slot, panel }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_key_display_and_parse() {
        let key = AssignmentKey::new("55", "3982");
        assert_eq!(key.to_string(), "55-3982");
        assert_eq!("55-3982".parse::<AssignmentKey>().unwrap(), key);
    }

    #[test]
    fn test_assignment_key_rejects_malformed() {
        assert!("553982".parse::<AssignmentKey>().is_err());
        assert!("-3982".parse::<AssignmentKey>().is_err());
        assert!("55-".parse::<AssignmentKey>().is_err());
    }

    #[test]
    fn test_distribution_mode_parse() {
        assert_eq!("theme".parse::<DistributionMode>().unwrap(), DistributionMode::ThemeBased);
        assert_eq!("Random".parse::<DistributionMode>().unwrap(), DistributionMode::Random);
        assert!("round-robin".parse::<DistributionMode>().is_err());
    }

    #[test]
    fn test_schedule_config_json_uses_camel_case() {
        let json = serde_json::to_value(ScheduleConfig::default()).unwrap();
        assert_eq!(json["startTime"], "08:00");
        assert_eq!(json["endTime"], "17:00");
        assert_eq!(json["duration"], 10);
    }
}
