use csv::{Reader, StringRecord};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{Result, SchedulerError};
use crate::schedule::Team;

/// Normalizes a header for matching: lowercase, no spaces, dashes or underscores
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn find_column(headers: &StringRecord, matcher: impl Fn(&str) -> bool) -> Option<usize> {
    headers.iter().position(|h| matcher(&normalize_header(h)))
}

/// Parses a boolean value from various string representations
fn parse_bool(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    lower == "yes" || lower == "true" || lower == "1"
}

fn field(record: &StringRecord, col: Option<usize>) -> String {
    col.and_then(|c| record.get(c)).unwrap_or("").trim().to_string()
}

/// Loads the team roster from a CSV file
pub fn load_roster<P: AsRef<Path>>(csv_path: P) -> Result<Vec<Team>> {
    let path = csv_path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| SchedulerError::Roster(format!("{}: {}", path.display(), e)))?;
    load_roster_from_reader(file)
}

/// Loads the team roster from CSV data.
///
/// Expected columns (located by header name): `id`, `teamName`, `teamId`,
/// `problemStatementId`, `theme` and an optional `priority`. Rows without a
/// team name or team id are skipped. A later row with the same roster id
/// replaces the earlier one. Without an `id` column the 1-based row number
/// becomes the roster id.
pub fn load_roster_from_reader<R: Read>(input: R) -> Result<Vec<Team>> {
    let mut reader = Reader::from_reader(input);
    let headers = reader.headers()?.clone();

    let id_col = find_column(&headers, |h| h == "id" || h == "teamsdataid" || h == "rosterid");
    let name_col = find_column(&headers, |h| h.contains("teamname"))
        .ok_or_else(|| SchedulerError::Roster("missing a team name column".to_string()))?;
    let team_id_col = find_column(&headers, |h| h == "teamid")
        .ok_or_else(|| SchedulerError::Roster("missing a team id column".to_string()))?;
    let problem_col = find_column(&headers, |h| h.contains("problemstatement"));
    let theme_col = find_column(&headers, |h| h == "theme");
    let priority_col = find_column(&headers, |h| h == "priority");

    // Keep file order while letting repeated roster ids overwrite in place
    let mut teams: Vec<Team> = Vec::new();
    let mut index_by_roster_id: HashMap<String, usize> = HashMap::new();
    let mut skipped = 0usize;

    for (row, result) in reader.records().enumerate() {
        let record = result?;

        let name = field(&record, Some(name_col));
        let team_id = field(&record, Some(team_id_col));
        if name.is_empty() || team_id.is_empty() {
            skipped += 1;
            continue;
        }

        let mut roster_id = field(&record, id_col);
        if roster_id.is_empty() {
            roster_id = (row + 1).to_string();
        }
        let problem_statement_id = Some(field(&record, problem_col)).filter(|p| !p.is_empty());

        let team = Team {
            roster_id: roster_id.clone(),
            team_id,
            name,
            theme: field(&record, theme_col),
            problem_statement_id,
            priority: parse_bool(&field(&record, priority_col)),
        };

        match index_by_roster_id.get(&roster_id) {
            Some(&existing) => {
                debug!(roster_id = %roster_id, "Roster row replaces an earlier entry");
                teams[existing] = team;
            }
            None => {
                index_by_roster_id.insert(roster_id, teams.len());
                teams.push(team);
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, "Skipped roster rows without a team name or team id");
    }
    info!(teams = teams.len(), "Loaded roster");
    Ok(teams)
}

/// Loads a problem statement id -> theme map from CSV data with the columns
/// `Problem Statement ID,Theme`
pub fn load_theme_map_from_reader<R: Read>(input: R) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_reader(input);
    let headers = reader.headers()?.clone();
    let problem_col = find_column(&headers, |h| h.contains("problemstatement")).unwrap_or(0);
    let theme_col = find_column(&headers, |h| h == "theme").unwrap_or(1);

    let mut map = HashMap::new();
    for result in reader.records() {
        let record = result?;
        let problem = field(&record, Some(problem_col));
        let theme = field(&record, Some(theme_col));
        if !problem.is_empty() && !theme.is_empty() {
            map.insert(problem, theme);
        }
    }
    Ok(map)
}

pub fn load_theme_map<P: AsRef<Path>>(csv_path: P) -> Result<HashMap<String, String>> {
    let path = csv_path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| SchedulerError::Roster(format!("{}: {}", path.display(), e)))?;
    load_theme_map_from_reader(file)
}

/// Fills in missing themes from the problem statement map.
/// Returns how many teams were updated.
pub fn apply_theme_map(teams: &mut [Team], themes: &HashMap<String, String>) -> usize {
    let mut updated = 0;
    for team in teams.iter_mut().filter(|t| t.theme.trim().is_empty()) {
        let theme = team.problem_statement_id.as_ref().and_then(|p| themes.get(p));
        if let Some(theme) = theme {
            team.theme = theme.clone();
            updated += 1;
        }
    }
    updated
}
