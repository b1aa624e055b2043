use std::collections::BTreeSet;

use panel_splitter::export::{available_panels, export_panels_to_dir};
use panel_splitter::parser::load_roster_from_reader;
use panel_splitter::pool::TeamPool;
use panel_splitter::schedule::{
    calculate_time_slots, detect_collisions, generate_time_slots, plan, AssignmentKey, CellRef, DistributionMode,
    PriorityRule, ScheduleConfig, Team,
};
use panel_splitter::store::{GridStore, JsonFileStore, MemoryStore, ScheduleConfigStore};
use panel_splitter::{SchedulerError, Workspace};

const ROSTER: &str = "\
id,teamName,teamId,problemStatementId,theme
1,Byte Busters,3982,SIH1501,Agriculture
2,Null Pointers,1729,SIH1522,Smart Education
3,Jagermeister Crew,9214,SIH1601,Agriculture
4,Stack Smashers,5120,SIH1522,Smart Education
5,Green Thumbs,6001,SIH1502,Agriculture
6,Quantum Quokkas,7007,SIH1700,Healthcare
7,Binary Bards,8118,SIH1701,Healthcare
";

fn roster() -> Vec<Team> {
    load_roster_from_reader(ROSTER.as_bytes()).unwrap()
}

fn morning() -> ScheduleConfig {
    ScheduleConfig {
        start_time: "9:00".to_string(),
        end_time: "10:00".to_string(),
        duration: 10,
    }
}

fn numbered_teams(count: usize) -> Vec<Team> {
    (0..count)
        .map(|i| Team {
            roster_id: (i + 1).to_string(),
            team_id: (1000 + i).to_string(),
            name: format!("Team {}", i),
            theme: format!("Theme {}", i % 3),
            problem_statement_id: None,
            priority: false,
        })
        .collect()
}

#[test]
fn slot_window_boundaries() {
    assert_eq!(
        generate_time_slots("08:00", "08:30", 10).unwrap(),
        vec!["8:00", "8:10", "8:20"]
    );
    assert_eq!(
        generate_time_slots("11:40", "12:20", 20).unwrap(),
        vec!["11:40", "12:00"]
    );
    assert!(generate_time_slots("08:00", "08:05", 10).unwrap().is_empty());
    assert!(matches!(
        generate_time_slots("10:00", "09:00", 10),
        Err(SchedulerError::InvalidScheduleWindow { .. })
    ));
    assert!(matches!(
        generate_time_slots("09:00", "10:00", 0),
        Err(SchedulerError::InvalidScheduleWindow { .. })
    ));
}

#[test]
fn priority_team_opens_panel_one_for_every_seed() {
    let slots = calculate_time_slots(&morning()).unwrap();
    let rule = PriorityRule::with_token("jagermeister");
    for seed in 0..50 {
        for mode in [DistributionMode::ThemeBased, DistributionMode::Random] {
            let outcome = plan(&roster(), &slots, 2, mode, seed, &rule);
            let first = outcome.grid.get(0, 0).unwrap();
            assert_eq!(first.key, AssignmentKey::new("3", "9214"));
            assert!(outcome.summary.priority_placed);
        }
    }
}

#[test]
fn panel_count_grows_to_fit_roster() {
    let slots = calculate_time_slots(&ScheduleConfig {
        start_time: "9:00".to_string(),
        end_time: "9:50".to_string(),
        duration: 10,
    })
    .unwrap();
    let outcome = plan(
        &numbered_teams(25),
        &slots,
        4,
        DistributionMode::Random,
        7,
        &PriorityRule::default(),
    );
    assert_eq!(outcome.summary.final_panels, 5);
    assert!(outcome.summary.panels_increased);
    assert_eq!(outcome.summary.teams_placed, 25);
    assert_eq!(outcome.grid.occupied_count(), 25);
}

#[test]
fn same_seed_gives_same_grid() {
    let slots = calculate_time_slots(&morning()).unwrap();
    let a = plan(&roster(), &slots, 2, DistributionMode::ThemeBased, 42, &PriorityRule::default());
    let b = plan(&roster(), &slots, 2, DistributionMode::ThemeBased, 42, &PriorityRule::default());
    assert_eq!(a.grid, b.grid);
}

#[test]
fn shift_insert_keeps_every_team() {
    let mut ws = Workspace::new(morning(), 1, TeamPool::new(roster()), PriorityRule::default()).unwrap();
    let keys: Vec<AssignmentKey> = roster().iter().map(Team::key).collect();
    for key in &keys[..6] {
        ws.place(0, 0, key).unwrap();
    }
    // Column of six full rows; one more forces a new row.
    let report = ws.place(0, 0, &keys[6]).unwrap();
    assert_eq!(report.rows_appended, 1);
    assert_eq!(ws.grid().slot_count(), 7);
    assert_eq!(ws.used_keys(), keys.iter().cloned().collect::<BTreeSet<_>>());
    assert_eq!(ws.grid().get(0, 0).unwrap().key, keys[6]);
    assert_eq!(ws.row_labels().last().map(String::as_str), Some("10:00"));
}

#[test]
fn collisions_come_in_pairs_and_clear_resolves_them() {
    let teams = vec![
        Team {
            roster_id: "1".to_string(),
            team_id: "42".to_string(),
            name: "Byte Busters".to_string(),
            theme: "Agriculture".to_string(),
            problem_statement_id: None,
            priority: false,
        },
        Team {
            roster_id: "2".to_string(),
            team_id: "42".to_string(),
            name: "Byte Busters (resubmitted)".to_string(),
            theme: "Agriculture".to_string(),
            problem_statement_id: None,
            priority: false,
        },
    ];
    let mut ws = Workspace::new(morning(), 3, TeamPool::new(teams), PriorityRule::default()).unwrap();
    ws.place(2, 0, &AssignmentKey::new("1", "42")).unwrap();
    let report = ws.place(2, 2, &AssignmentKey::new("2", "42")).unwrap();

    let expected: BTreeSet<CellRef> = [CellRef::new(2, 0), CellRef::new(2, 2)].into_iter().collect();
    assert_eq!(report.collisions, expected);
    assert_eq!(detect_collisions(ws.grid()), expected);

    let cleared = ws.clear();
    assert_eq!(cleared.released.len(), 2);
    assert!(cleared.collisions.is_empty());
    assert!(ws.clear().released.is_empty());
}

#[test]
fn saved_session_reloads_and_exports() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("data"));
    let rule = PriorityRule::with_token("jagermeister");

    let mut ws = Workspace::new(morning(), 2, TeamPool::new(roster()), rule.clone()).unwrap();
    let (summary, _) = ws.auto_plan(2, DistributionMode::Random, 11);
    assert_eq!(summary.teams_placed, 7);
    assert_eq!(ws.save(&store, &store).unwrap(), 7);

    let (reloaded, dropped) = Workspace::load(&store, &store, 2, TeamPool::new(roster()), rule).unwrap();
    assert!(dropped.is_empty());
    assert_eq!(reloaded.grid(), ws.grid());

    let rows = store.load_all().unwrap();
    assert_eq!(available_panels(&rows), vec![1, 2]);
    let written = export_panels_to_dir(&rows, &dir.path().join("out")).unwrap();
    assert_eq!(written.len(), 3);
}

#[test]
fn evening_rows_of_a_long_day_reload_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());
    let long_day = ScheduleConfig {
        start_time: "8:00".to_string(),
        end_time: "21:00".to_string(),
        duration: 60,
    };
    let mut ws = Workspace::new(long_day, 1, TeamPool::new(roster()), PriorityRule::default()).unwrap();
    assert_eq!(ws.row_labels()[0], ws.row_labels()[12]);
    ws.place(12, 0, &AssignmentKey::new("1", "3982")).unwrap();
    ws.save(&store, &store).unwrap();

    let (reloaded, dropped) =
        Workspace::load(&store, &store, 1, TeamPool::new(roster()), PriorityRule::default()).unwrap();
    assert!(dropped.is_empty());
    assert!(reloaded.grid().is_empty_at(0, 0));
    assert_eq!(reloaded.grid(), ws.grid());
}

#[test]
fn rows_outside_new_window_are_dropped_on_load() {
    let store = MemoryStore::new();
    let mut ws = Workspace::new(morning(), 1, TeamPool::new(roster()), PriorityRule::default()).unwrap();
    ws.place(5, 0, &AssignmentKey::new("1", "3982")).unwrap();
    ws.save(&store, &store).unwrap();

    store
        .save(&ScheduleConfig {
            start_time: "9:00".to_string(),
            end_time: "9:30".to_string(),
            duration: 10,
        })
        .unwrap();
    let (reloaded, dropped) =
        Workspace::load(&store, &store, 1, TeamPool::new(roster()), PriorityRule::default()).unwrap();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].time, "9:50");
    assert_eq!(reloaded.grid().occupied_count(), 0);
}
