use actix_files::Files;
use actix_web::{middleware, web, App, HttpResponse, HttpServer, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::SchedulerError;
use crate::export::{available_panels, rows_for_panel, rows_for_theme, rows_to_csv_string, theme_file_stem, PanelRow};
use crate::parser::{load_roster, load_roster_from_reader};
use crate::pool::{RosterSource, TeamPool};
use crate::schedule::random::time_seed;
use crate::schedule::{AssignmentKey, CellRef, DistributionMode, ScheduleConfig};
use crate::store::{GridStore, JsonFileStore, ScheduleConfigStore};
use crate::workspace::{EditReport, Workspace};

const ROSTER_FILE: &str = "roster.csv";

pub struct AppState {
    pub workspace: Mutex<Workspace>,
    pub store: JsonFileStore,
    pub config: AppConfig,
}

impl AppState {
    /// Restores the last saved session from the data directory. A store that
    /// cannot be read falls back to an empty session.
    pub fn new(config: AppConfig) -> Result<Self, SchedulerError> {
        let store = JsonFileStore::new(&config.data_dir).with_default_schedule(config.schedule.clone());
        let roster_path = config.data_dir.join(ROSTER_FILE);
        let pool = if roster_path.exists() {
            TeamPool::new(load_roster(&roster_path)?)
        } else {
            TeamPool::default()
        };

        let workspace = match Workspace::load(&store, &store, config.default_panels, pool.clone(), config.priority_rule()) {
            Ok((workspace, dropped)) => {
                if !dropped.is_empty() {
                    warn!(dropped = dropped.len(), "Saved rows did not match the saved schedule");
                }
                workspace
            }
            Err(e) => {
                warn!(error = %e, "Starting with an empty session");
                Workspace::new(config.schedule.clone(), config.default_panels, pool, config.priority_rule())?
            }
        };

        Ok(Self {
            workspace: Mutex::new(workspace),
            store,
            config,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Workspace>> {
        self.workspace
            .lock()
            .map_err(|_| actix_web::error::ErrorInternalServerError("Workspace lock poisoned"))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRequest {
    slot: usize,
    panel: usize,
    unique_id: String,
}

#[derive(Deserialize)]
pub struct CellRequest {
    slot: usize,
    panel: usize,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    from: CellRequest,
    to: CellRequest,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    start_slot: usize,
    panel: usize,
    unique_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct AutomateRequest {
    panels: Option<usize>,
    mode: Option<DistributionMode>,
    seed: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    unique_id: String,
    team_name: String,
    team_id: String,
    used: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeTeamsResponse {
    theme_name: String,
    teams: Vec<TeamView>,
}

#[derive(Serialize)]
pub struct CollisionView {
    slot: usize,
    panel: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridResponse {
    duration: i64,
    times: Vec<String>,
    panels: usize,
    meets: Vec<PanelRow>,
    collisions: Vec<CollisionView>,
}

fn collision_views(report: &EditReport) -> Vec<CollisionView> {
    report
        .collisions
        .iter()
        .map(|c| CollisionView {
            slot: c.slot,
            panel: c.panel + 1,
        })
        .collect()
}

fn error_response(err: SchedulerError) -> HttpResponse {
    if err.is_warning() {
        warn!(error = %err, "Request finished with a warning");
    } else {
        debug!(error = %err, "Request rejected");
    }
    let body = serde_json::json!({"success": false, "error": err.to_string()});
    match err {
        SchedulerError::PersistenceUnavailable(_) => HttpResponse::ServiceUnavailable().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

fn edit_response(result: Result<EditReport, SchedulerError>) -> HttpResponse {
    match result {
        Ok(report) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "placed": report.placed.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "released": report.released.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "rowsAppended": report.rows_appended,
            "collisions": collision_views(&report),
        })),
        Err(e) => error_response(e),
    }
}

/// Panels are numbered from 1 on the wire
fn column(panel: usize) -> Result<usize, SchedulerError> {
    panel
        .checked_sub(1)
        .ok_or_else(|| SchedulerError::InvalidInput("Panel numbers start at 1".to_string()))
}

fn parse_key(unique_id: &str) -> Result<AssignmentKey, SchedulerError> {
    unique_id
        .parse()
        .map_err(SchedulerError::InvalidInput)
}

fn csv_download(rows: &[PanelRow], filename: &str) -> HttpResponse {
    match rows_to_csv_string(rows) {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv")
            .insert_header(("Content-Disposition", format!("attachment; filename=\"{}\"", filename)))
            .body(csv),
        Err(e) => error_response(e),
    }
}

// Duration config endpoints
async fn get_duration(state: web::Data<AppState>) -> Result<HttpResponse> {
    let ws = state.lock()?;
    Ok(HttpResponse::Ok().json(ws.config()))
}

async fn save_duration(req: web::Json<ScheduleConfig>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut ws = state.lock()?;
    let report = match ws.update_schedule(req.into_inner()) {
        Ok(report) => report,
        Err(e) => return Ok(error_response(e)),
    };
    if let Err(e) = state.store.save(ws.config()) {
        warn!(error = %e, "Duration config kept locally but not saved");
        return Ok(error_response(e));
    }
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Duration configuration saved successfully",
        "config": ws.config(),
        "released": report.released.iter().map(ToString::to_string).collect::<Vec<_>>(),
    })))
}

// Roster upload endpoint
async fn upload_roster(body: web::Bytes, state: web::Data<AppState>) -> Result<HttpResponse> {
    let teams = match load_roster_from_reader(&body[..]) {
        Ok(teams) => teams,
        Err(e) => return Ok(error_response(e)),
    };
    let count = teams.len();

    let roster_path = state.config.data_dir.join(ROSTER_FILE);
    if let Err(e) = std::fs::create_dir_all(&state.config.data_dir).and_then(|_| std::fs::write(&roster_path, &body)) {
        warn!(error = %e, "Roster loaded but not written to the data directory");
    }

    state.lock()?.replace_roster(TeamPool::new(teams));
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": count,
    })))
}

async fn get_themes(state: web::Data<AppState>) -> Result<HttpResponse> {
    let ws = state.lock()?;
    Ok(HttpResponse::Ok().json(ws.pool().themes()))
}

async fn get_theme_teams(theme: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let ws = state.lock()?;
    let theme = theme.into_inner();
    let used = ws.used_keys();
    let teams = match ws.pool().fetch_teams_by_theme(&theme) {
        Ok(teams) => teams,
        Err(e) => return Ok(error_response(e)),
    };
    Ok(HttpResponse::Ok().json(ThemeTeamsResponse {
        theme_name: theme,
        teams: teams
            .iter()
            .map(|t| TeamView {
                unique_id: t.key().to_string(),
                team_name: t.name.clone(),
                team_id: t.team_id.clone(),
                used: used.contains(&t.key()),
            })
            .collect(),
    }))
}

// Grid endpoints
async fn get_panels(state: web::Data<AppState>) -> Result<HttpResponse> {
    let ws = state.lock()?;
    Ok(HttpResponse::Ok().json(GridResponse {
        duration: ws.config().duration,
        times: ws.row_labels(),
        panels: ws.grid().panel_count(),
        meets: ws.export_rows(),
        collisions: ws
            .collisions()
            .iter()
            .map(|c| CollisionView {
                slot: c.slot,
                panel: c.panel + 1,
            })
            .collect(),
    }))
}

async fn place_team(req: web::Json<PlaceRequest>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut ws = state.lock()?;
    let result = parse_key(&req.unique_id)
        .and_then(|key| column(req.panel).map(|panel| (key, panel)))
        .and_then(|(key, panel)| ws.place(req.slot, panel, &key));
    Ok(edit_response(result))
}

async fn move_team(req: web::Json<MoveRequest>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut ws = state.lock()?;
    let result = column(req.from.panel)
        .and_then(|from| column(req.to.panel).map(|to| (from, to)))
        .and_then(|(from, to)| {
            ws.move_team(CellRef::new(req.from.slot, from), CellRef::new(req.to.slot, to))
        });
    Ok(edit_response(result))
}

async fn remove_team(req: web::Json<CellRequest>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut ws = state.lock()?;
    let result = column(req.panel).and_then(|panel| ws.remove(req.slot, panel));
    Ok(edit_response(result))
}

async fn bulk_insert(req: web::Json<BulkRequest>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut ws = state.lock()?;
    let keys: Result<Vec<AssignmentKey>, SchedulerError> = req.unique_ids.iter().map(|id| parse_key(id)).collect();
    let result = keys
        .and_then(|keys| column(req.panel).map(|panel| (keys, panel)))
        .and_then(|(keys, panel)| ws.bulk_insert(req.start_slot, panel, &keys));
    Ok(edit_response(result))
}

async fn add_panel(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut ws = state.lock()?;
    Ok(edit_response(Ok(ws.add_panel())))
}

/// Clears the grid and the stored rows
async fn clear_panels(state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut ws = state.lock()?;
    let report = ws.clear();
    if let Err(e) = state.store.clear() {
        return Ok(error_response(e));
    }
    Ok(edit_response(Ok(report)))
}

async fn automate(req: web::Json<AutomateRequest>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let mut ws = state.lock()?;
    let panels = req.panels.unwrap_or(state.config.default_panels);
    let mode = req.mode.unwrap_or(state.config.distribution);
    let seed = req.seed.unwrap_or_else(time_seed);
    let (summary, _) = ws.auto_plan(panels, mode, seed);
    if summary.teams_placed == 0 {
        warn!("{}", SchedulerError::EmptyRoster);
    }
    Ok(HttpResponse::Ok().json(summary))
}

async fn save_panels(state: web::Data<AppState>) -> Result<HttpResponse> {
    let ws = state.lock()?;
    match ws.save(&state.store, &state.store) {
        Ok(count) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Panels saved successfully",
            "count": count,
        }))),
        Err(e) => Ok(error_response(e)),
    }
}

// Download endpoints read what was last saved
fn saved_rows(state: &AppState) -> Result<Vec<PanelRow>, HttpResponse> {
    match state.store.load_all() {
        Ok(rows) if rows.is_empty() => {
            Err(HttpResponse::NotFound().json(serde_json::json!({"error": "No panel data found"})))
        }
        Ok(rows) => Ok(rows),
        Err(e) => Err(error_response(e)),
    }
}

async fn get_available_panels(state: web::Data<AppState>) -> Result<HttpResponse> {
    match state.store.load_all() {
        Ok(rows) => Ok(HttpResponse::Ok().json(available_panels(&rows))),
        Err(e) => Ok(error_response(e)),
    }
}

async fn download_panel(panel: web::Path<usize>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let panel = panel.into_inner();
    let rows = match saved_rows(&state) {
        Ok(rows) => rows_for_panel(&rows, panel),
        Err(resp) => return Ok(resp),
    };
    if rows.is_empty() {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("No data found for panel {}", panel)
        })));
    }
    Ok(csv_download(&rows, &format!("panel_{}.csv", panel)))
}

async fn download_all_panels(state: web::Data<AppState>) -> Result<HttpResponse> {
    match saved_rows(&state) {
        Ok(rows) => Ok(csv_download(&rows, "all_panels.csv")),
        Err(resp) => Ok(resp),
    }
}

async fn download_theme(theme: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let theme = theme.into_inner();
    match saved_rows(&state) {
        Ok(rows) => Ok(csv_download(
            &rows_for_theme(&rows, &theme),
            &format!("{}.csv", theme_file_stem(&theme)),
        )),
        Err(resp) => Ok(resp),
    }
}

/// Registers the JSON API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/duration", web::get().to(get_duration))
        .route("/api/duration", web::post().to(save_duration))
        .route("/api/upload", web::post().to(upload_roster))
        .route("/api/themes", web::get().to(get_themes))
        .route("/api/team/{theme}", web::get().to(get_theme_teams))
        .route("/api/panels", web::get().to(get_panels))
        .route("/api/panels/place", web::post().to(place_team))
        .route("/api/panels/move", web::post().to(move_team))
        .route("/api/panels/remove", web::post().to(remove_team))
        .route("/api/panels/bulk", web::post().to(bulk_insert))
        .route("/api/panels/add", web::post().to(add_panel))
        .route("/api/panels/clear", web::delete().to(clear_panels))
        .route("/api/panels/automate", web::post().to(automate))
        .route("/api/panels/save", web::post().to(save_panels))
        .route("/api/panels/available", web::get().to(get_available_panels))
        .route("/api/download/panels", web::get().to(download_all_panels))
        .route("/api/download/panel/{panel}", web::get().to(download_panel))
        .route("/api/download/theme/{theme}", web::get().to(download_theme));
}

pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    let port = config.port;
    let static_dir: Option<PathBuf> = config.static_dir.clone();
    let app_state = web::Data::new(AppState::new(config)?);

    info!(port, "Starting web server");

    HttpServer::new(move || {
        let app = App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure);
        match &static_dir {
            Some(dir) => app.service(Files::new("/", dir).index_file("index.html")),
            None => app,
        }
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;
    Ok(())
}
