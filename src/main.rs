use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use panel_splitter::config::AppConfig;
use panel_splitter::display::{print_grid, print_plan_summary};
use panel_splitter::export::{export_panels_to_dir, export_theme_to_dir, rows_for_panel, write_rows_csv};
use panel_splitter::parser::{apply_theme_map, load_roster, load_theme_map};
use panel_splitter::pool::TeamPool;
use panel_splitter::schedule::random::time_seed;
use panel_splitter::schedule::{generate_time_slots, DistributionMode};
use panel_splitter::store::{GridStore, JsonFileStore};
use panel_splitter::web;
use panel_splitter::workspace::Workspace;

#[derive(Parser)]
#[command(name = "panel-splitter", version, about = "Assigns competition teams to pitch slots across review panels")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, env = "PANEL_SPLITTER_CONFIG", default_value = "panel-splitter.toml")]
    config: PathBuf,

    /// Directory holding the saved schedule and panel assignments
    #[arg(long, env = "PANEL_SPLITTER_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the slot labels for a schedule window
    Slots {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        duration: i64,
    },
    /// Load a roster and generate an automatic panel assignment
    Plan {
        #[arg(long)]
        roster: PathBuf,
        /// Optional CSV mapping team ids to themes
        #[arg(long)]
        themes: Option<PathBuf>,
        #[arg(long)]
        panels: Option<usize>,
        /// "theme" or "random"
        #[arg(long)]
        mode: Option<DistributionMode>,
        #[arg(long)]
        seed: Option<u64>,
        /// Also write panel_N.csv files here
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write the saved assignments as CSV
    Export {
        #[arg(long, conflicts_with = "theme")]
        panel: Option<usize>,
        #[arg(long)]
        theme: Option<String>,
        #[arg(long, default_value = "exports")]
        output_dir: PathBuf,
    },
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "PANEL_SPLITTER_PORT")]
        port: Option<u16>,
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Command::Slots { start, end, duration } => {
            let labels = generate_time_slots(&start, &end, duration)?;
            println!("{} slots", labels.len());
            for (i, label) in labels.iter().enumerate() {
                println!("{:>3}  {}", i + 1, label);
            }
        }
        Command::Plan {
            roster,
            themes,
            panels,
            mode,
            seed,
            output_dir,
        } => {
            println!("Loading roster from CSV...");
            let mut teams = load_roster(&roster).with_context(|| format!("reading {}", roster.display()))?;
            if let Some(path) = themes {
                let map = load_theme_map(&path)?;
                let updated = apply_theme_map(&mut teams, &map);
                println!("Applied themes to {} teams", updated);
            }
            println!("Loaded {} teams", teams.len());

            let store = JsonFileStore::new(&config.data_dir).with_default_schedule(config.schedule.clone());
            let panels = panels.unwrap_or(config.default_panels);
            let mode = mode.unwrap_or(config.distribution);
            let seed = seed.unwrap_or_else(time_seed);

            let mut workspace = Workspace::new(
                config.schedule.clone(),
                panels,
                TeamPool::new(teams),
                config.priority_rule(),
            )?;
            let (summary, report) = workspace.auto_plan(panels, mode, seed);
            print_plan_summary(&summary);
            print_grid(workspace.grid(), &workspace.row_labels(), &report.collisions);

            let saved = workspace.save(&store, &store)?;
            println!("\nSaved {} assignments to {}", saved, store.dir().display());

            if let Some(dir) = output_dir {
                let written = export_panels_to_dir(&workspace.export_rows(), &dir)?;
                println!("Wrote {} files to {}", written.len(), dir.display());
            }
        }
        Command::Export {
            panel,
            theme,
            output_dir,
        } => {
            let store = JsonFileStore::new(&config.data_dir);
            let rows = store.load_all()?;
            if rows.is_empty() {
                println!("No saved assignments in {}", store.dir().display());
                return Ok(());
            }
            match (panel, theme) {
                (Some(panel), _) => {
                    let selected = rows_for_panel(&rows, panel);
                    if selected.is_empty() {
                        anyhow::bail!("Panel {} has no assignments", panel);
                    }
                    std::fs::create_dir_all(&output_dir)?;
                    let path = output_dir.join(format!("panel_{}.csv", panel));
                    write_rows_csv(&selected, std::fs::File::create(&path)?)?;
                    println!("Wrote {}", path.display());
                }
                (None, Some(theme)) => {
                    let path = export_theme_to_dir(&rows, &theme, &output_dir)?;
                    println!("Wrote {}", path.display());
                }
                (None, None) => {
                    let written = export_panels_to_dir(&rows, &output_dir)?;
                    println!("Wrote {} files to {}", written.len(), output_dir.display());
                }
            }
        }
        Command::Serve { port, static_dir } => {
            if let Some(port) = port {
                config.port = port;
            }
            if static_dir.is_some() {
                config.static_dir = static_dir;
            }
            info!(data_dir = %config.data_dir.display(), "Serving panel assignments");
            println!("Access the API at http://localhost:{}/api/panels", config.port);
            web::start_server(config).await?;
        }
    }

    Ok(())
}
