use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use gameday_sync::config::{self, Settings};
use gameday_sync::http_client::HttpFetcher;
use gameday_sync::orchestrator::Orchestrator;
use gameday_sync::store::SqliteStore;
use gameday_sync::sync::{self, RunReport, ScheduleOptions, StatsOptions};

/// Scrapes athletics schedule and stats pages into a local store.
#[derive(Parser, Debug)]
#[command(name = "gameday_sync", version)]
struct Cli {
    /// SQLite store path
    #[arg(long, global = true, env = "GAMEDAY_DB_PATH")]
    db: Option<PathBuf>,

    /// Save every fetched page here for inspection
    #[arg(long, global = true, value_name = "DIR")]
    debug_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape schedules for the configured schools
    Schedule {
        /// Sources file (JSON array)
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Only write games dated today
        #[arg(long)]
        today: bool,

        /// Only scrape schools whose name contains this
        #[arg(long)]
        school: Option<String>,
    },
    /// Scrape season stats for the configured players
    Stats {
        /// Players file (JSON array)
        #[arg(long)]
        players: Option<PathBuf>,

        /// Only scrape this player id
        #[arg(long)]
        player: Option<String>,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    gameday_sync::init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env();
    let db_path = cli
        .db
        .clone()
        .or_else(|| settings.db_path.clone())
        .context("unable to resolve sqlite path")?;
    let mut store = SqliteStore::open(&db_path)?;
    let now = Local::now().naive_local();

    let report = match cli.command {
        Command::Schedule {
            sources,
            today,
            school,
        } => {
            let path = sources.unwrap_or_else(|| settings.sources_file.clone());
            let sources = config::load_sources(&path)?;
            let mut fetcher = HttpFetcher::new(settings.http_timeout, settings.request_delay)?
                .with_debug_dir(cli.debug_dir.clone());
            let orchestrator = Orchestrator::default();
            let opts = ScheduleOptions {
                school,
                today_only: today,
            };
            let report = sync::run_schedule_sync(
                &sources,
                &orchestrator,
                &mut fetcher,
                &mut store,
                &opts,
                now,
            )?;
            println!("Schedule sync complete");
            report
        }
        Command::Stats { players, player } => {
            let path = players.unwrap_or_else(|| settings.players_file.clone());
            let players = config::load_players(&path)?;
            let mut fetcher = HttpFetcher::new(settings.http_timeout, settings.request_delay)?
                .without_print_variants()
                .with_debug_dir(cli.debug_dir.clone());
            let opts = StatsOptions { player_id: player };
            let report = sync::run_stats_sync(&players, &mut fetcher, &mut store, &opts, now)?;
            println!("Stats sync complete");
            report
        }
    };

    print_report(&report, &db_path);
    Ok(())
}

fn print_report(report: &RunReport, db_path: &Path) {
    println!("DB: {}", db_path.display());
    println!(
        "Sources: {}/{}",
        report.sources_succeeded, report.sources_total
    );
    if report.persisted {
        println!(
            "Rows: {} (updated={} added={} removed={})",
            report.records, report.updated, report.inserted, report.dropped
        );
    } else {
        println!("Nothing written");
    }
    if !report.errors.is_empty() {
        println!("  errors: {}", report.errors.len());
        for err in report.errors.iter().take(6) {
            println!("   - {err}");
        }
    }
}

