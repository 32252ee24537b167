use std::collections::{BTreeMap, HashSet};

use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::document::Document;
use crate::error::RunError;
use crate::orchestrator::{DocumentFetcher, Orchestrator, SourceStatus};
use crate::reconcile::{Row, RowKey, StalePolicy, reconcile};
use crate::records::{
    PlayerConfig, SCRAPE_LOG_COLUMNS, SourceConfig, StatCategory, StatRecord, TIMESTAMP_FORMAT,
    schedule_header, stat_header,
};
use crate::stats_extract::{StatLookup, StatSchema, extract_player_stats};
use crate::store::{SyncRunLog, TabularStore};

pub const SCHEDULE_SHEET: &str = "schedule";
pub const SCHEDULE_HISTORY_SHEET: &str = "schedule_history";
pub const SCRAPE_LOG_SHEET: &str = "scrape_log";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleOptions {
    /// Case-insensitive substring match on source ids.
    pub school: Option<String>,
    pub today_only: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsOptions {
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sources_total: usize,
    pub sources_succeeded: usize,
    pub records: usize,
    pub updated: usize,
    pub inserted: usize,
    pub dropped: usize,
    pub persisted: bool,
    pub errors: Vec<String>,
}

pub fn select_sources(
    sources: &[SourceConfig],
    school: Option<&str>,
) -> Result<Vec<SourceConfig>, RunError> {
    if sources.is_empty() {
        return Err(RunError::NoSources);
    }
    let Some(needle) = school.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(sources.to_vec());
    };
    let needle = needle.to_lowercase();
    let picked: Vec<SourceConfig> = sources
        .iter()
        .filter(|s| s.id.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    if picked.is_empty() {
        return Err(RunError::NoMatchingSource(needle));
    }
    Ok(picked)
}

/// Scrapes the selected sources and folds the games into the `schedule`
/// sheet. A run that yields no games leaves the store untouched.
pub fn run_schedule_sync(
    sources: &[SourceConfig],
    orchestrator: &Orchestrator,
    fetcher: &mut dyn DocumentFetcher,
    store: &mut dyn TabularStore,
    opts: &ScheduleOptions,
    now: NaiveDateTime,
) -> Result<RunReport> {
    let started_at = Utc::now().to_rfc3339();
    let selected = select_sources(sources, opts.school.as_deref())?;
    info!(sources = selected.len(), "processing sources");

    let mut run = orchestrator.run(&selected, fetcher, now);
    let mut report = RunReport {
        sources_total: selected.len(),
        sources_succeeded: run.extracted_sources(),
        ..RunReport::default()
    };
    for outcome in &run.outcomes {
        if let SourceStatus::Failed(reason) = &outcome.status {
            report.errors.push(format!("{}: {reason}", outcome.source_id));
        }
    }

    if opts.today_only {
        let today = now.date();
        run.records.retain(|r| r.date == today);
        info!(games = run.records.len(), "kept games dated today");
    }
    report.records = run.records.len();
    if run.records.is_empty() {
        warn!("no games to write, store left untouched");
        return Ok(report);
    }

    let scope: HashSet<String> = run.records.iter().map(|r| r.source_id.clone()).collect();
    let incoming: Vec<Row> = run.records.iter().map(|r| r.to_row()).collect();
    let header = schedule_header();

    // Today-only runs see a slice of each schedule; nothing they miss is stale.
    let policy = if opts.today_only {
        StalePolicy::Keep
    } else {
        StalePolicy::Drop
    };
    let existing = store.read_rows(SCHEDULE_SHEET)?;
    let merged = reconcile(existing, incoming.clone(), &RowKey::schedule(), &scope, policy);
    store.rewrite(SCHEDULE_SHEET, &header, &merged.rows)?;
    store.append(SCHEDULE_HISTORY_SHEET, &header, &incoming)?;

    report.updated = merged.updated;
    report.inserted = merged.inserted;
    report.dropped = merged.dropped;
    report.persisted = true;

    store.record_run(&SyncRunLog {
        kind: "schedule".to_string(),
        started_at,
        finished_at: Utc::now().to_rfc3339(),
        sources_total: report.sources_total,
        sources_succeeded: report.sources_succeeded,
        rows_written: incoming.len(),
        errors: report.errors.clone(),
    })?;
    info!(
        games = report.records,
        updated = report.updated,
        inserted = report.inserted,
        dropped = report.dropped,
        "schedule written"
    );
    Ok(report)
}

pub fn select_players(
    players: &[PlayerConfig],
    player_id: Option<&str>,
) -> Result<Vec<PlayerConfig>, RunError> {
    if players.is_empty() {
        return Err(RunError::NoPlayers);
    }
    let Some(id) = player_id.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(players.to_vec());
    };
    let picked: Vec<PlayerConfig> = players
        .iter()
        .filter(|p| p.player_id == id)
        .cloned()
        .collect();
    if picked.is_empty() {
        return Err(RunError::NoMatchingPlayer(id.to_string()));
    }
    Ok(picked)
}

struct PlayerOutcome {
    records: Vec<StatRecord>,
    log: Row,
    error: Option<String>,
}

fn scrape_player(
    player: &PlayerConfig,
    fetcher: &mut dyn DocumentFetcher,
    now: NaiveDateTime,
) -> PlayerOutcome {
    let stamp = now.format(TIMESTAMP_FORMAT).to_string();
    let log_row = |status: &str, notes: String| -> Row {
        vec![
            stamp.clone(),
            player.player_id.clone(),
            player.name.clone(),
            player.source_id.clone(),
            status.to_string(),
            notes,
        ]
    };

    // A missing jersey cannot match any row, so the page is not worth a request.
    let doc = if player.jersey.trim().is_empty() {
        warn!(player = %player.player_id, "no jersey number, writing zeros");
        None
    } else {
        let target = SourceConfig {
            id: player.player_id.clone(),
            url: player.stats_url.clone(),
            division: player.division.clone(),
            external_id: String::new(),
        };
        match fetcher.fetch(&target) {
            Ok(raw) => Some(Document::parse(&raw)),
            Err(err) => {
                warn!(player = %player.player_id, error = %err, "stats page failed");
                return PlayerOutcome {
                    records: Vec::new(),
                    log: log_row("ERROR", err.to_string()),
                    error: Some(format!("{}: {err}", player.player_id)),
                };
            }
        }
    };

    let mut notes = Vec::new();
    let mut records = Vec::new();
    for &category in player.kind.categories() {
        let schema = StatSchema::for_category(category);
        let lookup = match doc.as_ref() {
            Some(doc) => extract_player_stats(doc, &schema, &player.jersey),
            None => StatLookup::NoJersey,
        };
        if !matches!(lookup, StatLookup::Found(_)) {
            notes.push(format!("{}: {}", category.sheet_name(), lookup.note()));
        }
        records.push(StatRecord {
            player_id: player.player_id.clone(),
            player_name: player.name.clone(),
            source_id: player.source_id.clone(),
            division: player.division.clone(),
            category,
            values: lookup.into_values(&schema),
            captured_at: now,
        });
    }
    PlayerOutcome {
        records,
        log: log_row("SUCCESS", notes.join("; ")),
        error: None,
    }
}

/// Scrapes each player's stats page and upserts one row per player into the
/// category sheets, keeping rows of players not in this run.
pub fn run_stats_sync(
    players: &[PlayerConfig],
    fetcher: &mut dyn DocumentFetcher,
    store: &mut dyn TabularStore,
    opts: &StatsOptions,
    now: NaiveDateTime,
) -> Result<RunReport> {
    let started_at = Utc::now().to_rfc3339();
    let selected = select_players(players, opts.player_id.as_deref())?;
    info!(players = selected.len(), "processing players");

    let mut report = RunReport {
        sources_total: selected.len(),
        ..RunReport::default()
    };
    let mut by_category: BTreeMap<StatCategory, Vec<StatRecord>> = BTreeMap::new();
    let mut log_rows = Vec::new();
    for player in &selected {
        info!(player = %player.player_id, name = %player.name, jersey = %player.jersey, "scraping stats");
        let outcome = scrape_player(player, fetcher, now);
        if let Some(err) = outcome.error {
            report.errors.push(err);
        } else {
            report.sources_succeeded += 1;
        }
        for rec in outcome.records {
            by_category.entry(rec.category).or_default().push(rec);
        }
        log_rows.push(outcome.log);
    }

    let log_header: Vec<String> = SCRAPE_LOG_COLUMNS.iter().map(|c| c.to_string()).collect();
    store.append(SCRAPE_LOG_SHEET, &log_header, &log_rows)?;

    let mut rows_written = 0;
    for (category, records) in &by_category {
        let schema = StatSchema::for_category(*category);
        let header = stat_header(&schema.columns);
        let incoming: Vec<Row> = records.iter().map(|r| r.to_row(&schema.columns)).collect();
        let scope: HashSet<String> = records.iter().map(|r| r.player_id.clone()).collect();

        let existing = store.read_rows(category.sheet_name())?;
        let merged = reconcile(
            existing,
            incoming.clone(),
            &RowKey::stats(),
            &scope,
            StalePolicy::Keep,
        );
        store.rewrite(category.sheet_name(), &header, &merged.rows)?;
        store.append(category.history_sheet_name(), &header, &incoming)?;

        report.updated += merged.updated;
        report.inserted += merged.inserted;
        rows_written += incoming.len();
        info!(
            sheet = category.sheet_name(),
            updated = merged.updated,
            added = merged.inserted,
            "stats written"
        );
    }
    report.records = rows_written;
    report.persisted = rows_written > 0;

    store.record_run(&SyncRunLog {
        kind: "stats".to_string(),
        started_at,
        finished_at: Utc::now().to_rfc3339(),
        sources_total: report.sources_total,
        sources_succeeded: report.sources_succeeded,
        rows_written,
        errors: report.errors.clone(),
    })?;
    Ok(report)
}
