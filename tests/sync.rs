use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};

use gameday_sync::error::SourceError;
use gameday_sync::normalize::NormalizerConfig;
use gameday_sync::orchestrator::{DocumentFetcher, Orchestrator};
use gameday_sync::records::{PlayerConfig, PlayerKind, SourceConfig, schedule_header};
use gameday_sync::store::{MemoryStore, SqliteStore, TabularStore};
use gameday_sync::strategy::ExtractContext;
use gameday_sync::sync::{
    SCHEDULE_HISTORY_SHEET, SCHEDULE_SHEET, SCRAPE_LOG_SHEET, ScheduleOptions, StatsOptions,
    run_schedule_sync, run_stats_sync,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

/// Serves fixture pages keyed by source id; unknown ids fail like a dead host.
struct FixtureFetcher {
    pages: HashMap<String, String>,
}

impl FixtureFetcher {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(id, fixture)| (id.to_string(), read_fixture(fixture)))
                .collect(),
        }
    }
}

impl DocumentFetcher for FixtureFetcher {
    fn fetch(&mut self, source: &SourceConfig) -> Result<String, SourceError> {
        self.pages
            .get(&source.id)
            .cloned()
            .ok_or_else(|| SourceError::Fetch {
                url: source.url.clone().unwrap_or_default(),
                reason: "http 503".to_string(),
            })
    }
}

fn source(id: &str) -> SourceConfig {
    SourceConfig {
        id: id.to_string(),
        url: Some(format!("https://{}.test/sports/baseball/schedule", id.to_lowercase())),
        division: "D1".to_string(),
        external_id: "120".to_string(),
    }
}

fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, 0, 0))
        .expect("valid timestamp")
}

fn orchestrator() -> Orchestrator {
    Orchestrator::new(NormalizerConfig::default(), ExtractContext { default_year: 2026 })
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store
        .rewrite(
            SCHEDULE_SHEET,
            &schedule_header(),
            &[
                row(&[
                    "Bravo", "D2", "2026-02-13", "1:00 PM", "Lander", "Home", "", "", "", "", "2026-02-01 09:00",
                ]),
                row(&[
                    "Alpha", "D1", "2026-02-13", "TBD", "Navy", "Home", "", "", "", "120", "2026-02-01 09:00",
                ]),
                row(&[
                    "Alpha", "D1", "2026-01-30", "TBD", "Cancelled Opponent", "Home", "", "", "", "120",
                    "2026-02-01 09:00",
                ]),
                row(&[
                    "Charlie", "D3", "2026-03-02", "TBD", "Salisbury", "Away", "", "", "", "", "2026-02-01 09:00",
                ]),
            ],
        )
        .unwrap();
    store
}

#[test]
fn scoped_run_leaves_other_sources_untouched() {
    let mut store = seeded_store();
    let before = store.read_rows(SCHEDULE_SHEET).unwrap();
    let mut fetcher = FixtureFetcher::new(&[("Alpha", "print_schedule.html")]);
    let sources = vec![source("Alpha"), source("Bravo"), source("Charlie")];
    let opts = ScheduleOptions {
        school: Some("alp".to_string()),
        today_only: false,
    };

    let report = run_schedule_sync(
        &sources,
        &orchestrator(),
        &mut fetcher,
        &mut store,
        &opts,
        at(2026, 2, 10, 8),
    )
    .unwrap();
    assert_eq!(report.sources_total, 1);
    assert_eq!(report.records, 4);
    assert_eq!((report.updated, report.inserted, report.dropped), (1, 3, 1));

    let after = store.read_rows(SCHEDULE_SHEET).unwrap();
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[3]);
    let alpha: Vec<&Vec<String>> = after.iter().filter(|r| r[0] == "Alpha").collect();
    assert_eq!(alpha.len(), 4);
    assert!(alpha.iter().all(|r| r[10] == "2026-02-10 08:00"));
    assert_eq!(after[1][4], "Navy");
    assert_eq!(after[1][3], "4:00 PM");
    assert!(after.iter().all(|r| r[4] != "Cancelled Opponent"));
}

#[test]
fn rerunning_the_same_input_is_idempotent() {
    let mut store = MemoryStore::new();
    let sources = vec![source("Alpha")];
    for _ in 0..2 {
        let mut fetcher = FixtureFetcher::new(&[("Alpha", "print_schedule.html")]);
        run_schedule_sync(
            &sources,
            &orchestrator(),
            &mut fetcher,
            &mut store,
            &ScheduleOptions::default(),
            at(2026, 2, 10, 8),
        )
        .unwrap();
    }
    assert_eq!(store.read_rows(SCHEDULE_SHEET).unwrap().len(), 4);
    assert_eq!(store.read_rows(SCHEDULE_HISTORY_SHEET).unwrap().len(), 8);
    assert_eq!(store.runs.len(), 2);
}

#[test]
fn failing_sources_never_clear_the_store() {
    let mut store = seeded_store();
    let before = store.read_rows(SCHEDULE_SHEET).unwrap();
    let mut fetcher = FixtureFetcher::new(&[]);
    let report = run_schedule_sync(
        &[source("Alpha"), source("Bravo")],
        &orchestrator(),
        &mut fetcher,
        &mut store,
        &ScheduleOptions::default(),
        at(2026, 2, 10, 8),
    )
    .unwrap();
    assert!(!report.persisted);
    assert_eq!(report.errors.len(), 2);
    assert_eq!(store.read_rows(SCHEDULE_SHEET).unwrap(), before);
    assert!(store.runs.is_empty());
}

#[test]
fn today_only_upserts_without_dropping() {
    let mut store = seeded_store();
    let mut fetcher = FixtureFetcher::new(&[("Alpha", "print_schedule.html")]);
    let opts = ScheduleOptions {
        school: None,
        today_only: true,
    };
    let report = run_schedule_sync(
        &[source("Alpha")],
        &orchestrator(),
        &mut fetcher,
        &mut store,
        &opts,
        at(2026, 2, 13, 7),
    )
    .unwrap();
    assert_eq!(report.records, 1);
    assert_eq!(report.dropped, 0);
    let rows = store.read_rows(SCHEDULE_SHEET).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][3], "4:00 PM");
}

#[test]
fn run_level_failures_are_errors() {
    let mut store = MemoryStore::new();
    let mut fetcher = FixtureFetcher::new(&[]);
    let none = run_schedule_sync(
        &[],
        &orchestrator(),
        &mut fetcher,
        &mut store,
        &ScheduleOptions::default(),
        at(2026, 2, 10, 8),
    );
    assert!(none.is_err());

    let unmatched = run_schedule_sync(
        &[source("Alpha")],
        &orchestrator(),
        &mut fetcher,
        &mut store,
        &ScheduleOptions {
            school: Some("zulu".to_string()),
            today_only: false,
        },
        at(2026, 2, 10, 8),
    );
    let err = unmatched.unwrap_err();
    assert!(err.to_string().contains("zulu"));
}

fn player(id: &str, jersey: &str, kind: PlayerKind) -> PlayerConfig {
    PlayerConfig {
        player_id: id.to_string(),
        name: format!("Player {id}"),
        source_id: "Alpha".to_string(),
        division: "D1".to_string(),
        jersey: jersey.to_string(),
        kind,
        stats_url: Some("https://alpha.test/sports/baseball/stats".to_string()),
    }
}

#[test]
fn stats_run_fills_category_sheets_and_the_log() {
    let mut store = MemoryStore::new();
    let mut fetcher = FixtureFetcher::new(&[
        ("P1", "stats_page.html"),
        ("P2", "stats_page.html"),
        ("P4", "stats_page.html"),
    ]);
    let players = vec![
        player("P1", "7", PlayerKind::Hitter),
        player("P2", "21", PlayerKind::Pitcher),
        player("P3", "", PlayerKind::Hitter),
        player("P4", "12", PlayerKind::Hitter),
        player("P5", "9", PlayerKind::Pitcher),
    ];
    let report = run_stats_sync(
        &players,
        &mut fetcher,
        &mut store,
        &StatsOptions::default(),
        at(2026, 3, 1, 9),
    )
    .unwrap();
    assert_eq!(report.sources_total, 5);
    assert_eq!(report.sources_succeeded, 4);
    assert_eq!(report.errors.len(), 1);

    let batting = store.read_rows("batting").unwrap();
    assert_eq!(batting.len(), 3);
    let header = store.header("batting").unwrap().unwrap();
    let hr = header.iter().position(|h| h == "HR").unwrap();
    assert_eq!(batting[0][1], "P1");
    assert_eq!(batting[0][hr], "3");
    assert_eq!(batting[1][1], "P3");
    assert_eq!(batting[1][hr], "0");

    let pitching = store.read_rows("pitching").unwrap();
    assert_eq!(pitching.len(), 1);
    let pitching_header = store.header("pitching").unwrap().unwrap();
    let k9 = pitching_header.iter().position(|h| h == "K_per_9").unwrap();
    assert_eq!(pitching[0][k9], "12.00");

    let defense = store.read_rows("defense").unwrap();
    let p4 = defense.iter().find(|r| r[1] == "P4").unwrap();
    assert_eq!(&p4[5..], &["0", "0", "0", "0", "0", "0"]);

    let log = store.read_rows(SCRAPE_LOG_SHEET).unwrap();
    assert_eq!(log.len(), 5);
    assert_eq!(log[0][4], "SUCCESS");
    assert_eq!(log[4][4], "ERROR");
    assert!(log[3][5].contains("defense"));
}

#[test]
fn stats_rerun_updates_rows_in_place() {
    let mut store = MemoryStore::new();
    let players = vec![
        player("P1", "7", PlayerKind::Hitter),
        player("P4", "12", PlayerKind::Hitter),
    ];
    for hour in [9, 10] {
        let mut fetcher =
            FixtureFetcher::new(&[("P1", "stats_page.html"), ("P4", "stats_page.html")]);
        run_stats_sync(
            &players,
            &mut fetcher,
            &mut store,
            &StatsOptions::default(),
            at(2026, 3, 1, hour),
        )
        .unwrap();
    }
    let batting = store.read_rows("batting").unwrap();
    assert_eq!(batting.len(), 2);
    assert_eq!(batting[0][0], "2026-03-01 10:00");
    assert_eq!(store.read_rows("batting_history").unwrap().len(), 4);

    let mut fetcher = FixtureFetcher::new(&[("P4", "stats_page.html")]);
    let only = StatsOptions {
        player_id: Some("P4".to_string()),
    };
    run_stats_sync(&players, &mut fetcher, &mut store, &only, at(2026, 3, 2, 9)).unwrap();
    let batting = store.read_rows("batting").unwrap();
    assert_eq!(batting.len(), 2);
    assert_eq!(batting[0][0], "2026-03-01 10:00");
    assert_eq!(batting[1][0], "2026-03-02 09:00");
}

#[test]
fn sqlite_store_round_trips_a_schedule_run() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let mut fetcher = FixtureFetcher::new(&[("Alpha", "print_schedule.html")]);
    run_schedule_sync(
        &[source("Alpha")],
        &orchestrator(),
        &mut fetcher,
        &mut store,
        &ScheduleOptions::default(),
        at(2026, 2, 10, 8),
    )
    .unwrap();
    let rows = store.read_rows(SCHEDULE_SHEET).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][4], "Clemson");
    assert_eq!(rows[1][5], "Away");
    assert_eq!(store.header(SCHEDULE_SHEET).unwrap(), Some(schedule_header()));
    assert_eq!(store.run_count("schedule").unwrap(), 1);
}
