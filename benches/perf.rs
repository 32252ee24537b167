use std::collections::HashSet;

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use gameday_sync::document::Document;
use gameday_sync::normalize::{NormalizerConfig, normalize_date_in_year, normalize_time};
use gameday_sync::orchestrator::Orchestrator;
use gameday_sync::reconcile::{RowKey, StalePolicy, reconcile};
use gameday_sync::stats_extract::{StatSchema, extract_player_stats};
use gameday_sync::strategy::ExtractContext;

fn orchestrator() -> Orchestrator {
    Orchestrator::new(NormalizerConfig::default(), ExtractContext { default_year: 2026 })
}

fn bench_table_extract(c: &mut Criterion) {
    let orchestrator = orchestrator();
    c.bench_function("table_extract", |b| {
        b.iter(|| {
            let doc = Document::parse(black_box(PRINT_SCHEDULE_HTML));
            let games = orchestrator.extract_document(&doc).unwrap();
            black_box(games.1.len());
        })
    });
}

fn bench_graph_extract(c: &mut Criterion) {
    let orchestrator = orchestrator();
    c.bench_function("graph_extract", |b| {
        b.iter(|| {
            let doc = Document::parse(black_box(NUXT_SCHEDULE_HTML));
            let games = orchestrator.extract_document(&doc).unwrap();
            black_box(games.1.len());
        })
    });
}

fn bench_stats_lookup(c: &mut Criterion) {
    let schema = StatSchema::batting();
    c.bench_function("stats_lookup", |b| {
        b.iter(|| {
            let doc = Document::parse(black_box(STATS_HTML));
            black_box(extract_player_stats(&doc, &schema, "7"));
        })
    });
}

fn bench_normalizers(c: &mut Criterion) {
    let samples = ["Feb 13 (Fri)", "3/14/26", "March 14, 2026", "2026-03-14", "TBA"];
    let times = ["4:00 PM", "18:00", "6 PM", "TBA"];
    c.bench_function("normalizers", |b| {
        b.iter(|| {
            for s in samples {
                black_box(normalize_date_in_year(black_box(s), 2026));
            }
            for t in times {
                black_box(normalize_time(black_box(t)));
            }
        })
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let existing: Vec<Vec<String>> = (0..2_000)
        .map(|i| {
            vec![
                format!("School {}", i % 40),
                "D1".to_string(),
                format!("2026-03-{:02}", i % 28 + 1),
                "TBD".to_string(),
                format!("Opponent {i}"),
            ]
        })
        .collect();
    let incoming: Vec<Vec<String>> = existing
        .iter()
        .filter(|r| r[0] == "School 3")
        .cloned()
        .collect();
    let scope: HashSet<String> = HashSet::from(["School 3".to_string()]);
    c.bench_function("reconcile", |b| {
        b.iter(|| {
            let out = reconcile(
                black_box(existing.clone()),
                black_box(incoming.clone()),
                &RowKey::schedule(),
                &scope,
                StalePolicy::Drop,
            );
            black_box(out.rows.len());
        })
    });
}

criterion_group!(
    perf,
    bench_table_extract,
    bench_graph_extract,
    bench_stats_lookup,
    bench_normalizers,
    bench_reconcile
);
criterion_main!(perf);

static PRINT_SCHEDULE_HTML: &str = include_str!("../tests/fixtures/print_schedule.html");
static NUXT_SCHEDULE_HTML: &str = include_str!("../tests/fixtures/nuxt_schedule.html");
static STATS_HTML: &str = include_str!("../tests/fixtures/stats_page.html");
