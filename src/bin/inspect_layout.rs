use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use gameday_sync::classify::{ClassifierConfig, classify};
use gameday_sync::document::Document;
use gameday_sync::graph::FlatGraph;
use gameday_sync::normalize::NormalizerConfig;
use gameday_sync::orchestrator::Orchestrator;
use gameday_sync::strategy::ExtractContext;

fn main() -> Result<()> {
    gameday_sync::init_tracing();

    let path = parse_path_arg()
        .ok_or_else(|| anyhow!("usage: inspect_layout <page.html> [--year YYYY]"))?;
    let raw =
        std::fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let ctx = parse_year_arg()
        .map(|default_year| ExtractContext { default_year })
        .unwrap_or_else(ExtractContext::current);

    let doc = Document::parse(&raw);
    let tables = doc.tables();
    println!("File: {} ({} bytes)", path.display(), raw.len());
    println!("Classified: {}", classify(&doc, &ClassifierConfig::default()));
    println!("Tables: {}", tables.len());
    for (idx, table) in tables.iter().enumerate() {
        println!(
            "  table {idx}: rows={} date_score={} header={:?}",
            table.rows.len(),
            table.date_score(),
            table.row_texts(0)
        );
    }
    if let Some(graph) = FlatGraph::from_document(&doc) {
        println!("Embedded reference array: {} nodes", graph.len());
    }

    let orchestrator = Orchestrator::new(NormalizerConfig::default(), ctx);
    match orchestrator.extract_document(&doc) {
        Some((layout, drafts)) => {
            println!("Extracted {} games via {layout}", drafts.len());
            for d in drafts {
                println!(
                    "  {} {:>8} {:<7} {} | {} | {} | {}",
                    d.date,
                    d.time.to_string(),
                    d.home_away.label(),
                    d.opponent,
                    d.location,
                    d.broadcast,
                    d.result
                );
            }
        }
        None => println!("No games extracted"),
    }
    Ok(())
}

fn parse_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--year" {
            skip_next = true;
            continue;
        }
        if !arg.starts_with("--") && !arg.trim().is_empty() {
            return Some(PathBuf::from(arg));
        }
    }
    None
}

fn parse_year_arg() -> Option<i32> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(year) = arg.strip_prefix("--year=") {
            return year.trim().parse().ok();
        }
        if arg == "--year" {
            return args.get(idx + 1).and_then(|y| y.trim().parse().ok());
        }
    }
    None
}
