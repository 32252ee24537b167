use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::classify::{ClassifierConfig, Layout, classify};
use crate::document::Document;
use crate::error::SourceError;
use crate::fallback_extract::FallbackStrategy;
use crate::graph::GraphStrategy;
use crate::normalize::NormalizerConfig;
use crate::records::{ScheduleRecord, SourceConfig};
use crate::strategy::{ExtractContext, GameDraft, Strategy};
use crate::table_extract::TableStrategy;

/// Supplies the raw document for a source. Network access, retries and
/// pacing all live behind this seam.
pub trait DocumentFetcher {
    fn fetch(&mut self, source: &SourceConfig) -> Result<String, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Extracted { layout: Layout, records: usize },
    NoRecords,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source_id: String,
    pub status: SourceStatus,
}

#[derive(Debug, Clone, Default)]
pub struct RunExtraction {
    pub records: Vec<ScheduleRecord>,
    pub outcomes: Vec<SourceOutcome>,
}

impl RunExtraction {
    pub fn extracted_sources(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, SourceStatus::Extracted { .. }))
            .count()
    }
}

pub struct Orchestrator {
    classifier: ClassifierConfig,
    strategies: Vec<Box<dyn Strategy>>,
    ctx: ExtractContext,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(NormalizerConfig::default(), ExtractContext::current())
    }
}

impl Orchestrator {
    pub fn new(normalizer: NormalizerConfig, ctx: ExtractContext) -> Self {
        let classifier = ClassifierConfig::default();
        let strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(TableStrategy::new(
                normalizer.clone(),
                classifier.table_threshold,
            )),
            Box::new(GraphStrategy::new(normalizer.clone())),
            Box::new(FallbackStrategy::new(normalizer)),
        ];
        Self {
            classifier,
            strategies,
            ctx,
        }
    }

    pub fn with_strategies(
        classifier: ClassifierConfig,
        strategies: Vec<Box<dyn Strategy>>,
        ctx: ExtractContext,
    ) -> Self {
        Self {
            classifier,
            strategies,
            ctx,
        }
    }

    /// Classifies the document, then walks the strategy chain from the
    /// classified layout down, stopping at the first non-empty result.
    pub fn extract_document(&self, doc: &Document) -> Option<(Layout, Vec<GameDraft>)> {
        let start = classify(doc, &self.classifier);
        debug!(layout = %start, "classified document");
        for layout in start.fallback_chain() {
            let Some(strategy) = self.strategies.iter().find(|s| s.layout() == layout) else {
                continue;
            };
            match strategy.extract(doc, &self.ctx) {
                Ok(drafts) if !drafts.is_empty() => return Some((layout, drafts)),
                Ok(_) => debug!(layout = %layout, "strategy found layout but no usable records"),
                Err(miss) => debug!(layout = %layout, %miss, "strategy missed"),
            }
        }
        None
    }

    pub fn extract_source(
        &self,
        source: &SourceConfig,
        raw: &str,
        captured_at: NaiveDateTime,
    ) -> (SourceStatus, Vec<ScheduleRecord>) {
        let doc = Document::parse(raw);
        let Some((layout, drafts)) = self.extract_document(&doc) else {
            return (SourceStatus::NoRecords, Vec::new());
        };
        let records: Vec<ScheduleRecord> = drafts
            .into_iter()
            .map(|d| tag_draft(d, source, captured_at))
            .collect();
        let status = SourceStatus::Extracted {
            layout,
            records: records.len(),
        };
        (status, records)
    }

    /// Processes sources in order. A failing source contributes nothing and
    /// the run moves on.
    pub fn run(
        &self,
        sources: &[SourceConfig],
        fetcher: &mut dyn DocumentFetcher,
        captured_at: NaiveDateTime,
    ) -> RunExtraction {
        let mut out = RunExtraction::default();
        for source in sources {
            info!(source = %source.id, "scraping");
            let status = if source.url.as_deref().is_none_or(|u| u.trim().is_empty()) {
                warn!(source = %source.id, "no document url, skipping");
                SourceStatus::Skipped("no document url".to_string())
            } else {
                match fetcher.fetch(source) {
                    Ok(raw) => {
                        let (status, records) = self.extract_source(source, &raw, captured_at);
                        match &status {
                            SourceStatus::Extracted { layout, records } => {
                                info!(source = %source.id, %layout, games = records, "extracted");
                            }
                            _ => warn!(
                                source = %source.id,
                                "no games parsed; save the page with --debug-dir to inspect it"
                            ),
                        }
                        out.records.extend(records);
                        status
                    }
                    Err(err) => {
                        warn!(source = %source.id, error = %err, "source failed");
                        SourceStatus::Failed(err.to_string())
                    }
                }
            };
            out.outcomes.push(SourceOutcome {
                source_id: source.id.clone(),
                status,
            });
        }
        out
    }
}

fn tag_draft(draft: GameDraft, source: &SourceConfig, captured_at: NaiveDateTime) -> ScheduleRecord {
    ScheduleRecord {
        source_id: source.id.clone(),
        division: source.division.clone(),
        date: draft.date,
        time: draft.time,
        opponent: draft.opponent,
        home_away: draft.home_away,
        location: draft.location,
        broadcast: draft.broadcast,
        result: draft.result,
        external_team_id: source.external_id.clone(),
        last_updated: captured_at,
    }
}
