use once_cell::sync::Lazy;
use regex::Regex;

use crate::classify::Layout;
use crate::document::Document;
use crate::error::StrategyMiss;
use crate::normalize::{
    NormalizerConfig, VenueMarker, VenueSignals, classify_home_away, clean_opponent,
    find_broadcast_mention, find_result, normalize_date_in_year, normalize_time,
};
use crate::strategy::{ExtractContext, GameDraft, Strategy};

pub const DEFAULT_FRAGMENT_SELECTOR: &str = "li.schedule-item, li[class*=\"game\"], \
     div.schedule-item, div[class*=\"game-item\"], article[class*=\"game\"]";

static MARKED_OPPONENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\b(?i:vs\.?|at)|@)\s+([A-Z][A-Za-z &.'-]+)").expect("marked opponent regex")
});

static TRAILING_OUTCOME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[WLT]$").expect("trailing outcome regex"));

/// Last-resort strategy over list items and cards.
#[derive(Debug, Clone)]
pub struct FallbackStrategy {
    pub selector: String,
    pub normalizer: NormalizerConfig,
}

impl Default for FallbackStrategy {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

impl FallbackStrategy {
    pub fn new(normalizer: NormalizerConfig) -> Self {
        Self {
            selector: DEFAULT_FRAGMENT_SELECTOR.to_string(),
            normalizer,
        }
    }

    pub fn fragment_draft(&self, text: &str, ctx: &ExtractContext) -> Option<GameDraft> {
        let date = normalize_date_in_year(text, ctx.default_year)?;

        let caps = MARKED_OPPONENT.captures(text)?;
        let whole = caps.get(0)?.as_str();
        let marker = if whole.starts_with('@') || whole.to_ascii_lowercase().starts_with("at") {
            VenueMarker::At
        } else {
            VenueMarker::Versus
        };
        let name = caps.get(1)?.as_str().trim();
        let name = TRAILING_OUTCOME.replace(name, "");
        let opponent = clean_opponent(&name, &self.normalizer)?;

        let home_away = classify_home_away(
            VenueSignals {
                location: None,
                marker: Some(marker),
                row_text: Some(text),
            },
            &self.normalizer,
        );

        Some(GameDraft {
            date,
            time: normalize_time(text),
            opponent: opponent.name,
            home_away,
            location: String::new(),
            broadcast: find_broadcast_mention(text, &self.normalizer).unwrap_or_default(),
            result: find_result(text).unwrap_or_default(),
        })
    }
}

impl Strategy for FallbackStrategy {
    fn layout(&self) -> Layout {
        Layout::Generic
    }

    fn extract(
        &self,
        doc: &Document,
        ctx: &ExtractContext,
    ) -> Result<Vec<GameDraft>, StrategyMiss> {
        let fragments = doc
            .fragment_texts(&self.selector)
            .ok_or_else(|| StrategyMiss::BadSelector(self.selector.clone()))?;
        if fragments.is_empty() {
            return Err(StrategyMiss::NoFragments);
        }
        Ok(fragments
            .iter()
            .filter_map(|text| self.fragment_draft(text, ctx))
            .collect())
    }
}
