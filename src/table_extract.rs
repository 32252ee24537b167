use std::collections::HashMap;

use crate::classify::Layout;
use crate::document::{Document, TableGrid};
use crate::error::StrategyMiss;
use crate::normalize::{
    NormalizerConfig, VenueSignals, canonical_broadcast, classify_home_away, clean_opponent,
    collapse_ws, find_broadcast_mention, find_result, looks_like_time, normalize_date_in_year,
    normalize_time,
};
use crate::records::GameTime;
use crate::strategy::{ExtractContext, GameDraft, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Date,
    Opponent,
    Time,
    Location,
    Result,
    Broadcast,
}

/// Header keyword sets, checked in order. A header takes the first role
/// whose keywords it contains; a role keeps the first header it gets.
#[derive(Debug, Clone)]
pub struct HeaderRoles {
    pub roles: Vec<(ColumnRole, Vec<String>)>,
}

impl Default for HeaderRoles {
    fn default() -> Self {
        let role = |r: ColumnRole, words: &[&str]| {
            (r, words.iter().map(|w| w.to_string()).collect::<Vec<_>>())
        };
        Self {
            roles: vec![
                role(ColumnRole::Date, &["date", "day"]),
                role(ColumnRole::Opponent, &["opponent", "team", "vs", "game"]),
                role(ColumnRole::Time, &["time", "start"]),
                role(
                    ColumnRole::Location,
                    &["location", "site", "venue", "city", "place"],
                ),
                role(ColumnRole::Result, &["result", "score", "w/l", "record"]),
                role(
                    ColumnRole::Broadcast,
                    &["tv", "broadcast", "network", "coverage"],
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: HashMap<ColumnRole, usize>,
}

impl ColumnMap {
    pub fn from_headers(headers: &[String], roles: &HeaderRoles) -> Self {
        let mut columns = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            let lower = header.trim().to_lowercase();
            if lower.is_empty() {
                continue;
            }
            let matched = roles
                .roles
                .iter()
                .find(|(_, words)| words.iter().any(|w| lower.contains(w.as_str())));
            if let Some((role, _)) = matched {
                columns.entry(*role).or_insert(idx);
            }
        }
        Self { columns }
    }

    pub fn get(&self, role: ColumnRole) -> Option<usize> {
        self.columns.get(&role).copied()
    }

    /// The assigned cell for `role`, when assigned, present and non-blank.
    fn cell<'a>(&self, role: ColumnRole, cells: &'a [String]) -> Option<&'a str> {
        let idx = self.get(role)?;
        cells
            .get(idx)
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableStrategy {
    pub roles: HeaderRoles,
    pub normalizer: NormalizerConfig,
    pub threshold: usize,
}

impl TableStrategy {
    pub fn new(normalizer: NormalizerConfig, threshold: usize) -> Self {
        Self {
            roles: HeaderRoles::default(),
            normalizer,
            threshold,
        }
    }

    pub fn extract_table(&self, table: &TableGrid, ctx: &ExtractContext) -> Vec<GameDraft> {
        if table.rows.is_empty() {
            return Vec::new();
        }
        let columns = ColumnMap::from_headers(&table.row_texts(0), &self.roles);
        (1..table.rows.len())
            .filter_map(|idx| self.row_draft(&columns, &table.row_texts(idx), ctx))
            .collect()
    }

    fn row_draft(
        &self,
        columns: &ColumnMap,
        cells: &[String],
        ctx: &ExtractContext,
    ) -> Option<GameDraft> {
        if cells.len() < 2 || cells.iter().all(|c| c.trim().is_empty()) {
            return None;
        }
        let full = collapse_ws(&cells.join(" "));
        let year = ctx.default_year;

        let date = columns
            .cell(ColumnRole::Date, cells)
            .and_then(|c| normalize_date_in_year(c, year))
            .or_else(|| cells.iter().find_map(|c| normalize_date_in_year(c, year)))?;

        let opponent_raw = columns
            .cell(ColumnRole::Opponent, cells)
            .map(str::to_string)
            .or_else(|| {
                cells
                    .iter()
                    .filter(|c| {
                        !c.trim().is_empty()
                            && normalize_date_in_year(c, year).is_none()
                            && !looks_like_time(c)
                    })
                    .max_by_key(|c| c.len())
                    .cloned()
            })?;
        let opponent = clean_opponent(&opponent_raw, &self.normalizer)?;

        let location = columns
            .cell(ColumnRole::Location, cells)
            .unwrap_or_default()
            .to_string();
        let home_away = classify_home_away(
            VenueSignals {
                location: Some(location.as_str()).filter(|l| !l.is_empty()),
                marker: opponent.marker,
                row_text: Some(full.as_str()),
            },
            &self.normalizer,
        );

        let mut time = columns
            .cell(ColumnRole::Time, cells)
            .map(normalize_time)
            .unwrap_or(GameTime::Tbd);
        if time == GameTime::Tbd {
            time = cells
                .iter()
                .map(|c| normalize_time(c))
                .find(|t| *t != GameTime::Tbd)
                .unwrap_or(GameTime::Tbd);
        }

        let broadcast = columns
            .cell(ColumnRole::Broadcast, cells)
            .map(|c| canonical_broadcast(c, &self.normalizer))
            .filter(|b| !b.is_empty())
            .or_else(|| find_broadcast_mention(&full, &self.normalizer))
            .unwrap_or_default();

        let result = columns
            .cell(ColumnRole::Result, cells)
            .map(collapse_ws)
            .or_else(|| find_result(&full))
            .unwrap_or_default();

        Some(GameDraft {
            date,
            time,
            opponent: opponent.name,
            home_away,
            location,
            broadcast,
            result,
        })
    }
}

impl Strategy for TableStrategy {
    fn layout(&self) -> Layout {
        Layout::Table
    }

    fn extract(
        &self,
        doc: &Document,
        ctx: &ExtractContext,
    ) -> Result<Vec<GameDraft>, StrategyMiss> {
        let table = doc
            .best_schedule_table(self.threshold)
            .ok_or(StrategyMiss::NoTable)?;
        Ok(self.extract_table(&table, ctx))
    }
}
