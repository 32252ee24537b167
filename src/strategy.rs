use chrono::{Datelike, Local, NaiveDate};

use crate::classify::Layout;
use crate::document::Document;
use crate::error::StrategyMiss;
use crate::records::{GameTime, HomeAway};

/// A game as a strategy sees it, before source tagging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDraft {
    pub date: NaiveDate,
    pub time: GameTime,
    pub opponent: String,
    pub home_away: HomeAway,
    pub location: String,
    pub broadcast: String,
    pub result: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ExtractContext {
    /// Year assumed for dates printed without one.
    pub default_year: i32,
}

impl ExtractContext {
    pub fn current() -> Self {
        Self {
            default_year: Local::now().year(),
        }
    }
}

impl Default for ExtractContext {
    fn default() -> Self {
        Self::current()
    }
}

pub trait Strategy {
    fn layout(&self) -> Layout;

    /// `Ok` with an empty vec means the layout was found but every candidate
    /// was discarded.
    fn extract(
        &self,
        doc: &Document,
        ctx: &ExtractContext,
    ) -> Result<Vec<GameDraft>, StrategyMiss>;
}
