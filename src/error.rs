use thiserror::Error;

/// A strategy found nothing it recognizes. Never fatal: the orchestrator
/// moves on to the next strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyMiss {
    #[error("no table with date-like rows")]
    NoTable,
    #[error("no embedded reference array")]
    NoGraph,
    #[error("embedded array has no schedule root")]
    NoScheduleRoot,
    #[error("no schedule fragments matched")]
    NoFragments,
    #[error("invalid fragment selector {0:?}")]
    BadSelector(String),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source {0:?} has no document url")]
    MissingUrl(String),
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },
}

/// Failures that abort a whole run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no sources configured")]
    NoSources,
    #[error("no source matching {0:?}")]
    NoMatchingSource(String),
    #[error("no players configured")]
    NoPlayers,
    #[error("no player with id {0:?}")]
    NoMatchingPlayer(String),
}
