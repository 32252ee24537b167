use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::warn;

use crate::records::{PlayerConfig, PlayerKind, SourceConfig};

const CACHE_DIR: &str = "gameday_sync";
const DB_FILE: &str = "gameday.sqlite";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: Option<PathBuf>,
    pub sources_file: PathBuf,
    pub players_file: PathBuf,
    /// Minimum gap between two requests to the same run's fetcher.
    pub request_delay: Duration,
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            sources_file: PathBuf::from("schools.json"),
            players_file: PathBuf::from("players.json"),
            request_delay: Duration::from_millis(1500),
            http_timeout: Duration::from_secs(20),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: opt_env("GAMEDAY_DB_PATH")
                .map(PathBuf::from)
                .or(defaults.db_path),
            sources_file: opt_env("GAMEDAY_SOURCES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.sources_file),
            players_file: opt_env("GAMEDAY_PLAYERS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.players_file),
            request_delay: Duration::from_millis(
                env::var("GAMEDAY_REQUEST_DELAY_MS")
                    .ok()
                    .and_then(|val| val.parse::<u64>().ok())
                    .unwrap_or(1500),
            ),
            http_timeout: Duration::from_secs(
                env::var("GAMEDAY_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|val| val.parse::<u64>().ok())
                    .unwrap_or(20)
                    .max(1),
            ),
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        if val.trim().is_empty() {
            None
        } else {
            Some(val)
        }
    })
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Some(base) = opt_env("XDG_CACHE_HOME") {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = opt_env("HOME")?;
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}

/// Reads a JSON array of source entries. Entries without a name are skipped.
pub fn load_sources(path: &Path) -> Result<Vec<SourceConfig>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read sources file {}", path.display()))?;
    parse_sources(&raw).with_context(|| format!("parse sources file {}", path.display()))
}

pub fn parse_sources(raw: &str) -> Result<Vec<SourceConfig>> {
    let entries = json_array(raw)?;
    let mut out = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let Some(id) = pick_string(entry, &["school", "name"]) else {
            warn!(entry = idx, "source entry has no name, skipping");
            continue;
        };
        out.push(SourceConfig {
            id,
            url: pick_string(entry, &["schedule_url", "url"]),
            division: pick_string(entry, &["division"]).unwrap_or_default(),
            external_id: pick_string(entry, &["espn_team_id", "external_id"]).unwrap_or_default(),
        });
    }
    Ok(out)
}

pub fn load_players(path: &Path) -> Result<Vec<PlayerConfig>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read players file {}", path.display()))?;
    parse_players(&raw).with_context(|| format!("parse players file {}", path.display()))
}

pub fn parse_players(raw: &str) -> Result<Vec<PlayerConfig>> {
    let entries = json_array(raw)?;
    let mut out = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let Some(player_id) = pick_string(entry, &["PlayerID", "player_id", "id"]) else {
            warn!(entry = idx, "player entry has no id, skipping");
            continue;
        };
        let kind = match pick_string(entry, &["Type", "type", "kind"]) {
            Some(t) if t.eq_ignore_ascii_case("hitter") => PlayerKind::Hitter,
            Some(_) => PlayerKind::Pitcher,
            None => PlayerKind::Hitter,
        };
        out.push(PlayerConfig {
            name: pick_string(entry, &["Name", "name"]).unwrap_or_else(|| player_id.clone()),
            player_id,
            source_id: pick_string(entry, &["School", "school", "source"]).unwrap_or_default(),
            division: pick_string(entry, &["Division", "division"]).unwrap_or_default(),
            jersey: pick_string(entry, &["Jersey", "jersey"]).unwrap_or_default(),
            kind,
            stats_url: pick_string(entry, &["Stats_URL", "stats_url", "url"]),
        });
    }
    Ok(out)
}

fn json_array(raw: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(raw).context("invalid json")? {
        Value::Array(items) => Ok(items),
        other => Err(anyhow!("expected a json array, got {}", kind_name(&other))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// First key holding a non-empty string or a number.
fn pick_string(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(v) = value.get(*key) {
            let text = match v {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => continue,
            };
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}
