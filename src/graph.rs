use serde_json::{Map, Value};
use tracing::debug;

use crate::classify::Layout;
use crate::document::Document;
use crate::error::StrategyMiss;
use crate::normalize::{
    NormalizerConfig, VenueSignals, canonical_broadcast, classify_home_away, clean_opponent,
    find_result, normalize_time, strict_iso_date,
};
use crate::records::{GameTime, HomeAway};
use crate::strategy::{ExtractContext, GameDraft, Strategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef(pub usize);

/// A serialized array whose elements refer to each other by position.
/// Lookups are single hops and bounds-checked; nothing here follows
/// references recursively, so cycles in the payload are harmless.
#[derive(Debug, Clone)]
pub struct FlatGraph {
    nodes: Vec<Value>,
}

impl FlatGraph {
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Array(nodes) = value else {
            return None;
        };
        let len = nodes.len();
        let has_refs = nodes.iter().any(|node| {
            node.as_object().is_some_and(|map| {
                map.values()
                    .any(|v| v.as_u64().is_some_and(|i| (i as usize) < len))
            })
        });
        has_refs.then_some(Self { nodes })
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                return Self::from_value(value);
            }
        }
        let start = trimmed.find('[')?;
        let end = trimmed.rfind(']')?;
        if end <= start {
            return None;
        }
        let value = serde_json::from_str::<Value>(&trimmed[start..=end]).ok()?;
        Self::from_value(value)
    }

    pub fn from_document(doc: &Document) -> Option<Self> {
        doc.script_bodies().iter().find_map(|body| Self::parse(body))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, handle: NodeRef) -> Option<&Value> {
        self.nodes.get(handle.0)
    }

    /// One hop: an integer is an index into the arena, anything else is
    /// already a value. Out-of-range and negative indices are absent.
    pub fn deref<'a>(&'a self, value: &'a Value) -> Option<&'a Value> {
        match value {
            Value::Number(n) if n.is_u64() => {
                let idx = usize::try_from(n.as_u64()?).ok()?;
                self.node(NodeRef(idx))
            }
            Value::Number(n) if n.as_i64().is_some_and(|i| i < 0) => None,
            Value::Null => None,
            other => Some(other),
        }
    }

    pub fn lookup<'a>(
        &'a self,
        map: &'a Map<String, Value>,
        keys: &[String],
    ) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|key| map.get(key))
            .find_map(|raw| self.deref(raw).filter(|v| !v.is_null()))
    }

    fn mappings(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.nodes.iter().filter_map(Value::as_object)
    }
}

#[derive(Debug, Clone)]
pub struct GraphKeys {
    pub games: Vec<String>,
    pub root_identity: Vec<String>,
    pub date: Vec<String>,
    pub time: Vec<String>,
    pub location_indicator: Vec<String>,
    pub venue: Vec<String>,
    pub opponent: Vec<String>,
    pub title: Vec<String>,
    pub broadcast: Vec<String>,
    pub broadcast_channel: Vec<String>,
    pub broadcast_image: Vec<String>,
    pub result: Vec<String>,
    pub result_status: Vec<String>,
    pub result_score: Vec<String>,
    pub team_score: Vec<String>,
    pub opponent_score: Vec<String>,
    pub default_channel: String,
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for GraphKeys {
    fn default() -> Self {
        Self {
            games: keys(&["games"]),
            root_identity: keys(&["title", "name", "school", "schoolName", "program", "sport"]),
            date: keys(&["date", "game_date", "start_date", "datetime"]),
            time: keys(&["time", "start_time", "game_time"]),
            location_indicator: keys(&["location_indicator", "home_away", "indicator"]),
            venue: keys(&["location", "venue", "venue_name", "facility"]),
            opponent: keys(&["opponent", "opponent_name", "team"]),
            title: keys(&["title", "name", "short_name", "shortName"]),
            broadcast: keys(&["media", "broadcast", "tv"]),
            broadcast_channel: keys(&["tv", "network", "channel", "name", "title"]),
            broadcast_image: keys(&["tv_image", "broadcast_image", "image", "logo"]),
            result: keys(&["result"]),
            result_status: keys(&["status", "outcome", "result"]),
            result_score: keys(&["score"]),
            team_score: keys(&["team_score", "home_score"]),
            opponent_score: keys(&["opponent_score", "away_score"]),
            default_channel: "ESPN+".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphStrategy {
    pub keys: GraphKeys,
    pub normalizer: NormalizerConfig,
}

impl GraphStrategy {
    pub fn new(normalizer: NormalizerConfig) -> Self {
        Self {
            keys: GraphKeys::default(),
            normalizer,
        }
    }

    fn find_root<'a>(&self, graph: &'a FlatGraph) -> Option<&'a Map<String, Value>> {
        let has_games = |m: &Map<String, Value>| {
            self.keys.games.iter().any(|k| m.contains_key(k))
                && graph.lookup(m, &self.keys.games).is_some_and(Value::is_array)
        };
        let named = graph
            .mappings()
            .find(|m| has_games(m) && self.keys.root_identity.iter().any(|k| m.contains_key(k)));
        named.or_else(|| graph.mappings().find(|m| has_games(m)))
    }

    pub fn extract_graph(&self, graph: &FlatGraph) -> Result<Vec<GameDraft>, StrategyMiss> {
        let root = self.find_root(graph).ok_or(StrategyMiss::NoScheduleRoot)?;
        let Some(Value::Array(entries)) = graph.lookup(root, &self.keys.games) else {
            debug!("schedule root games did not resolve to a list");
            return Ok(Vec::new());
        };
        let drafts = entries
            .iter()
            .filter_map(|entry| graph.deref(entry).and_then(Value::as_object))
            .filter_map(|game| self.game_draft(graph, game))
            .collect();
        Ok(drafts)
    }

    fn game_draft(&self, graph: &FlatGraph, game: &Map<String, Value>) -> Option<GameDraft> {
        let k = &self.keys;
        let date = graph
            .lookup(game, &k.date)
            .and_then(value_text)
            .and_then(|raw| strict_iso_date(&raw))?;

        let opponent_raw = match graph.lookup(game, &k.opponent)? {
            Value::Object(nested) => graph.lookup(nested, &k.title).and_then(value_text)?,
            other => value_text(other)?,
        };
        let opponent = clean_opponent(&opponent_raw, &self.normalizer)?;

        let time = graph
            .lookup(game, &k.time)
            .and_then(value_text)
            .map(|raw| normalize_time(&raw))
            .unwrap_or(GameTime::Tbd);

        let location = graph
            .lookup(game, &k.venue)
            .and_then(|v| self.titled_text(graph, v))
            .unwrap_or_default();

        let home_away = graph
            .lookup(game, &k.location_indicator)
            .and_then(value_text)
            .and_then(|raw| indicator_venue(&raw))
            .unwrap_or_else(|| {
                classify_home_away(
                    VenueSignals {
                        location: Some(location.as_str()).filter(|l| !l.is_empty()),
                        marker: opponent.marker,
                        row_text: None,
                    },
                    &self.normalizer,
                )
            });

        let broadcast = graph
            .lookup(game, &k.broadcast)
            .map(|v| self.broadcast_label(graph, v))
            .unwrap_or_default();

        let result = graph
            .lookup(game, &k.result)
            .and_then(|v| self.result_summary(graph, v))
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

    fn titled_text(&self, graph: &FlatGraph, value: &Value) -> Option<String> {
        match value {
            Value::Object(nested) => graph.lookup(nested, &self.keys.title).and_then(value_text),
            other => value_text(other),
        }
    }

    fn broadcast_label(&self, graph: &FlatGraph, value: &Value) -> String {
        match value {
            Value::Object(nested) => {
                if let Some(channel) = graph
                    .lookup(nested, &self.keys.broadcast_channel)
                    .and_then(value_text)
                {
                    return canonical_broadcast(&channel, &self.normalizer);
                }
                let has_image = graph
                    .lookup(nested, &self.keys.broadcast_image)
                    .and_then(value_text)
                    .is_some();
                if has_image {
                    self.keys.default_channel.clone()
                } else {
                    String::new()
                }
            }
            other => value_text(other)
                .map(|raw| canonical_broadcast(&raw, &self.normalizer))
                .unwrap_or_default(),
        }
    }

    fn result_summary(&self, graph: &FlatGraph, value: &Value) -> Option<String> {
        let k = &self.keys;
        let nested = match value {
            Value::Object(nested) => nested,
            other => return value_text(other).and_then(|raw| find_result(&raw)),
        };
        let status = graph
            .lookup(nested, &k.result_status)
            .and_then(value_text)
            .and_then(|raw| outcome_letter(&raw))?;
        let score = graph
            .lookup(nested, &k.result_score)
            .and_then(value_text)
            .or_else(|| {
                let ours = graph.lookup(nested, &k.team_score).and_then(value_text)?;
                let theirs = graph.lookup(nested, &k.opponent_score).and_then(value_text)?;
                Some(format!("{ours}-{theirs}"))
            })?;
        Some(format!("{status} {score}"))
    }
}

impl Strategy for GraphStrategy {
    fn layout(&self) -> Layout {
        Layout::EmbeddedGraph
    }

    fn extract(
        &self,
        doc: &Document,
        _ctx: &ExtractContext,
    ) -> Result<Vec<GameDraft>, StrategyMiss> {
        let graph = FlatGraph::from_document(doc).ok_or(StrategyMiss::NoGraph)?;
        self.extract_graph(&graph)
    }
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn indicator_venue(raw: &str) -> Option<HomeAway> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "h" | "home" => Some(HomeAway::Home),
        "a" | "away" => Some(HomeAway::Away),
        "n" | "neutral" => Some(HomeAway::Neutral),
        _ => None,
    }
}

fn outcome_letter(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "w" | "win" => Some("W"),
        "l" | "loss" => Some("L"),
        "t" | "tie" => Some("T"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn graph(value: Value) -> FlatGraph {
        FlatGraph::from_value(value).expect("reference array")
    }

    #[test]
    fn resolves_games_through_one_hop_each() {
        let g = graph(json!([
            {"games": 1},
            [2],
            {"date": "2026-03-01", "opponent": 3},
            {"title": "Navy"}
        ]));
        let drafts = GraphStrategy::default().extract_graph(&g).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(drafts[0].opponent, "Navy");
        assert_eq!(drafts[0].time, GameTime::Tbd);
        assert_eq!(drafts[0].broadcast, "");
    }

    #[test]
    fn out_of_range_and_negative_indices_are_absent() {
        let g = graph(json!([
            {"games": 1},
            [2, 99],
            {"date": "2026-03-01", "opponent": 42, "time": -1}
        ]));
        let drafts = GraphStrategy::default().extract_graph(&g).unwrap();
        assert!(drafts.is_empty());
        assert!(g.deref(&json!(7)).is_none());
        assert!(g.deref(&json!(-1)).is_none());
    }

    #[test]
    fn self_referencing_nodes_do_not_hang() {
        let g = graph(json!([{"games": 0, "title": "Loop"}]));
        assert_eq!(
            GraphStrategy::default().extract_graph(&g),
            Err(StrategyMiss::NoScheduleRoot)
        );
    }

    #[test]
    fn named_holder_without_game_list_is_skipped() {
        let g = graph(json!([
            {"name": "Team Stats", "games": 5},
            {"title": "Baseball", "games": 2},
            [3],
            {"date": "2026-03-01", "opponent": 4},
            "Navy",
            12
        ]));
        let drafts = GraphStrategy::default().extract_graph(&g).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].opponent, "Navy");
    }

    #[test]
    fn nested_fields_resolve_broadcast_and_result() {
        let g = graph(json!([
            {"title": "Baseball", "games": 1},
            [2],
            {
                "date": "2026-04-10T18:00:00",
                "time": "6:30 PM",
                "location_indicator": "A",
                "location": 3,
                "opponent": {"title": 4},
                "media": {"tv_image": "espnplus.png"},
                "result": {"status": "W", "team_score": 5, "opponent_score": 6}
            },
            "Doak Field",
            "Florida State",
            7,
            3
        ]));
        let drafts = GraphStrategy::default().extract_graph(&g).unwrap();
        assert_eq!(drafts.len(), 1);
        let d = &drafts[0];
        assert_eq!(d.opponent, "Florida State");
        assert_eq!(d.home_away, HomeAway::Away);
        assert_eq!(d.location, "Doak Field");
        assert_eq!(d.time.to_string(), "6:30 PM");
        assert_eq!(d.broadcast, "ESPN+");
        assert_eq!(d.result, "W 7-3");
    }

    #[test]
    fn unparsable_dates_drop_the_game_and_pending_results_stay_blank() {
        let g = graph(json!([
            {"name": "Softball", "games": 1},
            [2, 3],
            {"date": "TBA", "opponent": "Army"},
            {"date": "2026-05-02", "opponent": "Army", "result": {"status": "scheduled"}}
        ]));
        let drafts = GraphStrategy::default().extract_graph(&g).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].result, "");
    }

    #[test]
    fn arrays_without_references_are_not_graphs() {
        assert!(FlatGraph::parse(r#"["a", "b"]"#).is_none());
        assert!(FlatGraph::parse("not json").is_none());
        assert!(FlatGraph::parse(r#"window.__DATA__ = [{"games":1},[]];"#).is_some());
    }
}
