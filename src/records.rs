use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::normalize::format_date;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

pub const SCHEDULE_COLUMNS: [&str; 11] = [
    "source_id",
    "division",
    "date",
    "time",
    "opponent",
    "home_away",
    "location",
    "broadcast",
    "result",
    "external_team_id",
    "last_updated",
];

pub const STAT_PREFIX_COLUMNS: [&str; 5] =
    ["captured_at", "player_id", "player_name", "source_id", "division"];

pub const SCRAPE_LOG_COLUMNS: [&str; 6] = [
    "logged_at",
    "player_id",
    "player_name",
    "source_id",
    "status",
    "notes",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HomeAway {
    #[default]
    Home,
    Away,
    Neutral,
}

impl HomeAway {
    pub fn label(self) -> &'static str {
        match self {
            HomeAway::Home => "Home",
            HomeAway::Away => "Away",
            HomeAway::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for HomeAway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Game start time. `Tbd` is the sentinel for pages that publish no time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameTime {
    At { hour: u8, minute: u8, pm: bool },
    #[default]
    Tbd,
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameTime::At { hour, minute, pm } => {
                let meridiem = if *pm { "PM" } else { "AM" };
                write!(f, "{hour}:{minute:02} {meridiem}")
            }
            GameTime::Tbd => f.write_str("TBD"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub id: String,
    pub url: Option<String>,
    pub division: String,
    pub external_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRecord {
    pub source_id: String,
    pub division: String,
    pub date: NaiveDate,
    pub time: GameTime,
    pub opponent: String,
    pub home_away: HomeAway,
    pub location: String,
    pub broadcast: String,
    pub result: String,
    pub external_team_id: String,
    pub last_updated: NaiveDateTime,
}

impl ScheduleRecord {
    pub fn natural_key(&self) -> (String, String, String) {
        (
            self.source_id.clone(),
            format_date(self.date),
            self.opponent.clone(),
        )
    }

    /// Cells in `SCHEDULE_COLUMNS` order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.source_id.clone(),
            self.division.clone(),
            format_date(self.date),
            self.time.to_string(),
            self.opponent.clone(),
            self.home_away.to_string(),
            self.location.clone(),
            self.broadcast.clone(),
            self.result.clone(),
            self.external_team_id.clone(),
            self.last_updated.format(TIMESTAMP_FORMAT).to_string(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatCategory {
    Batting,
    Pitching,
    Defense,
}

impl StatCategory {
    pub fn label(self) -> &'static str {
        match self {
            StatCategory::Batting => "Batting",
            StatCategory::Pitching => "Pitching",
            StatCategory::Defense => "Defense",
        }
    }

    pub fn sheet_name(self) -> &'static str {
        match self {
            StatCategory::Batting => "batting",
            StatCategory::Pitching => "pitching",
            StatCategory::Defense => "defense",
        }
    }

    pub fn history_sheet_name(self) -> &'static str {
        match self {
            StatCategory::Batting => "batting_history",
            StatCategory::Pitching => "pitching_history",
            StatCategory::Defense => "defense_history",
        }
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerKind {
    #[default]
    Hitter,
    Pitcher,
}

impl PlayerKind {
    pub fn categories(self) -> &'static [StatCategory] {
        match self {
            PlayerKind::Hitter => &[StatCategory::Batting, StatCategory::Defense],
            PlayerKind::Pitcher => &[StatCategory::Pitching],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    pub player_id: String,
    pub name: String,
    pub source_id: String,
    pub division: String,
    pub jersey: String,
    pub kind: PlayerKind,
    pub stats_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRecord {
    pub player_id: String,
    pub player_name: String,
    pub source_id: String,
    pub division: String,
    pub category: StatCategory,
    pub values: BTreeMap<String, String>,
    pub captured_at: NaiveDateTime,
}

impl StatRecord {
    /// Prefix columns followed by `columns` in order; a column missing from
    /// `values` renders as an empty cell so positions never shift.
    pub fn to_row(&self, columns: &[String]) -> Vec<String> {
        let mut row = vec![
            self.captured_at.format(TIMESTAMP_FORMAT).to_string(),
            self.player_id.clone(),
            self.player_name.clone(),
            self.source_id.clone(),
            self.division.clone(),
        ];
        row.extend(
            columns
                .iter()
                .map(|col| self.values.get(col).cloned().unwrap_or_default()),
        );
        row
    }
}

pub fn schedule_header() -> Vec<String> {
    SCHEDULE_COLUMNS.iter().map(|c| c.to_string()).collect()
}

pub fn stat_header(columns: &[String]) -> Vec<String> {
    STAT_PREFIX_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(columns.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_time_renders_canonical_form() {
        let t = GameTime::At {
            hour: 6,
            minute: 5,
            pm: true,
        };
        assert_eq!(t.to_string(), "6:05 PM");
        assert_eq!(GameTime::Tbd.to_string(), "TBD");
    }

    #[test]
    fn natural_key_matches_row_cells() {
        let rec = ScheduleRecord {
            source_id: "Maryland".to_string(),
            division: "D1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            time: GameTime::Tbd,
            opponent: "Navy".to_string(),
            home_away: HomeAway::Home,
            location: String::new(),
            broadcast: String::new(),
            result: String::new(),
            external_team_id: "120".to_string(),
            last_updated: NaiveDate::from_ymd_opt(2026, 3, 1)
                .and_then(|d| d.and_hms_opt(8, 0, 0))
                .unwrap(),
        };
        let row = rec.to_row();
        let (source, date, opponent) = rec.natural_key();
        assert_eq!(
            (row[0].as_str(), row[2].as_str(), row[4].as_str()),
            (source.as_str(), date.as_str(), opponent.as_str())
        );
        assert_eq!(row[3], "TBD");
        assert_eq!(row[10], "2026-03-01 08:00");
    }

    #[test]
    fn stat_row_keeps_missing_columns_as_blank_cells() {
        let captured_at = NaiveDate::from_ymd_opt(2026, 3, 1)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap();
        let mut values = BTreeMap::new();
        values.insert("PO".to_string(), "12".to_string());
        let rec = StatRecord {
            player_id: "P001".to_string(),
            player_name: "Sam Lee".to_string(),
            source_id: "Maryland".to_string(),
            division: "D1".to_string(),
            category: StatCategory::Defense,
            values,
            captured_at,
        };
        let cols = vec!["TC".to_string(), "PO".to_string()];
        let row = rec.to_row(&cols);
        assert_eq!(row.len(), 7);
        assert_eq!(row[0], "2026-03-01 09:30");
        assert_eq!(row[5], "");
        assert_eq!(row[6], "12");
    }
}
