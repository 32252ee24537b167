use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::records::{GameTime, HomeAway};

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("iso date regex"));

static SLASH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{2,4})\b").expect("slash date regex")
});

static MONTH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec)\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b(?:,?\s*(\d{4})\b)?",
    )
    .expect("month date regex")
});

static DATE_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}|\d{1,2}/\d{1,2}/\d{2,4}",
    )
    .expect("date-like regex")
});

static CLOCK_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*(?:([ap])\.?m\b\.?)?").expect("clock time regex")
});

static BARE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*([ap])\.?m\b").expect("bare time regex"));

static OPPONENT_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(vs\.\s*|vs(?:\s+|$)|at(?:\s+@?\s*|$)|@\s*)")
        .expect("opponent prefix regex")
});

static TRAILING_RESULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+[WLT]\s+\d+\s*[-–]\s*\d+.*$").expect("trailing result regex")
});

static RESULT_SUMMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([WLT])\s+(\d+)\s*[-–]\s*(\d+)").expect("result summary regex")
});

static TIME_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}:\d{2}").expect("time prefix regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAlias {
    pub alias: String,
    pub label: String,
    /// Whether a bare mention of the alias anywhere in a row counts as a
    /// broadcast. Off for words that also show up in venue names.
    pub scan_row_text: bool,
}

impl ChannelAlias {
    fn new(alias: &str, label: &str, scan_row_text: bool) -> Self {
        Self {
            alias: alias.to_string(),
            label: label.to_string(),
            scan_row_text,
        }
    }
}

/// Keyword and alias tables used by the normalizers. Order matters for
/// `channel_aliases`: the first alias contained in the text wins.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub channel_aliases: Vec<ChannelAlias>,
    pub away_keywords: Vec<String>,
    pub neutral_keywords: Vec<String>,
    pub row_text_window: usize,
    pub min_opponent_len: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        let channel_aliases = vec![
            ChannelAlias::new("espn+", "ESPN+", true),
            ChannelAlias::new("espnu", "ESPNU", true),
            ChannelAlias::new("espn2", "ESPN2", true),
            ChannelAlias::new("espn", "ESPN", true),
            ChannelAlias::new("sec network", "SEC Network", true),
            ChannelAlias::new("acc network", "ACC Network", true),
            ChannelAlias::new("big ten network", "Big Ten Network", true),
            ChannelAlias::new("mlb network", "MLB Network", true),
            ChannelAlias::new("fs1", "FS1", true),
            ChannelAlias::new("fs2", "FS2", true),
            ChannelAlias::new("stadium", "Stadium", false),
            ChannelAlias::new("flobaseball", "FloBaseball", true),
            ChannelAlias::new("youtube", "YouTube", false),
            ChannelAlias::new("live stream", "Stream", false),
        ];
        Self {
            channel_aliases,
            away_keywords: vec!["away".to_string()],
            neutral_keywords: ["neutral", "tournament", "tourney", "classic"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            row_text_window: 60,
            min_opponent_len: 2,
        }
    }
}

/// Leading marker found in front of an opponent name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenueMarker {
    Versus,
    At,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opponent {
    pub name: String,
    pub marker: Option<VenueMarker>,
}

/// Inputs for home/away classification, highest precedence first.
#[derive(Debug, Clone, Copy, Default)]
pub struct VenueSignals<'a> {
    pub location: Option<&'a str>,
    pub marker: Option<VenueMarker>,
    pub row_text: Option<&'a str>,
}

pub fn normalize_date(text: &str) -> Option<NaiveDate> {
    normalize_date_in_year(text, Local::now().year())
}

/// Date normalization with an explicit fallback year for texts that carry
/// none. Patterns are tried in order: ISO, numeric M/D/Y, month name.
pub fn normalize_date_in_year(text: &str, default_year: i32) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    iso_date(text)
        .or_else(|| slash_date(text))
        .or_else(|| month_name_date(text, default_year))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Strict `YYYY-MM-DD` prefix, as used by serialized payloads
/// (`2026-03-01` or `2026-03-01T18:00:00`).
pub fn strict_iso_date(text: &str) -> Option<NaiveDate> {
    let head = text.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn iso_date(text: &str) -> Option<NaiveDate> {
    ISO_DATE.captures_iter(text).find_map(|caps| {
        let y = caps.get(1)?.as_str().parse::<i32>().ok()?;
        let m = caps.get(2)?.as_str().parse::<u32>().ok()?;
        let d = caps.get(3)?.as_str().parse::<u32>().ok()?;
        NaiveDate::from_ymd_opt(y, m, d)
    })
}

fn slash_date(text: &str) -> Option<NaiveDate> {
    SLASH_DATE.captures_iter(text).find_map(|caps| {
        let m = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let d = caps.get(2)?.as_str().parse::<u32>().ok()?;
        let mut y = caps.get(3)?.as_str().parse::<i32>().ok()?;
        if y < 100 {
            y += 2000;
        }
        NaiveDate::from_ymd_opt(y, m, d)
    })
}

fn month_name_date(text: &str, default_year: i32) -> Option<NaiveDate> {
    MONTH_DATE.captures_iter(text).find_map(|caps| {
        let month = month_number(caps.get(1)?.as_str())?;
        let day = caps.get(2)?.as_str().parse::<u32>().ok()?;
        let year = caps
            .get(3)
            .and_then(|y| y.as_str().parse::<i32>().ok())
            .unwrap_or(default_year);
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let n = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}

/// Number of date-looking substrings; used to score candidate tables.
pub fn count_date_like(text: &str) -> usize {
    DATE_LIKE.find_iter(text).count()
}

pub fn normalize_time(text: &str) -> GameTime {
    let clock = CLOCK_TIME.captures_iter(text).find_map(|caps| {
        let hour = caps.get(1)?.as_str().parse::<u32>().ok()?;
        let minute = caps.get(2)?.as_str().parse::<u32>().ok()?;
        let meridiem = caps.get(3).map(|m| m.as_str().eq_ignore_ascii_case("p"));
        clock_time(hour, minute, meridiem)
    });
    if let Some(t) = clock {
        return t;
    }
    BARE_TIME
        .captures_iter(text)
        .find_map(|caps| {
            let hour = caps.get(1)?.as_str().parse::<u32>().ok()?;
            if !(1..=12).contains(&hour) {
                return None;
            }
            let pm = caps.get(2)?.as_str().eq_ignore_ascii_case("p");
            clock_time(hour, 0, Some(pm))
        })
        .unwrap_or(GameTime::Tbd)
}

fn clock_time(hour: u32, minute: u32, meridiem: Option<bool>) -> Option<GameTime> {
    if hour > 23 || minute > 59 {
        return None;
    }
    // No marker: 1-7 are afternoon/evening starts, 13-23 are a 24-hour clock.
    let pm = match meridiem {
        Some(pm) if hour <= 12 => pm,
        Some(_) => true,
        None => match hour {
            0 => false,
            1..=7 => true,
            8..=11 => false,
            _ => true,
        },
    };
    let h12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    Some(GameTime::At {
        hour: h12 as u8,
        minute: minute as u8,
        pm,
    })
}

pub fn looks_like_time(text: &str) -> bool {
    TIME_PREFIX.is_match(text.trim())
}

pub fn clean_opponent(raw: &str, config: &NormalizerConfig) -> Option<Opponent> {
    let collapsed = collapse_ws(raw);
    let (marker, rest) = match OPPONENT_PREFIX.captures(&collapsed) {
        Some(caps) => {
            let Some(whole) = caps.get(0) else {
                return None;
            };
            let token = caps
                .get(1)
                .map(|m| m.as_str().trim().to_ascii_lowercase())
                .unwrap_or_default();
            let marker = if token.starts_with("vs") {
                VenueMarker::Versus
            } else {
                VenueMarker::At
            };
            (Some(marker), &collapsed[whole.end()..])
        }
        None => (None, collapsed.as_str()),
    };
    let name = TRAILING_RESULT.replace(rest, "").trim().to_string();
    if name.chars().count() < config.min_opponent_len {
        return None;
    }
    Some(Opponent { name, marker })
}

pub fn classify_home_away(signals: VenueSignals<'_>, config: &NormalizerConfig) -> HomeAway {
    if let Some(found) = signals
        .location
        .and_then(|loc| keyword_venue(loc, config))
    {
        return found;
    }
    if signals.marker == Some(VenueMarker::At) {
        return HomeAway::Away;
    }
    if let Some(found) = signals.row_text.and_then(|text| {
        let window: String = text.chars().take(config.row_text_window).collect();
        keyword_venue(&window, config)
    }) {
        return found;
    }
    HomeAway::Home
}

fn keyword_venue(text: &str, config: &NormalizerConfig) -> Option<HomeAway> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('@') {
        return Some(HomeAway::Away);
    }
    let lower = trimmed.to_lowercase();
    if config.away_keywords.iter().any(|k| contains_word(&lower, k)) {
        return Some(HomeAway::Away);
    }
    if config
        .neutral_keywords
        .iter()
        .any(|k| contains_word(&lower, k))
    {
        return Some(HomeAway::Neutral);
    }
    None
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack
        .split(|c: char| !c.is_alphanumeric())
        .any(|token| token == word)
}

pub fn canonical_broadcast(text: &str, config: &NormalizerConfig) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_lowercase();
    config
        .channel_aliases
        .iter()
        .find(|a| lower.contains(&a.alias))
        .map(|a| a.label.clone())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Known channel mentioned anywhere in free row text.
pub fn find_broadcast_mention(text: &str, config: &NormalizerConfig) -> Option<String> {
    let lower = text.to_lowercase();
    config
        .channel_aliases
        .iter()
        .filter(|a| a.scan_row_text)
        .find(|a| lower.contains(&a.alias))
        .map(|a| a.label.clone())
}

/// `W 7-3` style summary found in free text.
pub fn find_result(text: &str) -> Option<String> {
    let caps = RESULT_SUMMARY.captures(text)?;
    Some(format!(
        "{} {}-{}",
        caps.get(1)?.as_str(),
        caps.get(2)?.as_str(),
        caps.get(3)?.as_str()
    ))
}

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
