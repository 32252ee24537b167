use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::document::{Document, TableGrid};
use crate::records::StatCategory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    Single(String),
    /// Combined cells like `7-5`, split on the first `-`.
    Split(String, String),
}

#[derive(Debug, Clone)]
pub struct StatSchema {
    pub category: StatCategory,
    pub required_headers: Vec<String>,
    pub fields: Vec<(String, FieldTarget)>,
    pub columns: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn same(name: &str) -> (String, FieldTarget) {
    (name.to_string(), FieldTarget::Single(name.to_string()))
}

fn renamed(raw: &str, canonical: &str) -> (String, FieldTarget) {
    (raw.to_string(), FieldTarget::Single(canonical.to_string()))
}

fn split(raw: &str, first: &str, second: &str) -> (String, FieldTarget) {
    (
        raw.to_string(),
        FieldTarget::Split(first.to_string(), second.to_string()),
    )
}

impl StatSchema {
    pub fn batting() -> Self {
        Self {
            category: StatCategory::Batting,
            required_headers: strings(&["AVG", "AB"]),
            fields: vec![
                split("GP-GS", "G", "GS"),
                same("AB"),
                same("R"),
                same("H"),
                same("2B"),
                same("3B"),
                same("HR"),
                same("RBI"),
                same("BB"),
                same("SO"),
                same("HBP"),
                renamed("SH", "SAC"),
                same("SF"),
                split("SB-ATT", "SB", "CS"),
                same("AVG"),
                renamed("OB%", "OBP"),
                renamed("SLG%", "SLG"),
                same("OPS"),
            ],
            columns: strings(&[
                "G", "GS", "AB", "R", "H", "2B", "3B", "HR", "RBI", "BB", "SO", "HBP", "SAC", "SF",
                "SB", "CS", "AVG", "OBP", "SLG", "OPS",
            ]),
        }
    }

    pub fn pitching() -> Self {
        Self {
            category: StatCategory::Pitching,
            required_headers: strings(&["ERA", "IP"]),
            fields: vec![
                split("APP-GS", "G", "GS"),
                split("W-L", "W", "L"),
                same("SV"),
                same("IP"),
                same("H"),
                same("R"),
                same("ER"),
                same("BB"),
                same("SO"),
                same("HBP"),
                same("ERA"),
                same("WHIP"),
            ],
            columns: strings(&[
                "G", "GS", "W", "L", "SV", "IP", "H", "R", "ER", "BB", "SO", "HBP", "ERA", "WHIP",
                "K_per_9", "BB_per_9", "K_BB", "xFIP",
            ]),
        }
    }

    pub fn defense() -> Self {
        Self {
            category: StatCategory::Defense,
            required_headers: strings(&["FLD%", "PO"]),
            fields: vec![
                renamed("C", "TC"),
                same("PO"),
                same("A"),
                same("E"),
                same("FLD%"),
                same("DP"),
            ],
            columns: strings(&["TC", "PO", "A", "E", "FLD%", "DP"]),
        }
    }

    pub fn for_category(category: StatCategory) -> Self {
        match category {
            StatCategory::Batting => Self::batting(),
            StatCategory::Pitching => Self::pitching(),
            StatCategory::Defense => Self::defense(),
        }
    }

    /// Every mapped column set to `"0"`; derived columns stay blank.
    pub fn zero_stats(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (_, target) in &self.fields {
            match target {
                FieldTarget::Single(name) => {
                    out.insert(name.clone(), "0".to_string());
                }
                FieldTarget::Split(a, b) => {
                    out.insert(a.clone(), "0".to_string());
                    out.insert(b.clone(), "0".to_string());
                }
            }
        }
        self.fill_missing(&mut out);
        out
    }

    pub fn map_row(&self, raw: &HashMap<String, String>) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for (source, target) in &self.fields {
            let value = raw.get(source).map(|v| v.trim()).unwrap_or("");
            match target {
                FieldTarget::Single(name) => {
                    out.insert(name.clone(), value.to_string());
                }
                FieldTarget::Split(a, b) => {
                    let (first, second) = split_combined(value);
                    out.insert(a.clone(), first);
                    out.insert(b.clone(), second);
                }
            }
        }
        self.derive(&mut out);
        self.fill_missing(&mut out);
        out
    }

    fn fill_missing(&self, out: &mut BTreeMap<String, String>) {
        for col in &self.columns {
            out.entry(col.clone()).or_default();
        }
    }

    fn derive(&self, out: &mut BTreeMap<String, String>) {
        let wants = |col: &str| self.columns.iter().any(|c| c == col);

        if wants("OPS") && out.get("OPS").is_none_or(|v| v.is_empty()) {
            if let (Some(obp), Some(slg)) = (stat_num(out, "OBP"), stat_num(out, "SLG")) {
                out.insert("OPS".to_string(), format!("{:.3}", obp + slg));
            }
        }

        let ip = stat_num(out, "IP").unwrap_or(0.0);
        let bb = stat_num(out, "BB").unwrap_or(0.0);
        let so = stat_num(out, "SO").unwrap_or(0.0);
        if ip > 0.0 {
            if wants("K_per_9") {
                out.insert("K_per_9".to_string(), format!("{:.2}", so / ip * 9.0));
            }
            if wants("BB_per_9") {
                out.insert("BB_per_9".to_string(), format!("{:.2}", bb / ip * 9.0));
            }
        }
        if wants("K_BB") && bb > 0.0 {
            out.insert("K_BB".to_string(), format!("{:.2}", so / bb));
        }
    }
}

fn stat_num(values: &BTreeMap<String, String>, key: &str) -> Option<f64> {
    values.get(key).and_then(|v| v.trim().parse::<f64>().ok())
}

fn split_combined(value: &str) -> (String, String) {
    match value.split_once('-') {
        Some((a, b)) => (a.trim().to_string(), b.trim().to_string()),
        None => (String::new(), String::new()),
    }
}

pub fn find_stat_table<'a>(
    tables: &'a [TableGrid],
    schema: &StatSchema,
) -> Option<(&'a TableGrid, Vec<String>)> {
    tables.iter().find_map(|table| {
        if table.rows.len() < 2 {
            return None;
        }
        let headers = table.row_texts(0);
        let complete = schema
            .required_headers
            .iter()
            .all(|req| headers.iter().any(|h| h == req));
        complete.then_some((table, headers))
    })
}

/// Drops a `Player` header that has no data cell of its own.
pub fn align_headers(headers: &[String], cell_count: usize) -> Vec<String> {
    if headers.len() == cell_count + 1 && headers.iter().any(|h| h == "Player") {
        headers.iter().filter(|h| *h != "Player").cloned().collect()
    } else {
        headers.to_vec()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatLookup {
    Found(BTreeMap<String, String>),
    NoJersey,
    TableMissing,
    PlayerMissing,
}

impl StatLookup {
    pub fn into_values(self, schema: &StatSchema) -> BTreeMap<String, String> {
        match self {
            StatLookup::Found(values) => values,
            _ => schema.zero_stats(),
        }
    }

    pub fn note(&self) -> &'static str {
        match self {
            StatLookup::Found(_) => "",
            StatLookup::NoJersey => "no jersey number",
            StatLookup::TableMissing => "stats table not found",
            StatLookup::PlayerMissing => "jersey not found in table",
        }
    }
}

pub fn extract_player_stats(doc: &Document, schema: &StatSchema, jersey: &str) -> StatLookup {
    let jersey = jersey.trim();
    if jersey.is_empty() {
        return StatLookup::NoJersey;
    }
    let tables = doc.tables();
    let Some((table, headers)) = find_stat_table(&tables, schema) else {
        warn!(category = %schema.category, "no stats table found, writing zeros");
        return StatLookup::TableMissing;
    };

    for idx in 1..table.rows.len() {
        let cells = table.data_texts(idx);
        if cells.is_empty() {
            continue;
        }
        if cells[0].trim() != jersey {
            continue;
        }
        let headers = align_headers(&headers, cells.len());
        let raw: HashMap<String, String> = headers.into_iter().zip(cells).collect();
        debug!(category = %schema.category, jersey, "matched player row");
        return StatLookup::Found(schema.map_row(&raw));
    }

    warn!(category = %schema.category, jersey, "jersey not found, writing zeros");
    StatLookup::PlayerMissing
}
