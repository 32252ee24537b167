use scraper::{ElementRef, Html, Selector};

use crate::normalize::{collapse_ws, count_date_like};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub is_header: bool,
}

/// A `<table>` flattened to rows of cell texts. Nested tables are not
/// separated out; their rows show up in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableGrid {
    pub rows: Vec<Vec<Cell>>,
    text: String,
}

impl TableGrid {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        let text = rows
            .iter()
            .flat_map(|r| r.iter().map(|c| c.text.as_str()))
            .collect::<Vec<_>>()
            .join(" ");
        Self { rows, text }
    }

    pub fn date_score(&self) -> usize {
        count_date_like(&self.text)
    }

    pub fn row_texts(&self, idx: usize) -> Vec<String> {
        self.rows
            .get(idx)
            .map(|r| r.iter().map(|c| c.text.clone()).collect())
            .unwrap_or_default()
    }

    /// Data cells only (`<td>`), skipping row headers.
    pub fn data_texts(&self, idx: usize) -> Vec<String> {
        self.rows
            .get(idx)
            .map(|r| {
                r.iter()
                    .filter(|c| !c.is_header)
                    .map(|c| c.text.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(raw: &str) -> Self {
        Self {
            html: Html::parse_document(raw),
        }
    }

    pub fn tables(&self) -> Vec<TableGrid> {
        let (Ok(table_sel), Ok(row_sel), Ok(cell_sel)) = (
            Selector::parse("table"),
            Selector::parse("tr"),
            Selector::parse("th, td"),
        ) else {
            return Vec::new();
        };
        self.html
            .select(&table_sel)
            .map(|table| {
                let rows = table
                    .select(&row_sel)
                    .map(|tr| {
                        tr.select(&cell_sel)
                            .map(|cell| Cell {
                                text: element_text(&cell),
                                is_header: cell.value().name().eq_ignore_ascii_case("th"),
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>();
                TableGrid::from_rows(rows)
            })
            .collect()
    }

    /// Highest date-scoring table, provided its score exceeds `threshold`.
    /// Ties keep the earlier table.
    pub fn best_schedule_table(&self, threshold: usize) -> Option<TableGrid> {
        let mut best: Option<(usize, TableGrid)> = None;
        for table in self.tables() {
            let score = table.date_score();
            if score > threshold && best.as_ref().is_none_or(|(s, _)| score > *s) {
                best = Some((score, table));
            }
        }
        best.map(|(_, t)| t)
    }

    pub fn script_bodies(&self) -> Vec<String> {
        let Ok(sel) = Selector::parse("script") else {
            return Vec::new();
        };
        self.html
            .select(&sel)
            .map(|el| el.text().collect::<String>())
            .filter(|body| !body.trim().is_empty())
            .collect()
    }

    /// Texts of every element matching `selector`. An unparsable selector
    /// yields `None` so callers can tell it apart from "nothing matched".
    pub fn fragment_texts(&self, selector: &str) -> Option<Vec<String>> {
        let sel = Selector::parse(selector).ok()?;
        Some(self.html.select(&sel).map(|el| element_text(&el)).collect())
    }
}

fn element_text(el: &ElementRef<'_>) -> String {
    let joined = el
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    collapse_ws(&joined.replace('\u{a0}', " "))
}
