use std::fmt;

use tracing::debug;

use crate::document::Document;
use crate::graph::FlatGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    Table,
    EmbeddedGraph,
    Generic,
}

impl Layout {
    /// Strategy order; later entries are fallbacks for earlier ones.
    pub const PRIORITY: [Layout; 3] = [Layout::Table, Layout::EmbeddedGraph, Layout::Generic];

    pub fn label(self) -> &'static str {
        match self {
            Layout::Table => "table",
            Layout::EmbeddedGraph => "embedded-graph",
            Layout::Generic => "generic",
        }
    }

    /// This layout followed by every lower-priority layout.
    pub fn fallback_chain(self) -> impl Iterator<Item = Layout> {
        Layout::PRIORITY.into_iter().skip_while(move |l| *l != self)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    /// A table is a schedule once its date-like score exceeds this.
    pub table_threshold: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { table_threshold: 0 }
    }
}

/// Always picks a layout; `Generic` is the floor.
pub fn classify(doc: &Document, config: &ClassifierConfig) -> Layout {
    if let Some(table) = doc.best_schedule_table(config.table_threshold) {
        debug!(score = table.date_score(), "schedule table detected");
        return Layout::Table;
    }
    if FlatGraph::from_document(doc).is_some() {
        debug!("embedded reference array detected");
        return Layout::EmbeddedGraph;
    }
    Layout::Generic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_chain_starts_at_the_classified_layout() {
        let chain: Vec<_> = Layout::EmbeddedGraph.fallback_chain().collect();
        assert_eq!(chain, vec![Layout::EmbeddedGraph, Layout::Generic]);
        assert_eq!(Layout::Table.fallback_chain().count(), 3);
    }

    #[test]
    fn plain_markup_falls_to_generic() {
        let doc = Document::parse("<ul><li>Roster</li></ul>");
        assert_eq!(classify(&doc, &ClassifierConfig::default()), Layout::Generic);
    }

    #[test]
    fn script_array_is_embedded_graph() {
        let doc = Document::parse(
            r#"<script type="application/json">[{"games":1},[2],{"date":"2026-03-01","opponent":3},{"title":"Navy"}]</script>"#,
        );
        assert_eq!(
            classify(&doc, &ClassifierConfig::default()),
            Layout::EmbeddedGraph
        );
    }
}
