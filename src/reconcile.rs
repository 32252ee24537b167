use std::collections::{HashMap, HashSet};

use tracing::debug;

pub type Row = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalePolicy {
    Drop,
    Keep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKey {
    pub scope_column: usize,
    pub key_columns: Vec<usize>,
}

impl RowKey {
    pub fn schedule() -> Self {
        Self {
            scope_column: 0,
            key_columns: vec![0, 2, 4],
        }
    }

    pub fn stats() -> Self {
        Self {
            scope_column: 1,
            key_columns: vec![1],
        }
    }

    fn key_of(&self, row: &[String]) -> Vec<String> {
        self.key_columns
            .iter()
            .map(|&idx| row.get(idx).map(|c| c.trim().to_string()).unwrap_or_default())
            .collect()
    }

    fn scope_of<'a>(&self, row: &'a [String]) -> &'a str {
        row.get(self.scope_column).map(|c| c.trim()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub rows: Vec<Row>,
    pub updated: usize,
    pub inserted: usize,
    pub dropped: usize,
}

/// Rows outside `scope` keep their cells and their relative order. An
/// incoming row's own scope value always counts as in scope. Inside the
/// batch the last row for a key wins.
pub fn reconcile(
    existing: Vec<Row>,
    incoming: Vec<Row>,
    key: &RowKey,
    scope: &HashSet<String>,
    policy: StalePolicy,
) -> Reconciled {
    let mut scope: HashSet<String> = scope.iter().map(|s| s.trim().to_string()).collect();

    let mut batch: Vec<Option<Row>> = Vec::with_capacity(incoming.len());
    let mut batch_index: HashMap<Vec<String>, usize> = HashMap::new();
    for row in incoming {
        scope.insert(key.scope_of(&row).to_string());
        let k = key.key_of(&row);
        match batch_index.get(&k) {
            Some(&idx) => batch[idx] = Some(row),
            None => {
                batch_index.insert(k, batch.len());
                batch.push(Some(row));
            }
        }
    }

    let mut out = Reconciled::default();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    for row in existing {
        if !scope.contains(key.scope_of(&row)) {
            out.rows.push(row);
            continue;
        }
        let k = key.key_of(&row);
        if seen.contains(&k) {
            out.dropped += 1;
            continue;
        }
        let replacement = batch_index
            .get(&k)
            .and_then(|&idx| batch.get_mut(idx))
            .and_then(Option::take);
        match replacement {
            Some(new_row) => {
                out.rows.push(new_row);
                out.updated += 1;
                seen.insert(k);
            }
            None => match policy {
                StalePolicy::Drop => out.dropped += 1,
                StalePolicy::Keep => {
                    out.rows.push(row);
                    seen.insert(k);
                }
            },
        }
    }

    for row in batch.into_iter().flatten() {
        out.rows.push(row);
        out.inserted += 1;
    }

    debug!(
        updated = out.updated,
        inserted = out.inserted,
        dropped = out.dropped,
        "reconciled rows"
    );
    out
}
