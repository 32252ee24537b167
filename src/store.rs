use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::reconcile::Row;

/// Bookkeeping for one sync run, stored next to the sheets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncRunLog {
    pub kind: String,
    pub started_at: String,
    pub finished_at: String,
    pub sources_total: usize,
    pub sources_succeeded: usize,
    pub rows_written: usize,
    pub errors: Vec<String>,
}

/// Named sheets of positional rows with a header row each.
pub trait TabularStore {
    fn read_rows(&self, sheet: &str) -> Result<Vec<Row>>;

    fn header(&self, sheet: &str) -> Result<Option<Vec<String>>>;

    /// Replaces every row of `sheet` in one step.
    fn rewrite(&mut self, sheet: &str, header: &[String], rows: &[Row]) -> Result<()>;

    fn append(&mut self, sheet: &str, header: &[String], rows: &[Row]) -> Result<()>;

    fn record_run(&mut self, run: &SyncRunLog) -> Result<()>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn run_count(&self, kind: &str) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sync_runs WHERE kind = ?1",
                params![kind],
                |row| row.get(0),
            )
            .context("count sync runs")?;
        Ok(n as usize)
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS sheet_headers (
            sheet TEXT PRIMARY KEY,
            cells TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS sheet_rows (
            sheet TEXT NOT NULL,
            position INTEGER NOT NULL,
            cells TEXT NOT NULL,
            PRIMARY KEY (sheet, position)
        );

        CREATE TABLE IF NOT EXISTS sync_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            sources_total INTEGER NOT NULL,
            sources_succeeded INTEGER NOT NULL,
            rows_written INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

fn decode_cells(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).with_context(|| format!("decode stored row {raw}"))
}

fn upsert_header(tx: &rusqlite::Transaction<'_>, sheet: &str, header: &[String]) -> Result<()> {
    tx.execute(
        "INSERT INTO sheet_headers(sheet, cells) VALUES (?1, ?2)
         ON CONFLICT(sheet) DO UPDATE SET cells = excluded.cells",
        params![sheet, serde_json::to_string(header)?],
    )
    .context("upsert sheet header")?;
    Ok(())
}

fn insert_rows(
    tx: &rusqlite::Transaction<'_>,
    sheet: &str,
    first_position: i64,
    rows: &[Row],
) -> Result<()> {
    let mut stmt = tx
        .prepare("INSERT INTO sheet_rows(sheet, position, cells) VALUES (?1, ?2, ?3)")
        .context("prepare row insert")?;
    for (offset, row) in rows.iter().enumerate() {
        stmt.execute(params![
            sheet,
            first_position + offset as i64,
            serde_json::to_string(row)?
        ])
        .with_context(|| format!("insert row into {sheet}"))?;
    }
    Ok(())
}

impl TabularStore for SqliteStore {
    fn read_rows(&self, sheet: &str) -> Result<Vec<Row>> {
        let mut stmt = self
            .conn
            .prepare("SELECT cells FROM sheet_rows WHERE sheet = ?1 ORDER BY position ASC")
            .context("prepare sheet read")?;
        let rows = stmt
            .query_map(params![sheet], |row| row.get::<_, String>(0))
            .context("query sheet rows")?;
        let mut out = Vec::new();
        for raw in rows {
            out.push(decode_cells(&raw.context("read sheet row")?)?);
        }
        Ok(out)
    }

    fn header(&self, sheet: &str) -> Result<Option<Vec<String>>> {
        let raw = self
            .conn
            .query_row(
                "SELECT cells FROM sheet_headers WHERE sheet = ?1",
                params![sheet],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("query sheet header")?;
        raw.map(|r| decode_cells(&r)).transpose()
    }

    fn rewrite(&mut self, sheet: &str, header: &[String], rows: &[Row]) -> Result<()> {
        let tx = self.conn.transaction().context("begin rewrite transaction")?;
        upsert_header(&tx, sheet, header)?;
        tx.execute("DELETE FROM sheet_rows WHERE sheet = ?1", params![sheet])
            .context("clear sheet rows")?;
        insert_rows(&tx, sheet, 0, rows)?;
        tx.commit().context("commit rewrite transaction")?;
        Ok(())
    }

    fn append(&mut self, sheet: &str, header: &[String], rows: &[Row]) -> Result<()> {
        let tx = self.conn.transaction().context("begin append transaction")?;
        let has_header: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sheet_headers WHERE sheet = ?1)",
                params![sheet],
                |row| row.get(0),
            )
            .context("check sheet header")?;
        if !has_header {
            upsert_header(&tx, sheet, header)?;
        }
        let next: i64 = tx
            .query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM sheet_rows WHERE sheet = ?1",
                params![sheet],
                |row| row.get(0),
            )
            .context("query next row position")?;
        insert_rows(&tx, sheet, next, rows)?;
        tx.commit().context("commit append transaction")?;
        Ok(())
    }

    fn record_run(&mut self, run: &SyncRunLog) -> Result<()> {
        let errors_json = serde_json::to_string(&run.errors).unwrap_or_else(|_| "[]".to_string());
        self.conn
            .execute(
                "INSERT INTO sync_runs(kind, started_at, finished_at, sources_total, sources_succeeded, rows_written, errors_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    run.kind,
                    run.started_at,
                    run.finished_at,
                    run.sources_total as i64,
                    run.sources_succeeded as i64,
                    run.rows_written as i64,
                    errors_json
                ],
            )
            .context("insert sync run")?;
        Ok(())
    }
}

/// In-process store used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sheets: HashMap<String, (Vec<String>, Vec<Row>)>,
    pub runs: Vec<SyncRunLog>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TabularStore for MemoryStore {
    fn read_rows(&self, sheet: &str) -> Result<Vec<Row>> {
        Ok(self
            .sheets
            .get(sheet)
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn header(&self, sheet: &str) -> Result<Option<Vec<String>>> {
        Ok(self.sheets.get(sheet).map(|(header, _)| header.clone()))
    }

    fn rewrite(&mut self, sheet: &str, header: &[String], rows: &[Row]) -> Result<()> {
        self.sheets
            .insert(sheet.to_string(), (header.to_vec(), rows.to_vec()));
        Ok(())
    }

    fn append(&mut self, sheet: &str, header: &[String], rows: &[Row]) -> Result<()> {
        let entry = self
            .sheets
            .entry(sheet.to_string())
            .or_insert_with(|| (header.to_vec(), Vec::new()));
        entry.1.extend(rows.iter().cloned());
        Ok(())
    }

    fn record_run(&mut self, run: &SyncRunLog) -> Result<()> {
        self.runs.push(run.clone());
        Ok(())
    }
}
