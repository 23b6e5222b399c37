use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id         INTEGER PRIMARY KEY,
            url        TEXT UNIQUE NOT NULL,
            slug       TEXT NOT NULL,
            visited    BOOLEAN NOT NULL DEFAULT 0,
            visited_at TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_pages_visited ON pages(visited);

        CREATE TABLE IF NOT EXISTS page_data (
            id         INTEGER PRIMARY KEY,
            page_id    INTEGER NOT NULL REFERENCES pages(id),
            url        TEXT NOT NULL,
            slug       TEXT NOT NULL,
            html       TEXT,
            status     INTEGER,
            error      TEXT,
            latency_ms INTEGER,
            fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_page_data_slug ON page_data(slug);

        CREATE TABLE IF NOT EXISTS issues (
            slug          TEXT PRIMARY KEY,
            page_data_id  INTEGER NOT NULL REFERENCES page_data(id),
            url           TEXT NOT NULL,
            title         TEXT NOT NULL,
            date          TEXT NOT NULL,
            cover         TEXT,
            section_count INTEGER NOT NULL,
            item_count    INTEGER NOT NULL,
            record_json   TEXT NOT NULL,
            output_path   TEXT NOT NULL,
            processed_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Queue ──

pub fn insert_pages(conn: &Connection, pages: &[(String, String)]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR IGNORE INTO pages (url, slug) VALUES (?1, ?2)")?;
        for (url, slug) in pages {
            count += stmt.execute(rusqlite::params![url, slug])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

#[derive(Debug, Clone)]
pub struct QueuedPage {
    pub id: i64,
    pub url: String,
    pub slug: String,
}

/// `None` means no limit (SQLite treats a negative LIMIT as unbounded).
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |n| n as i64)
}

pub fn fetch_unvisited(conn: &Connection, limit: Option<usize>) -> Result<Vec<QueuedPage>> {
    let mut stmt =
        conn.prepare("SELECT id, url, slug FROM pages WHERE visited = 0 ORDER BY id LIMIT ?1")?;
    let rows = stmt
        .query_map([sql_limit(limit)], |row| {
            Ok(QueuedPage {
                id: row.get(0)?,
                url: row.get(1)?,
                slug: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Fetching ──

pub struct ScrapeRow {
    pub page_id: i64,
    pub url: String,
    pub slug: String,
    pub html: Option<String>,
    pub status: Option<i32>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

/// Prepared statements for saving fetch results one at a time.
pub struct ScrapeWriter<'c> {
    insert: rusqlite::Statement<'c>,
    mark_visited: rusqlite::Statement<'c>,
}

impl<'c> ScrapeWriter<'c> {
    pub fn new(conn: &'c Connection) -> Result<Self> {
        Ok(ScrapeWriter {
            insert: conn.prepare(
                "INSERT INTO page_data (page_id, url, slug, html, status, error, latency_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?,
            mark_visited: conn.prepare(
                "UPDATE pages SET visited = 1, visited_at = datetime('now') WHERE id = ?1",
            )?,
        })
    }

    pub fn save(&mut self, row: &ScrapeRow) -> Result<()> {
        self.insert.execute(rusqlite::params![
            row.page_id, row.url, row.slug, row.html, row.status, row.error, row.latency_ms,
        ])?;
        self.mark_visited.execute(rusqlite::params![row.page_id])?;
        Ok(())
    }
}

// ── Processing ──

pub struct ScrapedPage {
    pub page_data_id: i64,
    pub slug: String,
    pub url: String,
    pub html: String,
}

pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<ScrapedPage>> {
    let mut stmt = conn.prepare(
        "SELECT pd.id, pd.slug, pd.url, pd.html
         FROM page_data pd
         LEFT JOIN issues i ON i.slug = pd.slug
         WHERE pd.html IS NOT NULL AND i.slug IS NULL
         ORDER BY pd.id
         LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([sql_limit(limit)], |row| {
            Ok(ScrapedPage {
                page_data_id: row.get(0)?,
                slug: row.get(1)?,
                url: row.get(2)?,
                html: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct IssueRow {
    pub slug: String,
    pub page_data_id: i64,
    pub url: String,
    pub title: String,
    pub date: String,
    pub cover: Option<String>,
    pub section_count: usize,
    pub item_count: usize,
    pub record_json: String,
    pub output_path: String,
}

pub fn save_issues(conn: &Connection, rows: &[IssueRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO issues
             (slug, page_data_id, url, title, date, cover, section_count, item_count,
              record_json, output_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for r in rows {
            stmt.execute(rusqlite::params![
                r.slug,
                r.page_data_id,
                r.url,
                r.title,
                r.date,
                r.cover,
                r.section_count as i64,
                r.item_count as i64,
                r.record_json,
                r.output_path,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Stats ──

pub struct Stats {
    pub total: i64,
    pub visited: i64,
    pub unvisited: i64,
    pub fetched: i64,
    pub errors: i64,
    pub processed: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    let total = count("SELECT COUNT(*) FROM pages")?;
    let visited = count("SELECT COUNT(*) FROM pages WHERE visited = 1")?;
    Ok(Stats {
        total,
        visited,
        unvisited: total - visited,
        fetched: count("SELECT COUNT(*) FROM page_data WHERE html IS NOT NULL")?,
        errors: count("SELECT COUNT(*) FROM page_data WHERE error IS NOT NULL")?,
        processed: count("SELECT COUNT(*) FROM issues")?,
    })
}
