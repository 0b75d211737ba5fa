//! SQLite baseline of page SEO fields.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::{Result, SeoRecord};

/// Baseline store backed by the `seo_pages` table.
pub struct SeoStore {
    conn: Connection,
}

impl SeoStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let store = Self { conn };
        store.init_schema()?;
        info!("Opened SEO baseline at {:?}", path.as_ref());
        Ok(store)
    }

    /// In-memory store (for testing).
    pub fn open_memory() -> Result<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS seo_pages (
                url TEXT PRIMARY KEY,
                title TEXT,
                description TEXT,
                h1 TEXT
            );
            "#,
        )?;
        Ok(())
    }

    /// Insert or replace the baseline for `record.url`.
    pub fn upsert(&self, record: &SeoRecord) -> Result<()> {
        debug!("baseline {}", record.url);
        self.conn.execute(
            r#"
            INSERT INTO seo_pages (url, title, description, h1)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                h1 = excluded.h1
            "#,
            params![record.url, record.title, record.description, record.h1],
        )?;
        Ok(())
    }

    pub fn get(&self, url: &str) -> Result<Option<SeoRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT url, title, description, h1 FROM seo_pages WHERE url = ?1",
                params![url],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Every baseline row keyed by URL. NULL columns read as empty strings.
    pub fn baseline_data(&self) -> Result<HashMap<String, SeoRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, title, description, h1 FROM seo_pages")?;
        let rows = stmt.query_map([], row_to_record)?;

        let mut out = HashMap::new();
        for row in rows {
            let record = row?;
            out.insert(record.url.clone(), record);
        }
        Ok(out)
    }

    pub fn len(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM seo_pages", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SeoRecord> {
    Ok(SeoRecord {
        url: row.get(0)?,
        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        h1: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
    })
}

/// Create the `seo_pages` table at `path` if it does not exist.
pub fn init_db(path: impl AsRef<Path>) -> Result<()> {
    SeoStore::open(path).map(|_| ())
}
