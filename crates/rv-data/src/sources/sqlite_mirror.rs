//! Preference mirror writing into a SQLite table

use std::path::Path;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use rv_core::{FilterSet, PreferenceMirror};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS report_preferences (
    report_id TEXT PRIMARY KEY,
    table_name TEXT,
    selected_columns TEXT NOT NULL DEFAULT '[]',
    filters TEXT,
    updated_at TEXT NOT NULL
)";

/// A mirrored preference record
#[derive(Debug, Clone, PartialEq)]
pub struct MirroredPreferences {
    pub table_name: Option<String>,
    pub selected_columns: Vec<String>,
    pub filters: Option<FilterSet>,
}

/// Keeps the `report_preferences` table in step with the local store
pub struct SqliteMirror {
    conn: Mutex<Connection>,
    name: String,
}

impl SqliteMirror {
    /// Open the database and create the preference table if needed
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open mirror database {}", path.display()))?;
        conn.execute_batch(CREATE_TABLE)
            .context("failed to create report_preferences")?;

        Ok(Self {
            conn: Mutex::new(conn),
            name: format!("sqlite:{}", path.display()),
        })
    }

    /// Read back the record of one report
    pub fn fetch(&self, report_id: &str) -> anyhow::Result<Option<MirroredPreferences>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT table_name, selected_columns, filters FROM report_preferences WHERE report_id = ?1",
                params![report_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((table_name, columns, filters)) = record else {
            return Ok(None);
        };
        Ok(Some(MirroredPreferences {
            table_name,
            selected_columns: serde_json::from_str(&columns)?,
            filters: filters.map(|f| serde_json::from_str(&f)).transpose()?,
        }))
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl PreferenceMirror for SqliteMirror {
    fn upsert_fields(&self, report_id: &str, table_name: Option<&str>, columns: &[String]) -> anyhow::Result<()> {
        let columns = serde_json::to_string(columns)?;
        self.conn.lock().execute(
            "INSERT INTO report_preferences (report_id, table_name, selected_columns, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(report_id) DO UPDATE SET
                table_name = excluded.table_name,
                selected_columns = excluded.selected_columns,
                updated_at = excluded.updated_at",
            params![report_id, table_name, columns, now()],
        )?;
        Ok(())
    }

    fn upsert_filters(&self, report_id: &str, filters: Option<&FilterSet>) -> anyhow::Result<()> {
        let filters = filters.map(serde_json::to_string).transpose()?;
        self.conn.lock().execute(
            "INSERT INTO report_preferences (report_id, filters, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(report_id) DO UPDATE SET
                filters = excluded.filters,
                updated_at = excluded.updated_at",
            params![report_id, filters, now()],
        )?;
        Ok(())
    }

    fn remove(&self, report_id: &str) -> anyhow::Result<()> {
        self.conn
            .lock()
            .execute("DELETE FROM report_preferences WHERE report_id = ?1", params![report_id])?;
        Ok(())
    }

    fn mirror_name(&self) -> &str {
        &self.name
    }
}
