//! SQLite-backed tabular store

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use rv_core::Row;
use serde_json::{Number, Value};
use tracing::debug;

use super::{TableRead, TableReadResult, TabularStore};
use crate::filter::sql::{quote_ident, translate, SqlParam};
use crate::DataError;

/// Tabular store over a SQLite database file.
///
/// Every call opens its own connection on a blocking thread.
pub struct SqliteStore {
    path: PathBuf,
    name: String,
}

impl SqliteStore {
    /// Open a store; fails when the database cannot be opened
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref().to_path_buf();
        Connection::open(&path)?;
        let name = format!("sqlite:{}", path.display());
        Ok(Self { path, name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(path: &Path) -> Result<Connection, DataError> {
        Ok(Connection::open(path)?)
    }

    /// Column names from `PRAGMA table_info`; empty when the table is missing
    fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, DataError> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn table_names(conn: &Connection) -> Result<Vec<String>, DataError> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn read_blocking(path: &Path, request: &TableRead) -> Result<TableReadResult, DataError> {
        let conn = Self::connect(path)?;
        let table_columns = Self::table_columns(&conn, &request.table)?;
        if table_columns.is_empty() {
            return Err(DataError::fetch(format!("no such table: {}", request.table)));
        }

        let projection = if request.columns.is_empty() {
            table_columns.clone()
        } else {
            if let Some(missing) = request.columns.iter().find(|c| !table_columns.contains(c)) {
                return Err(DataError::fetch(format!(
                    "no such column: {}.{}",
                    request.table, missing
                )));
            }
            request.columns.clone()
        };

        let table = quote_ident(&request.table);
        let select_list = projection
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");

        let fragment = match &request.filters {
            Some(filters) => translate(filters, |field| {
                if table_columns.iter().any(|c| c == field) {
                    Ok(field.to_string())
                } else {
                    Err(DataError::fetch(format!("no such column: {}.{}", request.table, field)))
                }
            })?,
            None => None,
        };
        let (where_clause, mut params) = match fragment {
            Some(f) => (format!(" WHERE {}", f.clause), f.params),
            None => (String::new(), Vec::new()),
        };

        // Unknown sort columns are ignored so a default sort never breaks a read
        let order_by = match &request.sort {
            Some(sort) if table_columns.contains(&sort.key) => format!(
                " ORDER BY {} {}, rowid ASC",
                quote_ident(&sort.key),
                sort.direction.as_sql()
            ),
            Some(sort) => {
                debug!(table = %request.table, key = %sort.key, "ignoring sort on unknown column");
                " ORDER BY rowid ASC".to_string()
            }
            None => " ORDER BY rowid ASC".to_string(),
        };

        let total = if request.with_count {
            let sql = format!("SELECT COUNT(*) FROM {}{}", table, where_clause);
            let count: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
            Some(count.max(0) as usize)
        } else {
            None
        };

        // LIMIT -1 reads to the end; values past i64 saturate instead of wrapping negative
        let limit = request
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        let offset = i64::try_from(request.offset).unwrap_or(i64::MAX);
        params.push(SqlParam::Integer(limit));
        params.push(SqlParam::Integer(offset));
        let sql = format!(
            "SELECT {} FROM {}{}{} LIMIT ? OFFSET ?",
            select_list, table, where_clause, order_by
        );
        debug!(sql = %sql, "sqlite read");

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::with_capacity(projection.len());
            for (idx, column) in projection.iter().enumerate() {
                let key = format!("{}.{}", request.table, column);
                let value = scalar_value(row.get_ref(idx)?, &key)?;
                record.insert(key, value);
            }
            out.push(record);
        }

        Ok(TableReadResult { rows: out, total })
    }
}

/// Convert a SQLite cell into a JSON scalar; blobs are rejected
fn scalar_value(value: ValueRef<'_>, key: &str) -> Result<Value, DataError> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(i) => Ok(Value::from(i)),
        ValueRef::Real(f) => Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| DataError::InvalidRow(format!("non-finite number in {}", key))),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_string()))
            .map_err(|_| DataError::InvalidRow(format!("invalid UTF-8 text in {}", key))),
        ValueRef::Blob(_) => Err(DataError::InvalidRow(format!("binary value in {}", key))),
    }
}

#[async_trait]
impl TabularStore for SqliteStore {
    async fn read(&self, request: TableRead) -> Result<TableReadResult, DataError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::read_blocking(&path, &request)).await?
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>, DataError> {
        let path = self.path.clone();
        let table = table.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = Self::connect(&path)?;
            let columns = Self::table_columns(&conn, &table)?;
            if columns.is_empty() {
                return Err(DataError::fetch(format!("no such table: {}", table)));
            }
            Ok(columns)
        })
        .await?
    }

    async fn tables(&self) -> Result<Vec<String>, DataError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Self::connect(&path)?;
            Self::table_names(&conn)
        })
        .await?
    }

    fn store_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv_core::{Condition, FilterItem, FilterSet, SortSpec};
    use serde_json::json;

    fn create_db() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hr.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE employees (id INTEGER PRIMARY KEY, name TEXT, salary REAL, code TEXT, photo BLOB);
             INSERT INTO employees (name, salary, code) VALUES ('Anita', 5200.5, '10');
             INSERT INTO employees (name, salary, code) VALUES ('Bala', 4100, '9');
             INSERT INTO employees (name, salary, code) VALUES ('Anand', 6100, NULL);
             INSERT INTO employees (name, salary, code) VALUES ('Chitra', 4100, 'x');",
        )
        .unwrap();
        let store = SqliteStore::open(&path).unwrap();
        (dir, store)
    }

    fn read(table: &str, columns: &[&str]) -> TableRead {
        TableRead {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ..TableRead::new(table)
        }
    }

    #[tokio::test]
    async fn test_read_qualifies_keys() {
        let (_dir, store) = create_db();
        let result = store.read(read("employees", &["name", "salary"])).await.unwrap();
        assert_eq!(result.rows.len(), 4);
        assert_eq!(result.rows[0]["employees.name"], json!("Anita"));
        assert_eq!(result.rows[0]["employees.salary"], json!(5200.5));
        assert!(result.total.is_none());
    }

    #[tokio::test]
    async fn test_filter_sort_and_window() {
        let (_dir, store) = create_db();
        let request = TableRead {
            filters: Some(FilterSet::all(vec![FilterItem::new("name", Condition::Starts, "An")])),
            sort: Some(SortSpec::desc("salary")),
            limit: Some(1),
            with_count: true,
            ..read("employees", &["name"])
        };
        let result = store.read(request).await.unwrap();
        assert_eq!(result.total, Some(2));
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["employees.name"], json!("Anand"));
    }

    #[tokio::test]
    async fn test_offset_past_end_is_empty() {
        let (_dir, store) = create_db();
        let request = TableRead {
            limit: Some(usize::MAX),
            offset: usize::MAX,
            with_count: true,
            ..read("employees", &["name"])
        };
        let result = store.read(request).await.unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.total, Some(4));

        let request = TableRead {
            limit: Some(10),
            offset: 4,
            ..read("employees", &["name"])
        };
        assert!(store.read(request).await.unwrap().rows.is_empty());
    }

    #[tokio::test]
    async fn test_text_conditions_are_case_sensitive() {
        let (dir, store) = create_db();
        let conn = Connection::open(dir.path().join("hr.db")).unwrap();
        conn.execute("UPDATE employees SET code = 'Mumbai Office' WHERE id = 2", []).unwrap();

        let count = |condition: Condition, value: &str| {
            let request = TableRead {
                filters: Some(FilterSet::all(vec![FilterItem::new("code", condition, value)])),
                with_count: true,
                ..read("employees", &["name"])
            };
            let store = &store;
            async move { store.read(request).await.unwrap().total }
        };

        assert_eq!(count(Condition::Contains, "office").await, Some(0));
        assert_eq!(count(Condition::Starts, "mum").await, Some(0));
        assert_eq!(count(Condition::Ends, "OFFICE").await, Some(0));
        assert_eq!(count(Condition::Eq, "mumbai office").await, Some(0));

        assert_eq!(count(Condition::Contains, "Office").await, Some(1));
        assert_eq!(count(Condition::Starts, "Mum").await, Some(1));
        assert_eq!(count(Condition::Ends, "Office").await, Some(1));
        assert_eq!(count(Condition::Eq, "Mumbai Office").await, Some(1));
    }

    #[tokio::test]
    async fn test_sort_ties_break_on_rowid() {
        let (_dir, store) = create_db();
        let request = TableRead {
            sort: Some(SortSpec::asc("salary")),
            ..read("employees", &["name"])
        };
        let names: Vec<_> = store
            .read(request)
            .await
            .unwrap()
            .rows
            .into_iter()
            .map(|r| r["employees.name"].clone())
            .collect();
        assert_eq!(names, vec![json!("Bala"), json!("Chitra"), json!("Anita"), json!("Anand")]);
    }

    #[tokio::test]
    async fn test_numeric_filter_on_real_column() {
        let (_dir, store) = create_db();
        let request = TableRead {
            filters: Some(FilterSet::all(vec![FilterItem::new("salary", Condition::Gt, "5000")])),
            with_count: true,
            ..read("employees", &["name"])
        };
        assert_eq!(store.read(request).await.unwrap().total, Some(2));
    }

    #[tokio::test]
    async fn test_unknown_column_and_table_fail() {
        let (_dir, store) = create_db();
        assert!(matches!(
            store.read(read("employees", &["nope"])).await,
            Err(DataError::DataFetch { .. })
        ));
        assert!(matches!(
            store.read(read("missing", &[])).await,
            Err(DataError::DataFetch { .. })
        ));
    }

    #[tokio::test]
    async fn test_blob_rejected() {
        let (dir, store) = create_db();
        let conn = Connection::open(dir.path().join("hr.db")).unwrap();
        conn.execute("UPDATE employees SET photo = x'00ff' WHERE id = 1", []).unwrap();
        let result = store.read(read("employees", &["photo"])).await;
        assert!(matches!(result, Err(DataError::InvalidRow(_))));
    }

    #[tokio::test]
    async fn test_tables_and_columns() {
        let (_dir, store) = create_db();
        assert_eq!(store.tables().await.unwrap(), vec!["employees"]);
        assert_eq!(
            store.columns("employees").await.unwrap(),
            vec!["id", "name", "salary", "code", "photo"]
        );
    }
}
