use super::adapter::{quote_ident, ColumnInfo, ConnectionAdapter, Statement, ValueFilter};
use super::value::StoredValue;
use crate::error::DatabaseError;
use rusqlite::{params_from_iter, Connection, MAIN_DB};
use std::path::Path;
use tracing::debug;

/// SQLite connection wrapper implementing [`ConnectionAdapter`]
pub struct SqliteAdapter {
    conn: Option<Connection>,
    label: String,
}

impl SqliteAdapter {
    /// Open a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        Ok(Self::from_connection(conn, path.display().to_string()))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn, ":memory:"))
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: Connection, label: impl Into<String>) -> Self {
        Self {
            conn: Some(conn),
            label: label.into(),
        }
    }

    /// Path or name the database was opened with
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Borrow the underlying connection
    pub fn connection(&self) -> Result<&Connection, DatabaseError> {
        self.conn.as_ref().ok_or(DatabaseError::Closed)
    }

    /// Close the connection. Later calls fail with [`DatabaseError::Closed`].
    pub fn close(&mut self) -> Result<(), DatabaseError> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| DatabaseError::Sqlite(err))?;
        }
        Ok(())
    }

    /// Copy the database to `dest` with the online backup API, replacing
    /// whatever `dest` held before
    pub fn copy_to(&self, dest: impl AsRef<Path>) -> Result<(), DatabaseError> {
        let dest = dest.as_ref();
        self.connection()?.backup(MAIN_DB, dest, None)?;
        debug!(dest = %dest.display(), "copied database");
        Ok(())
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// WHERE clause and parameters for a value filter on `col` (already quoted)
fn filter_clause(col: &str, filter: &ValueFilter) -> (String, Vec<StoredValue>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if !filter.exclude_classes.is_empty() {
        clauses.push(format!(
            "typeof({col}) NOT IN ({})",
            placeholders(filter.exclude_classes.len())
        ));
        params.extend(
            filter
                .exclude_classes
                .iter()
                .map(|c| StoredValue::Text(c.as_str().to_string())),
        );
    }
    if !filter.text_in.is_empty() {
        clauses.push(format!(
            "(typeof({col}) = 'text' AND lower({col}) IN ({}))",
            placeholders(filter.text_in.len())
        ));
        params.extend(filter.text_in.iter().cloned().map(StoredValue::Text));
    }
    if !filter.text_not_in.is_empty() {
        clauses.push(format!(
            "NOT (typeof({col}) = 'text' AND lower({col}) IN ({}))",
            placeholders(filter.text_not_in.len())
        ));
        params.extend(filter.text_not_in.iter().cloned().map(StoredValue::Text));
    }

    if clauses.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), params)
    }
}

impl ConnectionAdapter for SqliteAdapter {
    fn list_tables(&self) -> Result<Vec<String>, DatabaseError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table' AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
            ORDER BY rowid
            "#,
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, DatabaseError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT name, type, "notnull", pk
            FROM pragma_table_info(?1)
            ORDER BY cid
            "#,
        )?;
        let columns = stmt
            .query_map([table], |row| {
                Ok(ColumnInfo {
                    name: row.get(0)?,
                    declared_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    nullable: row.get::<_, i64>(2)? == 0,
                    primary_key: row.get::<_, i64>(3)? > 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn sample_values(
        &self,
        table: &str,
        column: &str,
        filter: &ValueFilter,
        limit: Option<usize>,
    ) -> Result<Vec<StoredValue>, DatabaseError> {
        let conn = self.connection()?;
        let col = quote_ident(column);
        let (where_clause, mut params) = filter_clause(&col, filter);
        // typeof() keeps 1 and 1.0 apart under DISTINCT
        let mut sql = format!(
            "SELECT DISTINCT {col}, typeof({col}) FROM {table}{where_clause}",
            table = quote_ident(table),
        );
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            params.push(StoredValue::Integer(
                i64::try_from(limit).unwrap_or(i64::MAX),
            ));
        }

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push(StoredValue::from(row.get_ref(0)?));
        }
        Ok(values)
    }

    fn execute_in_transaction(&self, statements: &[Statement]) -> Result<usize, DatabaseError> {
        let conn = self.connection()?;
        // Dropping an uncommitted transaction rolls it back
        let tx = conn.unchecked_transaction()?;
        let mut changed = 0;
        for stmt in statements {
            let rows = tx.execute(&stmt.sql, params_from_iter(stmt.params.iter()))?;
            if rows < stmt.min_rows {
                return Err(DatabaseError::Other(format!(
                    "Statement changed {} row(s), expected at least {}",
                    rows, stmt.min_rows
                )));
            }
            changed += rows;
        }
        tx.commit()?;
        Ok(changed)
    }
}
