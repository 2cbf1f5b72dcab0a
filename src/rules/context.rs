use crate::db::{ColumnInfo, ConnectionAdapter, StoredValue, ValueFilter};
use crate::error::{DatabaseError, RuleError};
use crate::report::Scope;

/// Columns of one table as seen at run start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    /// Look up a column by name, ignoring ASCII case like SQLite does
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Schema metadata captured once per run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableSchema>,
}

impl SchemaSnapshot {
    /// Read every table and its columns through the adapter
    pub fn capture(adapter: &dyn ConnectionAdapter) -> Result<Self, DatabaseError> {
        let mut tables = Vec::new();
        for name in adapter.list_tables()? {
            let columns = adapter.list_columns(&name)?;
            tables.push(TableSchema { name, columns });
        }
        Ok(Self { tables })
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }
}

/// Everything a rule may look at for one scope unit
pub struct RuleContext<'a> {
    pub adapter: &'a dyn ConnectionAdapter,
    pub schema: &'a SchemaSnapshot,
    pub scope: &'a Scope,
    pub table: Option<&'a TableSchema>,
    pub column: Option<&'a ColumnInfo>,
    /// Maximum number of distinct values a rule should sample per column
    pub sample_limit: usize,
}

impl<'a> RuleContext<'a> {
    /// Table and column for column-scoped rules
    pub fn require_column(&self, rule_id: &str) -> Result<(&'a TableSchema, &'a ColumnInfo), RuleError> {
        match (self.table, self.column) {
            (Some(table), Some(column)) => Ok((table, column)),
            _ => Err(RuleError::WrongScope {
                rule_id: rule_id.to_string(),
                expected: "column",
            }),
        }
    }

    /// Up to `sample_limit` distinct values of the scoped column passing
    /// `filter`, freshly queried
    pub fn sample_column(
        &self,
        rule_id: &str,
        filter: &ValueFilter,
    ) -> Result<Vec<StoredValue>, RuleError> {
        self.values(rule_id, filter, Some(self.sample_limit))
    }

    /// Every distinct value of the scoped column passing `filter`
    pub fn scan_column(
        &self,
        rule_id: &str,
        filter: &ValueFilter,
    ) -> Result<Vec<StoredValue>, RuleError> {
        self.values(rule_id, filter, None)
    }

    fn values(
        &self,
        rule_id: &str,
        filter: &ValueFilter,
        limit: Option<usize>,
    ) -> Result<Vec<StoredValue>, RuleError> {
        let (table, column) = self.require_column(rule_id)?;
        Ok(self
            .adapter
            .sample_values(&table.name, &column.name, filter, limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteAdapter;

    fn adapter() -> SqliteAdapter {
        let adapter = SqliteAdapter::open_in_memory().unwrap();
        adapter
            .connection()
            .unwrap()
            .execute_batch(
                r#"
                CREATE TABLE Events (Id INTEGER, name TEXT);
                CREATE TABLE users (email TEXT NOT NULL);
                INSERT INTO Events VALUES (1, 'a');
                "#,
            )
            .unwrap();
        adapter
    }

    #[test]
    fn test_snapshot_capture() {
        let adapter = adapter();
        let snapshot = SchemaSnapshot::capture(&adapter).unwrap();

        assert_eq!(snapshot.tables.len(), 2);
        assert_eq!(snapshot.tables[0].name, "Events");
        assert_eq!(snapshot.column_count(), 3);
    }

    #[test]
    fn test_snapshot_lookup_ignores_case() {
        let snapshot = SchemaSnapshot::capture(&adapter()).unwrap();
        let table = snapshot.table("events").unwrap();
        assert_eq!(table.column("id").unwrap().name, "Id");
        assert!(snapshot.table("missing").is_none());
    }

    #[test]
    fn test_context_requires_column_scope() {
        let adapter = adapter();
        let snapshot = SchemaSnapshot::capture(&adapter).unwrap();
        let scope = Scope::Database;
        let ctx = RuleContext {
            adapter: &adapter,
            schema: &snapshot,
            scope: &scope,
            table: None,
            column: None,
            sample_limit: 10,
        };

        assert!(matches!(
            ctx.require_column("L0001"),
            Err(RuleError::WrongScope { .. })
        ));
    }

    #[test]
    fn test_context_sample_column() {
        let adapter = adapter();
        let snapshot = SchemaSnapshot::capture(&adapter).unwrap();
        let table = snapshot.table("Events").unwrap();
        let scope = Scope::Column(crate::report::ColumnRef::new("Events", "name"));
        let ctx = RuleContext {
            adapter: &adapter,
            schema: &snapshot,
            scope: &scope,
            table: Some(table),
            column: table.column("name"),
            sample_limit: 10,
        };

        let all = ValueFilter::default();
        assert_eq!(
            ctx.sample_column("L0001", &all).unwrap(),
            vec![StoredValue::Text("a".to_string())]
        );
        assert!(ctx
            .scan_column("L0001", &ValueFilter::new().text_in(&["b"]))
            .unwrap()
            .is_empty());
    }
}
